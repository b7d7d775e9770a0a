use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::models::BookingRecord;

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn parse_ts(s: &str) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TS_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn row_to_record(row: &Row) -> rusqlite::Result<BookingRecord> {
    let start_time: String = row.get(2)?;
    let end_time: String = row.get(3)?;
    let created_at: String = row.get(6)?;
    Ok(BookingRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        start_time: parse_ts(&start_time)?,
        end_time: parse_ts(&end_time)?,
        timezone: row.get(4)?,
        event_reference: row.get(5)?,
        created_at: parse_ts(&created_at)?,
    })
}

// ── Booking history ──

pub fn insert_booking_record(conn: &Connection, record: &BookingRecord) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO booking_history (id, title, start_time, end_time, timezone, event_reference, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            record.id,
            record.title,
            record.start_time.format(TS_FORMAT).to_string(),
            record.end_time.format(TS_FORMAT).to_string(),
            record.timezone,
            record.event_reference,
            record.created_at.format(TS_FORMAT).to_string(),
        ],
    )?;
    Ok(())
}

/// Newest first.
pub fn list_booking_records(conn: &Connection, limit: u32) -> anyhow::Result<Vec<BookingRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, title, start_time, end_time, timezone, event_reference, created_at
         FROM booking_history ORDER BY created_at DESC, rowid DESC LIMIT ?1",
    )?;
    let records = stmt
        .query_map(params![limit], row_to_record)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}

pub fn get_booking_record(conn: &Connection, id: &str) -> anyhow::Result<Option<BookingRecord>> {
    let record = conn
        .query_row(
            "SELECT id, title, start_time, end_time, timezone, event_reference, created_at
             FROM booking_history WHERE id = ?1",
            params![id],
            row_to_record,
        )
        .optional()?;
    Ok(record)
}

/// Most recent booking of exactly this slot, if any. Used to recognise a
/// confirm that was already applied.
pub fn find_booking_for_slot(
    conn: &Connection,
    title: &str,
    start_time: &NaiveDateTime,
    end_time: &NaiveDateTime,
    timezone: &str,
) -> anyhow::Result<Option<BookingRecord>> {
    let record = conn
        .query_row(
            "SELECT id, title, start_time, end_time, timezone, event_reference, created_at
             FROM booking_history
             WHERE title = ?1 AND start_time = ?2 AND end_time = ?3 AND timezone = ?4
             ORDER BY created_at DESC, rowid DESC LIMIT 1",
            params![
                title,
                start_time.format(TS_FORMAT).to_string(),
                end_time.format(TS_FORMAT).to_string(),
                timezone,
            ],
            row_to_record,
        )
        .optional()?;
    Ok(record)
}
