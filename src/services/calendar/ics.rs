use crate::models::BookingRecord;

/// Single-event iCalendar document for a recorded booking. Times are written
/// as floating local times tagged with the booking's TZID.
pub fn generate_ics(record: &BookingRecord) -> String {
    let dtstart = record.start_time.format("%Y%m%dT%H%M%S").to_string();
    let dtend = record.end_time.format("%Y%m%dT%H%M%S").to_string();
    let dtstamp = record.created_at.format("%Y%m%dT%H%M%SZ").to_string();
    let uid = format!("{}@calbook", record.id);
    let tzid = &record.timezone;
    let summary = escape_text(&record.title);
    let url = escape_text(&record.event_reference);

    format!(
        "BEGIN:VCALENDAR\r\n\
         VERSION:2.0\r\n\
         PRODID:-//Calbook//Booking Assistant//EN\r\n\
         BEGIN:VEVENT\r\n\
         UID:{uid}\r\n\
         DTSTAMP:{dtstamp}\r\n\
         DTSTART;TZID={tzid}:{dtstart}\r\n\
         DTEND;TZID={tzid}:{dtend}\r\n\
         SUMMARY:{summary}\r\n\
         DESCRIPTION:{url}\r\n\
         END:VEVENT\r\n\
         END:VCALENDAR\r\n"
    )
}

// RFC 5545 TEXT escaping.
fn escape_text(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace(';', "\\;")
        .replace(',', "\\,")
        .replace("\r\n", "\\n")
        .replace(['\r', '\n'], "\\n")
}
