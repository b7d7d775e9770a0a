use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDateTime;
use chrono_tz::Tz;
use rusqlite::Connection;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::services::booking::BookingEngine;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub engine: BookingEngine,
    pub timezone: Tz,
}

impl AppState {
    pub fn db(&self) -> Result<MutexGuard<'_, Connection>, AppError> {
        self.db
            .lock()
            .map_err(|_| AppError::Internal(anyhow::anyhow!("database mutex poisoned")))
    }

    /// Current wall-clock time in the calendar's timezone; the reference
    /// instant handed to extraction.
    pub fn now(&self) -> NaiveDateTime {
        chrono::Utc::now().with_timezone(&self.timezone).naive_local()
    }
}
