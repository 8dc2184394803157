use chrono::{SecondsFormat, Utc};
use serde::Serialize;

/// Liveness payload returned by `/api/health`.
#[derive(Serialize, Debug)]
pub struct Health {
    pub status: &'static str,
    pub timestamp: String,
}

impl Health {
    pub fn now() -> Self {
        Self {
            status: "ok",
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}
