use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Event lifecycle states. New events always start out pending; only an
/// admin moves them to approved or rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum EventStatus {
    Pending,
    Approved,
    Rejected,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Pending => "pending",
            EventStatus::Approved => "approved",
            EventStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(EventStatus::Pending),
            "approved" => Ok(EventStatus::Approved),
            "rejected" => Ok(EventStatus::Rejected),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub category: String,
    pub capacity: i32,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub venue: String,
    pub description: Option<String>,
    /// Opaque name reference; no binary content is stored.
    pub poster: Option<String>,
    pub materials: Option<Vec<String>>,
    pub status: EventStatus,
    pub organizer_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_only_the_three_states() {
        assert_eq!("pending".parse::<EventStatus>(), Ok(EventStatus::Pending));
        assert_eq!("approved".parse::<EventStatus>(), Ok(EventStatus::Approved));
        assert_eq!("rejected".parse::<EventStatus>(), Ok(EventStatus::Rejected));
        assert!("published".parse::<EventStatus>().is_err());
        assert!("closed".parse::<EventStatus>().is_err());
        assert!("".parse::<EventStatus>().is_err());
    }
}
