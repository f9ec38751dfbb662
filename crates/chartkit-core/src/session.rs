use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Asia::Tokyo;
use serde::{Deserialize, Serialize};

/// Trading session classification for the Tokyo venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Session {
    /// Pre-open auction: 8:00 - 9:00 JST
    PreOpen,
    /// Morning session: 9:00 - 11:30 JST
    Morning,
    /// Lunch break: 11:30 - 12:30 JST
    Break,
    /// Afternoon session: 12:30 - 15:00 JST
    Afternoon,
}

impl Session {
    /// Classify a UTC timestamp into a trading session.
    /// Returns `None` outside all sessions (before 8:00 or after 15:00 JST).
    pub fn classify(timestamp: &DateTime<Utc>) -> Option<Self> {
        let jst = timestamp.with_timezone(&Tokyo);
        let total_minutes = jst.hour() * 60 + jst.minute();

        // Pre-open: 8:00 (480) to 8:59 (539)
        // Morning: 9:00 (540) to 11:29 (689)
        // Break: 11:30 (690) to 12:29 (749)
        // Afternoon: 12:30 (750) to 14:59 (899)
        match total_minutes {
            480..540 => Some(Session::PreOpen),
            540..690 => Some(Session::Morning),
            690..750 => Some(Session::Break),
            750..900 => Some(Session::Afternoon),
            _ => None,
        }
    }

    /// Whether trades print during this session.
    pub fn is_continuous(&self) -> bool {
        matches!(self, Session::Morning | Session::Afternoon)
    }
}
