// ABOUTME: Boundary to the external calendar integration
// ABOUTME: Best-effort: failures fall back to an "add to calendar" link

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::conflicts::BusyInterval;

/// Whether an external calendar account is linked
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CalendarConnection {
    pub connected: bool,
}

/// The event we ask the collaborator to create for a consultation
#[derive(Debug, Clone, PartialEq)]
pub struct EventDraft {
    pub title: String,
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub duration_minutes: i64,
}

/// Result of attempting event creation
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEventOutcome {
    pub created: bool,
    /// Meeting link when the collaborator created one
    pub link: Option<String>,
}

/// Calendar collaborator errors
#[derive(Debug, thiserror::Error)]
pub enum CalendarError {
    #[error("Calendar is not connected")]
    NotConnected,
    #[error("Calendar request failed: {0}")]
    Request(String),
}

/// External calendar integration, specified only at the boundary. OAuth
/// linking happens outside the portal backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    /// Is an external calendar account linked?
    async fn connection(&self) -> CalendarConnection;

    /// Busy windows between two instants
    async fn free_busy(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<BusyInterval>, CalendarError>;

    /// Try to create an event; best-effort
    async fn create_event(&self, draft: &EventDraft) -> Result<CalendarEventOutcome, CalendarError>;
}

/// Default provider when no calendar account is linked. Reports
/// disconnected, no busy windows, and never creates events.
#[derive(Debug, Default)]
pub struct DisconnectedCalendar;

#[async_trait]
impl CalendarProvider for DisconnectedCalendar {
    async fn connection(&self) -> CalendarConnection {
        CalendarConnection { connected: false }
    }

    async fn free_busy(
        &self,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<BusyInterval>, CalendarError> {
        Ok(Vec::new())
    }

    async fn create_event(&self, _draft: &EventDraft) -> Result<CalendarEventOutcome, CalendarError> {
        Ok(CalendarEventOutcome {
            created: false,
            link: None,
        })
    }
}

/// Build the "add to calendar" fallback URL used when automatic event
/// creation is unavailable or fails.
pub fn fallback_calendar_link(title: &str, start: DateTime<Utc>, duration_minutes: i64) -> String {
    let end = start + Duration::minutes(duration_minutes);
    let dates = format!(
        "{}/{}",
        start.format("%Y%m%dT%H%M%SZ"),
        end.format("%Y%m%dT%H%M%SZ")
    );

    let encoded_title: String = url::form_urlencoded::byte_serialize(title.as_bytes()).collect();

    format!(
        "https://calendar.google.com/calendar/render?action=TEMPLATE&text={}&dates={}",
        encoded_title, dates
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_fallback_link_format() {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap();
        let link = fallback_calendar_link("Kickoff call", start, 30);

        assert_eq!(
            link,
            "https://calendar.google.com/calendar/render?action=TEMPLATE&text=Kickoff+call&dates=20240601T100000Z/20240601T103000Z"
        );
    }

    #[tokio::test]
    async fn test_disconnected_calendar_never_creates() {
        let calendar = DisconnectedCalendar;
        assert!(!calendar.connection().await.connected);

        let draft = EventDraft {
            title: "Kickoff".to_string(),
            description: None,
            start: Utc::now(),
            duration_minutes: 30,
        };
        let outcome = calendar.create_event(&draft).await.unwrap();
        assert!(!outcome.created);
        assert!(outcome.link.is_none());
    }
}
