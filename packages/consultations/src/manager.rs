// ABOUTME: Consultation service layer: scheduling, one-way lifecycle, snapshots
// ABOUTME: Calendar event creation is best-effort and never blocks scheduling

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tokio::sync::{broadcast, RwLock};
use tracing::{info, warn};

use cartshift_core::{Actor, ValidationError};
use cartshift_storage::StorageError;

use crate::calendar::{fallback_calendar_link, CalendarProvider, EventDraft};
use crate::conflicts::{find_conflicts, BusyInterval};
use crate::storage::ConsultationStorage;
use crate::types::{
    Consultation, ConsultationCreateInput, ConsultationFilter, ConsultationStatus,
    DURATION_CHOICES,
};

const DEFAULT_CHANNEL_CAPACITY: usize = 200;

/// Consultation service errors
#[derive(Error, Debug)]
pub enum ConsultationError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Validation errors: {0:?}")]
    Validation(Vec<ValidationError>),
    #[error("Consultation not found: {0}")]
    NotFound(String),
    #[error("Consultation is already {0}")]
    AlreadyClosed(ConsultationStatus),
    #[error("Calendar error: {0}")]
    Calendar(#[from] crate::calendar::CalendarError),
}

pub type ConsultationResult<T> = Result<T, ConsultationError>;

pub struct ConsultationManager {
    storage: Arc<ConsultationStorage>,
    calendar: Arc<dyn CalendarProvider>,
    /// Per-organization snapshot channels
    org_channels: Arc<RwLock<HashMap<String, broadcast::Sender<Vec<Consultation>>>>>,
    /// Agency-wide snapshot channel
    all_channel: broadcast::Sender<Vec<Consultation>>,
    channel_capacity: usize,
}

impl ConsultationManager {
    pub fn new(storage: Arc<ConsultationStorage>, calendar: Arc<dyn CalendarProvider>) -> Self {
        Self::with_capacity(storage, calendar, DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(
        storage: Arc<ConsultationStorage>,
        calendar: Arc<dyn CalendarProvider>,
        channel_capacity: usize,
    ) -> Self {
        let (all_channel, _) = broadcast::channel(channel_capacity);
        Self {
            storage,
            calendar,
            org_channels: Arc::new(RwLock::new(HashMap::new())),
            all_channel,
            channel_capacity,
        }
    }

    pub fn subscribe_all(&self) -> broadcast::Receiver<Vec<Consultation>> {
        self.all_channel.subscribe()
    }

    pub async fn subscribe_for_org(&self, org_id: &str) -> broadcast::Receiver<Vec<Consultation>> {
        let mut channels = self.org_channels.write().await;
        channels
            .entry(org_id.to_string())
            .or_insert_with(|| broadcast::channel(self.channel_capacity).0)
            .subscribe()
    }

    async fn broadcast(&self, org_id: &str) -> ConsultationResult<()> {
        if self.all_channel.receiver_count() > 0 {
            let all = self.storage.list(&ConsultationFilter::default()).await?;
            if self.all_channel.send(all).is_err() {
                warn!("Failed to broadcast agency-wide consultation snapshot");
            }
        }

        let tx = {
            let channels = self.org_channels.read().await;
            channels.get(org_id).cloned()
        };
        if let Some(tx) = tx {
            if tx.receiver_count() > 0 {
                let snapshot = self
                    .storage
                    .list(&ConsultationFilter {
                        org_id: Some(org_id.to_string()),
                        status: None,
                    })
                    .await?;
                if tx.send(snapshot).is_err() {
                    warn!("Failed to broadcast consultation snapshot for org {}", org_id);
                }
            }
        }
        Ok(())
    }

    /// Schedule a consultation. A calendar event is attempted best-effort;
    /// when creation is unavailable or fails, an "add to calendar" link is
    /// stored instead and scheduling still succeeds.
    pub async fn create(
        &self,
        actor: &Actor,
        input: ConsultationCreateInput,
    ) -> ConsultationResult<Consultation> {
        let mut errors = Vec::new();
        if input.title.trim().is_empty() {
            errors.push(ValidationError::new("title", "Consultation title is required"));
        }
        if !DURATION_CHOICES.contains(&input.duration) {
            errors.push(ValidationError::new(
                "duration",
                format!("Duration must be one of {:?} minutes", DURATION_CHOICES),
            ));
        }
        if !errors.is_empty() {
            return Err(ConsultationError::Validation(errors));
        }

        let link = match input.external_calendar_link.clone() {
            Some(link) => Some(link),
            None => {
                let draft = EventDraft {
                    title: input.title.trim().to_string(),
                    description: input.description.clone(),
                    start: input.scheduled_at,
                    duration_minutes: input.duration,
                };
                match self.calendar.create_event(&draft).await {
                    Ok(outcome) if outcome.created => outcome.link,
                    Ok(_) => Some(fallback_calendar_link(
                        &draft.title,
                        input.scheduled_at,
                        input.duration,
                    )),
                    Err(e) => {
                        warn!("Calendar event creation failed, using fallback link: {}", e);
                        Some(fallback_calendar_link(
                            &draft.title,
                            input.scheduled_at,
                            input.duration,
                        ))
                    }
                }
            }
        };

        let consultation = self
            .storage
            .create_consultation(&actor.user_id, &input, link)
            .await?;

        info!(
            "Scheduled consultation '{}' with ID {}",
            consultation.title, consultation.id
        );

        self.broadcast(&consultation.org_id).await?;
        Ok(consultation)
    }

    pub async fn get(&self, id: &str) -> ConsultationResult<Option<Consultation>> {
        Ok(self.storage.get_consultation(id).await?)
    }

    pub async fn list(&self, filter: ConsultationFilter) -> ConsultationResult<Vec<Consultation>> {
        Ok(self.storage.list(&filter).await?)
    }

    pub async fn complete(
        &self,
        id: &str,
        actor: &Actor,
        meeting_notes: Option<String>,
    ) -> ConsultationResult<Consultation> {
        self.transition(id, actor, ConsultationStatus::Completed, meeting_notes)
            .await
    }

    pub async fn cancel(&self, id: &str, actor: &Actor) -> ConsultationResult<Consultation> {
        self.transition(id, actor, ConsultationStatus::Canceled, None).await
    }

    async fn transition(
        &self,
        id: &str,
        actor: &Actor,
        to: ConsultationStatus,
        meeting_notes: Option<String>,
    ) -> ConsultationResult<Consultation> {
        let affected = self
            .storage
            .transition_from_scheduled(id, to, meeting_notes.as_deref())
            .await?;

        if affected == 0 {
            // Distinguish missing from already terminal
            let current = self
                .storage
                .get_consultation(id)
                .await?
                .ok_or_else(|| ConsultationError::NotFound(id.to_string()))?;
            return Err(ConsultationError::AlreadyClosed(current.status));
        }

        let consultation = self
            .storage
            .get_consultation(id)
            .await?
            .ok_or_else(|| ConsultationError::NotFound(id.to_string()))?;

        info!(
            "Consultation {} marked {} by {}",
            id, to, actor.user_id
        );

        self.broadcast(&consultation.org_id).await?;
        Ok(consultation)
    }

    /// Whether an external calendar account is linked
    pub async fn calendar_connection(&self) -> crate::calendar::CalendarConnection {
        self.calendar.connection().await
    }

    /// Advisory conflict check for a candidate slot: fetch the day's busy
    /// windows from the calendar collaborator and run the overlap test.
    /// The caller may schedule despite reported conflicts.
    pub async fn check_conflicts(
        &self,
        scheduled_at: DateTime<Utc>,
        duration_minutes: i64,
    ) -> ConsultationResult<Vec<BusyInterval>> {
        let day_start = scheduled_at
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|naive| naive.and_utc())
            .unwrap_or(scheduled_at);
        let day_end = day_start + Duration::days(1);

        let busy = self.calendar.free_busy(day_start, day_end).await?;
        Ok(find_conflicts(scheduled_at, duration_minutes, &busy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{
        CalendarConnection, CalendarError, CalendarEventOutcome, MockCalendarProvider,
    };
    use crate::types::ConsultationType;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    async fn seeded_storage() -> Arc<ConsultationStorage> {
        let pool = cartshift_storage::connect_in_memory().await.unwrap();
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO organizations (id, name, created_at, updated_at) VALUES ('org-1', 'Acme', ?, ?)",
        )
        .bind(&now)
        .bind(&now)
        .execute(&pool)
        .await
        .unwrap();
        Arc::new(ConsultationStorage::new(pool))
    }

    fn input(duration: i64) -> ConsultationCreateInput {
        ConsultationCreateInput {
            org_id: "org-1".to_string(),
            consultation_type: ConsultationType::Strategy,
            title: "Quarterly planning".to_string(),
            description: None,
            scheduled_at: Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap(),
            duration,
            external_calendar_link: None,
        }
    }

    fn disconnected_mock() -> MockCalendarProvider {
        let mut calendar = MockCalendarProvider::new();
        calendar
            .expect_connection()
            .returning(|| CalendarConnection { connected: false });
        calendar.expect_create_event().returning(|_| {
            Ok(CalendarEventOutcome {
                created: false,
                link: None,
            })
        });
        calendar.expect_free_busy().returning(|_, _| Ok(Vec::new()));
        calendar
    }

    #[tokio::test]
    async fn test_create_uses_fallback_link_when_not_created() {
        let manager =
            ConsultationManager::new(seeded_storage().await, Arc::new(disconnected_mock()));
        let actor = Actor::agency("a1", "Dana");

        let consultation = manager.create(&actor, input(30)).await.unwrap();
        assert_eq!(consultation.status, ConsultationStatus::Scheduled);

        let link = consultation.external_calendar_link.unwrap();
        assert!(link.starts_with("https://calendar.google.com/calendar/render"));
    }

    #[tokio::test]
    async fn test_create_survives_calendar_failure() {
        let mut calendar = MockCalendarProvider::new();
        calendar
            .expect_create_event()
            .returning(|_| Err(CalendarError::Request("boom".to_string())));

        let manager = ConsultationManager::new(seeded_storage().await, Arc::new(calendar));
        let actor = Actor::agency("a1", "Dana");

        let consultation = manager.create(&actor, input(30)).await.unwrap();
        assert_eq!(consultation.status, ConsultationStatus::Scheduled);
        assert!(consultation.external_calendar_link.is_some());
    }

    #[tokio::test]
    async fn test_create_keeps_collaborator_meet_link() {
        let mut calendar = MockCalendarProvider::new();
        calendar.expect_create_event().returning(|_| {
            Ok(CalendarEventOutcome {
                created: true,
                link: Some("https://meet.example/abc".to_string()),
            })
        });

        let manager = ConsultationManager::new(seeded_storage().await, Arc::new(calendar));
        let actor = Actor::agency("a1", "Dana");

        let consultation = manager.create(&actor, input(60)).await.unwrap();
        assert_eq!(
            consultation.external_calendar_link.as_deref(),
            Some("https://meet.example/abc")
        );
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_duration() {
        let manager =
            ConsultationManager::new(seeded_storage().await, Arc::new(disconnected_mock()));
        let actor = Actor::agency("a1", "Dana");

        let result = manager.create(&actor, input(25)).await;
        assert!(matches!(result, Err(ConsultationError::Validation(_))));
    }

    #[tokio::test]
    async fn test_complete_then_cancel_fails() {
        let manager =
            ConsultationManager::new(seeded_storage().await, Arc::new(disconnected_mock()));
        let actor = Actor::agency("a1", "Dana");

        let consultation = manager.create(&actor, input(30)).await.unwrap();

        let completed = manager
            .complete(&consultation.id, &actor, Some("went well".to_string()))
            .await
            .unwrap();
        assert_eq!(completed.status, ConsultationStatus::Completed);
        assert_eq!(completed.meeting_notes.as_deref(), Some("went well"));

        // Terminal: further transitions fail and the status stays put
        let result = manager.cancel(&consultation.id, &actor).await;
        assert!(matches!(
            result,
            Err(ConsultationError::AlreadyClosed(ConsultationStatus::Completed))
        ));

        let stored = manager.get(&consultation.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ConsultationStatus::Completed);
    }

    #[tokio::test]
    async fn test_check_conflicts_uses_day_window() {
        let mut calendar = MockCalendarProvider::new();
        calendar.expect_free_busy().returning(|_, _| {
            Ok(vec![BusyInterval {
                start: Utc.with_ymd_and_hms(2024, 6, 1, 10, 15, 0).unwrap(),
                end: Utc.with_ymd_and_hms(2024, 6, 1, 10, 45, 0).unwrap(),
            }])
        });

        let manager = ConsultationManager::new(seeded_storage().await, Arc::new(calendar));

        let candidate = Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap();
        let conflicts = manager.check_conflicts(candidate, 30).await.unwrap();
        assert_eq!(conflicts.len(), 1);

        let clear = manager
            .check_conflicts(Utc.with_ymd_and_hms(2024, 6, 1, 11, 0, 0).unwrap(), 30)
            .await
            .unwrap();
        assert!(clear.is_empty());
    }
}
