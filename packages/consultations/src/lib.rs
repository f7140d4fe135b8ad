pub mod calendar;
pub mod conflicts;
pub mod manager;
pub mod storage;
pub mod types;

pub use calendar::{
    fallback_calendar_link, CalendarConnection, CalendarError, CalendarEventOutcome,
    CalendarProvider, DisconnectedCalendar, EventDraft,
};
pub use conflicts::{find_conflicts, overlaps, BusyInterval};
pub use manager::{ConsultationError, ConsultationManager, ConsultationResult};
pub use storage::ConsultationStorage;
pub use types::{
    Consultation, ConsultationCreateInput, ConsultationFilter, ConsultationStatus,
    ConsultationType, DURATION_CHOICES,
};
