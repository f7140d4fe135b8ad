use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Allowed meeting lengths, in minutes
pub const DURATION_CHOICES: [i64; 6] = [15, 30, 45, 60, 90, 120];

/// What a consultation is for
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConsultationType {
    Onboarding,
    Strategy,
    ProjectReview,
    Support,
}

impl ConsultationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsultationType::Onboarding => "onboarding",
            ConsultationType::Strategy => "strategy",
            ConsultationType::ProjectReview => "project_review",
            ConsultationType::Support => "support",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "onboarding" => Some(ConsultationType::Onboarding),
            "strategy" => Some(ConsultationType::Strategy),
            "project_review" => Some(ConsultationType::ProjectReview),
            "support" => Some(ConsultationType::Support),
            _ => None,
        }
    }
}

/// Consultation status. Completed and canceled are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConsultationStatus {
    Scheduled,
    Completed,
    Canceled,
}

impl Default for ConsultationStatus {
    fn default() -> Self {
        ConsultationStatus::Scheduled
    }
}

impl fmt::Display for ConsultationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ConsultationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsultationStatus::Scheduled => "scheduled",
            ConsultationStatus::Completed => "completed",
            ConsultationStatus::Canceled => "canceled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "scheduled" => Some(ConsultationStatus::Scheduled),
            "completed" => Some(ConsultationStatus::Completed),
            "canceled" => Some(ConsultationStatus::Canceled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ConsultationStatus::Completed | ConsultationStatus::Canceled)
    }
}

/// A scheduled meeting between agency and client organization
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Consultation {
    pub id: String,
    #[serde(rename = "orgId")]
    pub org_id: String,
    #[serde(rename = "type")]
    pub consultation_type: ConsultationType,
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "scheduledAt")]
    pub scheduled_at: DateTime<Utc>,
    /// Minutes; one of DURATION_CHOICES
    pub duration: i64,
    #[serde(default)]
    pub status: ConsultationStatus,
    #[serde(rename = "externalCalendarLink")]
    pub external_calendar_link: Option<String>,
    #[serde(rename = "meetingNotes")]
    pub meeting_notes: Option<String>,
    #[serde(rename = "createdBy")]
    pub created_by: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// Input for scheduling a consultation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsultationCreateInput {
    #[serde(rename = "orgId")]
    pub org_id: String,
    #[serde(rename = "type")]
    pub consultation_type: ConsultationType,
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "scheduledAt")]
    pub scheduled_at: DateTime<Utc>,
    pub duration: i64,
    #[serde(rename = "externalCalendarLink")]
    pub external_calendar_link: Option<String>,
}

/// List/subscription filter
#[derive(Debug, Clone, Default)]
pub struct ConsultationFilter {
    pub org_id: Option<String>,
    pub status: Option<ConsultationStatus>,
}
