use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What kind of work a request asks for
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RequestType {
    Feature,
    Bug,
    Optimization,
    Content,
    Design,
    Other,
}

impl RequestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestType::Feature => "feature",
            RequestType::Bug => "bug",
            RequestType::Optimization => "optimization",
            RequestType::Content => "content",
            RequestType::Design => "design",
            RequestType::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "feature" => Some(RequestType::Feature),
            "bug" => Some(RequestType::Bug),
            "optimization" => Some(RequestType::Optimization),
            "content" => Some(RequestType::Content),
            "design" => Some(RequestType::Design),
            "other" => Some(RequestType::Other),
            _ => None,
        }
    }
}

/// Priority levels
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RequestPriority {
    Low,
    Normal,
    High,
    Urgent,
}

impl Default for RequestPriority {
    fn default() -> Self {
        RequestPriority::Normal
    }
}

impl RequestPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestPriority::Low => "low",
            RequestPriority::Normal => "normal",
            RequestPriority::High => "high",
            RequestPriority::Urgent => "urgent",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "low" => Some(RequestPriority::Low),
            "normal" => Some(RequestPriority::Normal),
            "high" => Some(RequestPriority::High),
            "urgent" => Some(RequestPriority::Urgent),
            _ => None,
        }
    }
}

/// Request status. Advances by explicit agency/client action; there is no
/// transition graph, any status may follow any other.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum RequestStatus {
    New,
    NeedsInfo,
    Quoted,
    Accepted,
    InProgress,
    InReview,
    Delivered,
    Paid,
    Closed,
}

impl Default for RequestStatus {
    fn default() -> Self {
        RequestStatus::New
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::New => "new",
            RequestStatus::NeedsInfo => "needs-info",
            RequestStatus::Quoted => "quoted",
            RequestStatus::Accepted => "accepted",
            RequestStatus::InProgress => "in-progress",
            RequestStatus::InReview => "in-review",
            RequestStatus::Delivered => "delivered",
            RequestStatus::Paid => "paid",
            RequestStatus::Closed => "closed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "new" => Some(RequestStatus::New),
            "needs-info" => Some(RequestStatus::NeedsInfo),
            "quoted" => Some(RequestStatus::Quoted),
            "accepted" => Some(RequestStatus::Accepted),
            "in-progress" => Some(RequestStatus::InProgress),
            "in-review" => Some(RequestStatus::InReview),
            "delivered" => Some(RequestStatus::Delivered),
            "paid" => Some(RequestStatus::Paid),
            "closed" => Some(RequestStatus::Closed),
            _ => None,
        }
    }

    /// Paid and closed requests can no longer be bundled into an offer
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Paid | RequestStatus::Closed)
    }
}

/// A unit of client-submitted work awaiting agency action
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Request {
    pub id: String,
    #[serde(rename = "orgId")]
    pub org_id: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub request_type: RequestType,
    #[serde(default)]
    pub priority: RequestPriority,
    #[serde(default)]
    pub status: RequestStatus,
    #[serde(rename = "createdByUserId")]
    pub created_by_user_id: String,
    #[serde(rename = "createdByName")]
    pub created_by_name: String,
    #[serde(rename = "attachmentIds")]
    pub attachment_ids: Vec<String>,
    /// Set once a pricing offer bundles this request
    #[serde(rename = "pricingOfferId")]
    pub pricing_offer_id: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestCreateInput {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub request_type: RequestType,
    pub priority: Option<RequestPriority>,
    #[serde(rename = "attachmentIds")]
    pub attachment_ids: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            RequestStatus::New,
            RequestStatus::NeedsInfo,
            RequestStatus::Quoted,
            RequestStatus::Accepted,
            RequestStatus::InProgress,
            RequestStatus::InReview,
            RequestStatus::Delivered,
            RequestStatus::Paid,
            RequestStatus::Closed,
        ] {
            assert_eq!(RequestStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(RequestStatus::parse("archived"), None);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(RequestStatus::Paid.is_terminal());
        assert!(RequestStatus::Closed.is_terminal());
        assert!(!RequestStatus::Delivered.is_terminal());
        assert!(!RequestStatus::New.is_terminal());
    }

    #[test]
    fn test_status_serde_kebab_case() {
        let json = serde_json::to_string(&RequestStatus::NeedsInfo).unwrap();
        assert_eq!(json, "\"needs-info\"");
    }
}
