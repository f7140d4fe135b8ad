use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who can read a comment. Agency-only comments are hidden from client
/// members of the organization.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum CommentVisibility {
    Shared,
    AgencyOnly,
}

impl Default for CommentVisibility {
    fn default() -> Self {
        CommentVisibility::Shared
    }
}

impl CommentVisibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommentVisibility::Shared => "shared",
            CommentVisibility::AgencyOnly => "agency-only",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "shared" => Some(CommentVisibility::Shared),
            "agency-only" => Some(CommentVisibility::AgencyOnly),
            _ => None,
        }
    }
}

/// A comment on a request. Append-only; there is no edit or delete.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    pub id: String,
    #[serde(rename = "requestId")]
    pub request_id: String,
    #[serde(rename = "orgId")]
    pub org_id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "userName")]
    pub user_name: String,
    pub content: String,
    #[serde(default)]
    pub visibility: CommentVisibility,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Input for appending a comment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentCreateInput {
    pub content: String,
    #[serde(default)]
    pub visibility: CommentVisibility,
}
