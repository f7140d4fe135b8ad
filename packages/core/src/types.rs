use serde::{Deserialize, Serialize};
use std::fmt;

/// Currencies accepted on pricing offers. A label only; no conversion
/// is performed anywhere in the portal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Ils,
    Eur,
}

impl Default for Currency {
    fn default() -> Self {
        Currency::Usd
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Currency::Usd => write!(f, "USD"),
            Currency::Ils => write!(f, "ILS"),
            Currency::Eur => write!(f, "EUR"),
        }
    }
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Ils => "ILS",
            Currency::Eur => "EUR",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "USD" => Some(Currency::Usd),
            "ILS" => Some(Currency::Ils),
            "EUR" => Some(Currency::Eur),
            _ => None,
        }
    }
}

/// Portal-wide roles. Agency staff see every organization; clients are
/// scoped to their own.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PortalRole {
    Agency,
    Client,
}

impl PortalRole {
    pub fn is_agency(&self) -> bool {
        matches!(self, PortalRole::Agency)
    }
}

/// The acting user, passed explicitly to every mutating service call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Actor {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "userName")]
    pub user_name: String,
    pub role: PortalRole,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, user_name: impl Into<String>, role: PortalRole) -> Self {
        Actor {
            user_id: user_id.into(),
            user_name: user_name.into(),
            role,
        }
    }

    pub fn agency(user_id: impl Into<String>, user_name: impl Into<String>) -> Self {
        Self::new(user_id, user_name, PortalRole::Agency)
    }

    pub fn client(user_id: impl Into<String>, user_name: impl Into<String>) -> Self {
        Self::new(user_id, user_name, PortalRole::Client)
    }
}

/// Field-level validation error, surfaced next to the offending field
/// rather than as an opaque failure.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}
