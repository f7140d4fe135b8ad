use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use cartshift_core::Currency;

/// A priced line on an offer. Amounts are integers in minor currency
/// units (cents); quantities are whole numbers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineItem {
    pub id: String,
    pub description: String,
    pub quantity: i64,
    #[serde(rename = "unitPrice")]
    pub unit_price: i64,
    pub notes: Option<String>,
}

/// Line item as submitted; ids are assigned server-side
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItemInput {
    pub description: String,
    pub quantity: i64,
    #[serde(rename = "unitPrice")]
    pub unit_price: i64,
    pub notes: Option<String>,
}

/// The derived offer total: Σ quantity × unit price, in minor units.
/// Never stored independently of the line items.
pub fn total_amount(items: &[LineItem]) -> i64 {
    items.iter().map(|item| item.quantity * item.unit_price).sum()
}

/// Offer status. Draft and sent offers stay editable; accepted, paid and
/// declined are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PricingOfferStatus {
    Draft,
    Sent,
    Accepted,
    Paid,
    Declined,
}

impl Default for PricingOfferStatus {
    fn default() -> Self {
        PricingOfferStatus::Draft
    }
}

impl fmt::Display for PricingOfferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl PricingOfferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PricingOfferStatus::Draft => "draft",
            PricingOfferStatus::Sent => "sent",
            PricingOfferStatus::Accepted => "accepted",
            PricingOfferStatus::Paid => "paid",
            PricingOfferStatus::Declined => "declined",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(PricingOfferStatus::Draft),
            "sent" => Some(PricingOfferStatus::Sent),
            "accepted" => Some(PricingOfferStatus::Accepted),
            "paid" => Some(PricingOfferStatus::Paid),
            "declined" => Some(PricingOfferStatus::Declined),
            _ => None,
        }
    }

    /// Offers may be edited while draft or sent; editing an already-sent
    /// offer is intentional behavior carried over from the source system.
    pub fn is_editable(&self) -> bool {
        matches!(self, PricingOfferStatus::Draft | PricingOfferStatus::Sent)
    }
}

/// A quote bundling one or more requests for a single client organization
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricingOffer {
    pub id: String,
    #[serde(rename = "orgId")]
    pub org_id: String,
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "lineItems")]
    pub line_items: Vec<LineItem>,
    pub currency: Currency,
    /// Derived from line items; recomputed on every edit
    #[serde(rename = "totalAmount")]
    pub total_amount: i64,
    #[serde(default)]
    pub status: PricingOfferStatus,
    #[serde(rename = "requestIds")]
    pub request_ids: Vec<String>,
    #[serde(rename = "clientName")]
    pub client_name: Option<String>,
    #[serde(rename = "clientEmail")]
    pub client_email: Option<String>,
    #[serde(rename = "validUntil")]
    pub valid_until: Option<DateTime<Utc>>,
    #[serde(rename = "agencyNotes")]
    pub agency_notes: Option<String>,
    #[serde(rename = "createdBy")]
    pub created_by: String,
    #[serde(rename = "createdByName")]
    pub created_by_name: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
    #[serde(rename = "sentAt")]
    pub sent_at: Option<DateTime<Utc>>,
}

/// Input for creating a new offer (persisted as draft)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingOfferCreateInput {
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "lineItems")]
    pub line_items: Vec<LineItemInput>,
    pub currency: Currency,
    #[serde(rename = "requestIds")]
    pub request_ids: Option<Vec<String>>,
    #[serde(rename = "clientName")]
    pub client_name: Option<String>,
    #[serde(rename = "clientEmail")]
    pub client_email: Option<String>,
    #[serde(rename = "validUntil")]
    pub valid_until: Option<DateTime<Utc>>,
    #[serde(rename = "agencyNotes")]
    pub agency_notes: Option<String>,
}

/// Input for updating an existing offer; absent fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PricingOfferUpdateInput {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "lineItems")]
    pub line_items: Option<Vec<LineItemInput>>,
    pub currency: Option<Currency>,
    #[serde(rename = "requestIds")]
    pub request_ids: Option<Vec<String>>,
    #[serde(rename = "clientName")]
    pub client_name: Option<String>,
    #[serde(rename = "clientEmail")]
    pub client_email: Option<String>,
    #[serde(rename = "validUntil")]
    pub valid_until: Option<DateTime<Utc>>,
    #[serde(rename = "agencyNotes")]
    pub agency_notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(quantity: i64, unit_price: i64) -> LineItem {
        LineItem {
            id: cartshift_core::new_entity_id(),
            description: "work".to_string(),
            quantity,
            unit_price,
            notes: None,
        }
    }

    #[test]
    fn test_total_amount_sums_line_items() {
        let items = vec![item(2, 5000), item(1, 2500)];
        assert_eq!(total_amount(&items), 12500);
    }

    #[test]
    fn test_total_amount_empty() {
        assert_eq!(total_amount(&[]), 0);
    }

    #[test]
    fn test_total_amount_idempotent() {
        let items = vec![item(3, 999), item(7, 0)];
        let first = total_amount(&items);
        assert_eq!(total_amount(&items), first);
        assert_eq!(first, 2997);
    }

    #[test]
    fn test_editable_statuses() {
        assert!(PricingOfferStatus::Draft.is_editable());
        assert!(PricingOfferStatus::Sent.is_editable());
        assert!(!PricingOfferStatus::Accepted.is_editable());
        assert!(!PricingOfferStatus::Paid.is_editable());
        assert!(!PricingOfferStatus::Declined.is_editable());
    }
}
