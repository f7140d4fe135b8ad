use thiserror::Error;

use cartshift_core::ValidationError;
use cartshift_storage::StorageError;

use crate::types::PricingOfferStatus;

/// Pricing offer service errors
#[derive(Error, Debug)]
pub enum PricingError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Validation errors: {0:?}")]
    Validation(Vec<ValidationError>),
    #[error("Pricing offer not found: {0}")]
    NotFound(String),
    #[error("Offer is not editable in its current status ({0})")]
    NotEditable(PricingOfferStatus),
    #[error("Only draft offers can be sent (current status: {0})")]
    NotDraft(PricingOfferStatus),
    #[error("Unknown request: {0}")]
    UnknownRequest(String),
    #[error("Request {request_id} belongs to a different organization than the offer")]
    CrossOrgRequest { request_id: String },
    #[error("Request {0} is not eligible for pricing")]
    RequestNotEligible(String),
}

pub type PricingResult<T> = Result<T, PricingError>;
