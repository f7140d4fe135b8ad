use thiserror::Error;

use cartshift_core::ValidationError;
use cartshift_storage::StorageError;

use crate::types::InviteStatus;

/// Organization service errors
#[derive(Error, Debug)]
pub enum OrganizationError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Validation errors: {0:?}")]
    Validation(Vec<ValidationError>),
    #[error("Organization record not found: {0}")]
    NotFound(String),
    #[error("Invite is not pending (current status: {0})")]
    InviteNotPending(InviteStatus),
    #[error("User {user_id} is already a member of organization {org_id}")]
    DuplicateMember { org_id: String, user_id: String },
}

impl OrganizationError {
    pub fn validation(field: &str, message: &str) -> Self {
        OrganizationError::Validation(vec![ValidationError::new(field, message)])
    }
}
