pub mod types;

pub use types::{Actor, Currency, PortalRole, ValidationError};

/// Generate a unique entity id
pub fn new_entity_id() -> String {
    nanoid::nanoid!()
}
