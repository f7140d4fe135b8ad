pub mod error;
pub mod storage;
pub mod types;

pub use error::OrganizationError;
pub use storage::OrganizationStorage;
pub use types::{
    Invite, InviteCreateInput, InviteStatus, MemberRole, Organization, OrganizationCreateInput,
    OrganizationMember,
};
