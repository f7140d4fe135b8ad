pub mod manager;
pub mod storage;
pub mod types;

pub use manager::{RequestError, RequestManager, RequestResult};
pub use storage::RequestStorage;
pub use types::{Request, RequestCreateInput, RequestPriority, RequestStatus, RequestType};
