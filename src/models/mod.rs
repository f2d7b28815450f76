// Request/response models shared by the cache layer
// Author: kelexine (https://github.com/kelexine)

pub mod request;
pub mod response;

pub use request::{RequestDescriptor, RequestKey};
pub use response::StoredResponse;
