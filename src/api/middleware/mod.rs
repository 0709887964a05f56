pub mod auth;
pub mod request_id;

pub use auth::{AccessAuth, AccessGate};
pub use request_id::{RequestId, RequestIdMiddleware};
