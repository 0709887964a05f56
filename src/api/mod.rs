pub mod constants;
pub mod middleware;
pub mod services;

pub use middleware::{AccessAuth, AccessGate, RequestIdMiddleware};
pub use services::{AppState, configure_app};
