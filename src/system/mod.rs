//! System-level modules
//!
//! Process-wide concerns that are not part of the link domain:
//! - Logging initialisation

pub mod logging;

pub use logging::init_logging;
