//! Mode routing
//!
//! `serve` runs the HTTP server; every other subcommand runs once against
//! the configured store and exits.

pub mod cli;
pub mod server;

pub use cli::run_cli;
pub use server::run_server;
