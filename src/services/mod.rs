//! Service layer
//!
//! Business logic shared by the HTTP handlers and the command line.

mod link_repository;
mod redirect;

pub use link_repository::*;
pub use redirect::*;
