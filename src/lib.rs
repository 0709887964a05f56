//! linkmap - a private URL shortener
//!
//! Short keys map to target URLs in an external key/value store. A redirect
//! path resolves keys; a management API behind an identity-aware access
//! proxy creates, lists, updates and deletes them.
//!
//! # Architecture
//! - `storage`: key/value store adapters and the stored record shapes
//! - `auth`: access assertion validation
//! - `services`: link repository and redirect resolver
//! - `api`: HTTP routes, handlers and middleware
//! - `config`: configuration management
//! - `runtime`: application lifecycle and execution modes
//! - `system`: logging setup

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod errors;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
