//! duenotes core - Shared types library.
//!
//! This crate provides the domain types used across the duenotes components:
//! - `server` - The web application and reminder scheduler
//! - `cli` - Command-line tools for migrations and one-off reminder sweeps
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, emails, and note priorities

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
