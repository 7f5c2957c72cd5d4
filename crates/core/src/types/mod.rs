//! Core types for duenotes.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod priority;

pub use email::{Email, EmailError};
pub use id::*;
pub use priority::{Priority, PriorityError, UNRANKED};
