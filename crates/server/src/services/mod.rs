//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Signup, login and the emailed-code password reset
//! - `notes` - Note validation and owner-scoped CRUD
//! - `email` - Transactional email (reset code, password changed)
//! - `push` - Web Push delivery
//! - `reminders` - Periodic due-date reminder scan

pub mod auth;
pub mod email;
pub mod notes;
pub mod push;
pub mod reminders;
