//! Domain models for the notes application.

pub mod note;
pub mod push;
pub mod session;
pub mod user;

pub use note::{DEFAULT_CATEGORY, Note, NoteFields};
pub use push::{PushKeys, PushSubscription};
pub use session::{CurrentUser, ResetStage, keys as session_keys};
pub use user::{MAX_RESET_ATTEMPTS, ResetCode, User};
