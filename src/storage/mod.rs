//! SQLite-backed local state: the login session and the preview draft.
mod preview;
mod schema;
mod session;

pub use schema::{Database, StorageError};
