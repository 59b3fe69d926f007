//! Logged-in session: bearer token plus the profile it belongs to.
//!
//! A session is created by `login`, persisted through
//! [`crate::storage::Database::save_session`], and torn down on logout, on a
//! failed role check, or when the API rejects the token.
pub mod guard;

pub use guard::{authorize, GuardError, ADMIN_ONLY, ANY_ROLE};

use crate::models::{Role, User};
use secrecy::SecretString;
use std::fmt;

pub struct Session {
    pub token: SecretString,
    pub user: User,
}

impl Session {
    pub fn new(token: SecretString, user: User) -> Self {
        Self { token, user }
    }

    pub fn role(&self) -> Role {
        self.user.role
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"[REDACTED]")
            .field("user", &self.user)
            .finish()
    }
}
