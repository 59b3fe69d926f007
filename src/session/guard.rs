use super::Session;
use crate::models::{Role, User};
use secrecy::ExposeSecret;
use thiserror::Error;

pub const ADMIN_ONLY: &[Role] = &[Role::Admin];
pub const ANY_ROLE: &[Role] = &[Role::Admin, Role::User];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GuardError {
    #[error("Not logged in. Run `newsdesk login <username>` first.")]
    NotLoggedIn,

    #[error("This command needs the {required} role, but you are logged in as {actual}")]
    Forbidden { required: String, actual: Role },
}

/// Check that a session exists, carries a token, and has one of `allowed`.
///
/// Any failure means the stored session should be discarded.
pub fn authorize<'s>(session: Option<&'s Session>, allowed: &[Role]) -> Result<&'s User, GuardError> {
    let session = session
        .filter(|s| !s.token.expose_secret().is_empty())
        .ok_or(GuardError::NotLoggedIn)?;

    if !allowed.contains(&session.user.role) {
        tracing::warn!(
            username = %session.user.username,
            role = %session.user.role,
            "Role not permitted for this command"
        );
        return Err(GuardError::Forbidden {
            required: allowed
                .iter()
                .map(|r| r.as_str())
                .collect::<Vec<_>>()
                .join(" or "),
            actual: session.user.role,
        });
    }
    Ok(&session.user)
}
