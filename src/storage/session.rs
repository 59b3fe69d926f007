use secrecy::{ExposeSecret, SecretString};

use super::schema::{Database, StorageError};
use crate::models::User;
use crate::session::Session;

impl Database {
    // ========================================================================
    // Session Operations
    // ========================================================================

    /// Store the session, replacing any previous one.
    pub async fn save_session(&self, session: &Session) -> Result<(), StorageError> {
        let user_json = serde_json::to_string(&session.user).map_err(|source| StorageError::Encode {
            what: "user profile",
            source,
        })?;
        sqlx::query(
            r#"
            INSERT INTO session (id, token, user_json, saved_at)
            VALUES (1, ?, ?, datetime('now'))
            ON CONFLICT(id) DO UPDATE SET
                token = excluded.token,
                user_json = excluded.user_json,
                saved_at = excluded.saved_at
        "#,
        )
        .bind(session.token.expose_secret())
        .bind(user_json)
        .execute(&self.pool)
        .await?;

        tracing::debug!(username = %session.user.username, "Session saved");
        Ok(())
    }

    /// The stored session, if any.
    ///
    /// A row whose profile no longer parses is treated like no session and
    /// removed.
    pub async fn load_session(&self) -> Result<Option<Session>, StorageError> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT token, user_json FROM session WHERE id = 1")
                .fetch_optional(&self.pool)
                .await?;

        let Some((token, user_json)) = row else {
            return Ok(None);
        };
        match serde_json::from_str::<User>(&user_json) {
            Ok(user) => Ok(Some(Session::new(SecretString::from(token), user))),
            Err(e) => {
                tracing::warn!(error = %e, "Stored session is unreadable, discarding it");
                self.clear_session().await?;
                Ok(None)
            }
        }
    }

    /// Remove the session. Returns whether one existed.
    pub async fn clear_session(&self) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM session")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
