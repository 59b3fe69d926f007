use super::schema::{Database, StorageError};
use crate::models::PreviewDraft;

impl Database {
    // ========================================================================
    // Preview Draft Operations
    // ========================================================================

    /// Park a draft for the preview screen, replacing any earlier one.
    pub async fn put_preview(&self, draft: &PreviewDraft) -> Result<(), StorageError> {
        let json = serde_json::to_string(draft).map_err(|source| StorageError::Encode {
            what: "preview draft",
            source,
        })?;
        sqlx::query(
            r#"
            INSERT INTO preview_draft (id, draft_json, saved_at)
            VALUES (1, ?, datetime('now'))
            ON CONFLICT(id) DO UPDATE SET draft_json = excluded.draft_json, saved_at = excluded.saved_at
        "#,
        )
        .bind(json)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Read the draft without consuming it.
    pub async fn peek_preview(&self) -> Result<Option<PreviewDraft>, StorageError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT draft_json FROM preview_draft WHERE id = 1")
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.and_then(|(json,)| decode_draft(&json)))
    }

    /// Read and remove the draft in one transaction.
    pub async fn take_preview(&self) -> Result<Option<PreviewDraft>, StorageError> {
        let mut tx = self.pool.begin().await?;
        let row: Option<(String,)> =
            sqlx::query_as("SELECT draft_json FROM preview_draft WHERE id = 1")
                .fetch_optional(&mut *tx)
                .await?;
        sqlx::query("DELETE FROM preview_draft")
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(row.and_then(|(json,)| decode_draft(&json)))
    }
}

fn decode_draft(json: &str) -> Option<PreviewDraft> {
    serde_json::from_str(json)
        .map_err(|e| tracing::warn!(error = %e, "Stored preview draft is unreadable, ignoring it"))
        .ok()
}
