//! Create/update/delete orchestration against the remote collections.
//!
//! State machine: `Idle → Submitting → {Success, Failed}`. The next action
//! starts from either terminal state. Forms are validated before any network
//! call, and a delete must be requested and then confirmed.
use super::cache::{LocalCollection, MissingEntity};
use crate::api::{ApiError, CollectionClient};
use crate::forms::{ArticleForm, CategoryForm, FieldErrors, Thumbnail};
use crate::models::{Article, Category, Entity, EntityKind};
use serde::Deserialize;
use thiserror::Error;

/// How the local collection catches up after a successful create or update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reconcile {
    /// Re-fetch the whole collection.
    #[default]
    Refetch,
    /// Splice the returned entity into the cache.
    Merge,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MutationState {
    #[default]
    Idle,
    Submitting,
    Success,
    Failed(String),
}

/// Whether a submit creates a new entity or updates an existing id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Create,
    Update(String),
}

#[derive(Debug, Error)]
pub enum MutationError {
    #[error("Form has {} invalid field(s)", .0.len())]
    Validation(FieldErrors),

    #[error("Another change is still being submitted")]
    Busy,

    #[error("{kind} {id} is not in the current list")]
    NotInCache { kind: EntityKind, id: String },

    #[error("No delete is awaiting confirmation")]
    NoPendingDelete,

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl From<MissingEntity> for MutationError {
    fn from(e: MissingEntity) -> Self {
        MutationError::NotInCache {
            kind: e.kind,
            id: e.id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingDelete {
    kind: EntityKind,
    id: String,
}

pub struct MutationCoordinator<'c, C> {
    client: &'c C,
    reconcile: Reconcile,
    state: MutationState,
    pending_delete: Option<PendingDelete>,
}

impl<'c, C: CollectionClient> MutationCoordinator<'c, C> {
    pub fn new(client: &'c C, reconcile: Reconcile) -> Self {
        Self {
            client,
            reconcile,
            state: MutationState::Idle,
            pending_delete: None,
        }
    }

    pub fn state(&self) -> &MutationState {
        &self.state
    }

    pub fn is_busy(&self) -> bool {
        self.state == MutationState::Submitting
    }

    /// Return to `Idle`. A submit abandoned mid-flight (its future dropped)
    /// leaves the coordinator `Submitting` until this is called.
    pub fn reset(&mut self) {
        self.state = MutationState::Idle;
    }

    fn ensure_idle(&self) -> Result<(), MutationError> {
        if self.is_busy() {
            tracing::debug!("Rejecting action while a submit is in flight");
            return Err(MutationError::Busy);
        }
        Ok(())
    }

    fn finish<T>(&mut self, result: Result<T, MutationError>) -> Result<T, MutationError> {
        self.state = match &result {
            Ok(_) => MutationState::Success,
            Err(e) => MutationState::Failed(e.to_string()),
        };
        result
    }

    /// Under merge reconciliation an update must target a cached entity.
    fn check_target<E: Entity>(
        &self,
        cache: &LocalCollection<E>,
        target: &Target,
    ) -> Result<(), MutationError> {
        match target {
            Target::Update(id) if self.reconcile == Reconcile::Merge && !cache.contains(id) => {
                Err(MutationError::NotInCache {
                    kind: E::KIND,
                    id: id.clone(),
                })
            }
            _ => Ok(()),
        }
    }

    // ========================================================================
    // Create / Update
    // ========================================================================

    /// Validate, upload a pending thumbnail, then create or update the article.
    pub async fn submit_article(
        &mut self,
        cache: &mut LocalCollection<Article>,
        target: &Target,
        form: &ArticleForm,
    ) -> Result<Article, MutationError> {
        self.ensure_idle()?;
        let errors = form.validate();
        if !errors.is_empty() {
            tracing::debug!(fields = ?errors.keys().collect::<Vec<_>>(), "Article form rejected");
            return Err(MutationError::Validation(errors));
        }
        self.check_target(cache, target)?;

        self.state = MutationState::Submitting;
        let result = self.write_article(cache, target, form).await;
        self.finish(result)
    }

    async fn write_article(
        &self,
        cache: &mut LocalCollection<Article>,
        target: &Target,
        form: &ArticleForm,
    ) -> Result<Article, MutationError> {
        let image_url = match &form.thumbnail {
            Thumbnail::Uploaded(url) => url.clone(),
            Thumbnail::Pending(path) => {
                let url = self.client.upload_asset(path).await?;
                tracing::info!(path = %path.display(), url = %url, "Uploaded thumbnail");
                url
            }
            Thumbnail::Missing => {
                let mut errors = FieldErrors::new();
                errors.insert("thumbnail", "Choose a thumbnail".to_string());
                return Err(MutationError::Validation(errors));
            }
        };
        let fields = form.to_fields(image_url);
        self.write(cache, target, &fields).await
    }

    /// Validate, then create or rename the category. `user_id` is sent on create.
    pub async fn submit_category(
        &mut self,
        cache: &mut LocalCollection<Category>,
        target: &Target,
        form: &CategoryForm,
        user_id: Option<String>,
    ) -> Result<Category, MutationError> {
        self.ensure_idle()?;
        let errors = form.validate();
        if !errors.is_empty() {
            return Err(MutationError::Validation(errors));
        }
        self.check_target(cache, target)?;

        let fields = form.to_fields(match target {
            Target::Create => user_id,
            Target::Update(_) => None,
        });
        self.state = MutationState::Submitting;
        let result = self.write(cache, target, &fields).await;
        self.finish(result)
    }

    async fn write<E: Entity>(
        &self,
        cache: &mut LocalCollection<E>,
        target: &Target,
        fields: &E::Fields,
    ) -> Result<E, MutationError> {
        let saved = match target {
            Target::Create => self.client.create::<E>(fields).await?,
            Target::Update(id) => self.client.update::<E>(id, fields).await?,
        };
        tracing::info!(kind = %E::KIND, id = %saved.id(), ?target, "Saved");

        match self.reconcile {
            Reconcile::Refetch => match self.client.list::<E>().await {
                Ok(items) => cache.replace(items),
                Err(e) => {
                    tracing::warn!(kind = %E::KIND, error = %e, "Refetch after save failed, merging locally");
                    merge(cache, target, saved.clone());
                }
            },
            Reconcile::Merge => merge(cache, target, saved.clone()),
        }
        Ok(saved)
    }

    // ========================================================================
    // Delete
    // ========================================================================

    /// First step of a delete: remember which entity the user picked.
    pub fn request_delete<E: Entity>(&mut self, id: &str) -> Result<(), MutationError> {
        self.ensure_idle()?;
        self.pending_delete = Some(PendingDelete {
            kind: E::KIND,
            id: id.to_owned(),
        });
        Ok(())
    }

    pub fn pending_delete(&self) -> Option<&str> {
        self.pending_delete.as_ref().map(|p| p.id.as_str())
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    /// Second step: send the delete and drop the entity from the cache.
    ///
    /// On failure the confirmation stays pending so it can be retried or
    /// cancelled, and the cache is left as it was. Returns the deleted id.
    pub async fn confirm_delete<E: Entity>(
        &mut self,
        cache: &mut LocalCollection<E>,
    ) -> Result<String, MutationError> {
        self.ensure_idle()?;
        let id = self
            .pending_delete
            .as_ref()
            .filter(|p| p.kind == E::KIND)
            .map(|p| p.id.clone())
            .ok_or(MutationError::NoPendingDelete)?;

        self.state = MutationState::Submitting;
        match self.client.delete::<E>(&id).await {
            Ok(()) => {
                if cache.remove_by_id(&id).is_err() {
                    tracing::debug!(kind = %E::KIND, id = %id, "Deleted entity was not cached");
                }
                self.pending_delete = None;
                self.state = MutationState::Success;
                tracing::info!(kind = %E::KIND, id = %id, "Deleted");
                Ok(id)
            }
            Err(e) => {
                tracing::warn!(kind = %E::KIND, id = %id, error = %e, "Delete failed");
                self.state = MutationState::Failed(e.to_string());
                Err(e.into())
            }
        }
    }
}

fn merge<E: Entity>(cache: &mut LocalCollection<E>, target: &Target, saved: E) {
    match target {
        Target::Create => cache.append(saved),
        Target::Update(_) => {
            if let Err(e) = cache.replace_by_id(saved) {
                tracing::debug!(error = %e, "Updated entity was not cached");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::test_support::{article, category, FakeClient};
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;
    use std::time::Duration;

    fn form(title: &str) -> ArticleForm {
        ArticleForm {
            title: title.into(),
            content: "<p>body</p>".into(),
            category_id: Some("c1".into()),
            thumbnail: Thumbnail::Uploaded("https://cdn.test/a.png".into()),
        }
    }

    #[tokio::test]
    async fn test_empty_title_makes_no_network_call() {
        let client = FakeClient::default();
        let mut cache = LocalCollection::new();
        let mut coord = MutationCoordinator::new(&client, Reconcile::Refetch);

        let err = coord
            .submit_article(&mut cache, &Target::Create, &form(""))
            .await
            .unwrap_err();
        match err {
            MutationError::Validation(errors) => assert!(errors.contains_key("title")),
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(client.calls().is_empty());
        assert_eq!(coord.state(), &MutationState::Idle);
    }

    #[tokio::test]
    async fn test_create_uploads_pending_thumbnail_then_refetches() {
        let client = FakeClient::default();
        client.seed(&[article("1", "Existing", "", "Tech", 0)]);
        let mut cache = LocalCollection::new();
        let mut coord = MutationCoordinator::new(&client, Reconcile::Refetch);

        let new_form = ArticleForm {
            thumbnail: Thumbnail::Pending(PathBuf::from("/tmp/thumb.png")),
            ..form("Fresh")
        };
        let saved = coord
            .submit_article(&mut cache, &Target::Create, &new_form)
            .await
            .unwrap();

        assert_eq!(saved.image_url.as_deref(), Some("https://cdn.test/thumb.png"));
        assert_eq!(client.calls(), vec!["upload", "create articles", "list articles"]);
        assert_eq!(cache.len(), 2);
        assert_eq!(coord.state(), &MutationState::Success);
    }

    #[tokio::test]
    async fn test_uploaded_thumbnail_is_not_reuploaded() {
        let client = FakeClient::default();
        let mut cache = LocalCollection::new();
        let mut coord = MutationCoordinator::new(&client, Reconcile::Merge);

        coord
            .submit_article(&mut cache, &Target::Create, &form("Fresh"))
            .await
            .unwrap();
        assert_eq!(client.calls(), vec!["create articles"]);
        assert_eq!(cache.total(), 1);
    }

    #[tokio::test]
    async fn test_merge_update_replaces_in_place() {
        let existing = vec![article("1", "One", "", "Tech", 0), article("2", "Two", "", "Tech", 1)];
        let client = FakeClient::default();
        client.seed(&existing);
        let mut cache = LocalCollection::from_items(existing);
        let mut coord = MutationCoordinator::new(&client, Reconcile::Merge);

        coord
            .submit_article(&mut cache, &Target::Update("1".into()), &form("One v2"))
            .await
            .unwrap();
        assert_eq!(cache.items()[0].title, "One v2");
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_merge_update_of_uncached_id_is_rejected_locally() {
        let client = FakeClient::default();
        let mut cache = LocalCollection::from_items(vec![article("1", "One", "", "Tech", 0)]);
        let mut coord = MutationCoordinator::new(&client, Reconcile::Merge);

        let err = coord
            .submit_article(&mut cache, &Target::Update("missing".into()), &form("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, MutationError::NotInCache { ref id, .. } if id == "missing"));
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_refetch_update_of_unknown_id_surfaces_not_found() {
        let client = FakeClient::default();
        let mut cache = LocalCollection::<Article>::new();
        let mut coord = MutationCoordinator::new(&client, Reconcile::Refetch);

        let err = coord
            .submit_article(&mut cache, &Target::Update("ghost".into()), &form("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, MutationError::Api(ApiError::NotFound { .. })));
        assert!(matches!(coord.state(), MutationState::Failed(_)));
    }

    #[tokio::test]
    async fn test_refetch_failure_falls_back_to_merge() {
        let client = FakeClient::default();
        let mut cache = LocalCollection::new();
        let mut coord = MutationCoordinator::new(&client, Reconcile::Refetch);

        client.fail_call("list articles", 500, "db down");
        let saved = coord
            .submit_article(&mut cache, &Target::Create, &form("Fresh"))
            .await
            .unwrap();
        assert_eq!(cache.items()[0].id, saved.id);
        assert_eq!(coord.state(), &MutationState::Success);
    }

    #[tokio::test]
    async fn test_category_create_sends_user_id_only_on_create() {
        let client = FakeClient::default();
        let mut cache = LocalCollection::new();
        let mut coord = MutationCoordinator::new(&client, Reconcile::Merge);

        let created = coord
            .submit_category(
                &mut cache,
                &Target::Create,
                &CategoryForm { name: " Tech ".into() },
                Some("u1".into()),
            )
            .await
            .unwrap();
        assert_eq!(created.name, "Tech");
        assert_eq!(created.user_id.as_deref(), Some("u1"));

        let renamed = coord
            .submit_category(
                &mut cache,
                &Target::Update(created.id.clone()),
                &CategoryForm { name: "Science".into() },
                Some("u1".into()),
            )
            .await
            .unwrap();
        assert_eq!(renamed.name, "Science");
        assert_eq!(cache.get(&created.id).unwrap().name, "Science");
    }

    #[tokio::test]
    async fn test_delete_requires_confirmation_and_removes_once() {
        let items: Vec<Category> = ["40", "41", "42", "43", "44"]
            .iter()
            .map(|id| category(id, id))
            .collect();
        let client = FakeClient::default();
        client.seed(&items);
        let mut cache = LocalCollection::from_items(items);
        let mut coord = MutationCoordinator::new(&client, Reconcile::Refetch);

        let err = coord.confirm_delete(&mut cache).await.unwrap_err();
        assert!(matches!(err, MutationError::NoPendingDelete));
        assert!(client.calls().is_empty());

        coord.request_delete::<Category>("42").unwrap();
        assert_eq!(coord.pending_delete(), Some("42"));
        let deleted = coord.confirm_delete(&mut cache).await.unwrap();

        assert_eq!(deleted, "42");
        assert_eq!(cache.len(), 4);
        assert_eq!(cache.total(), 4);
        assert!(!cache.contains("42"));
        assert_eq!(coord.pending_delete(), None);
        assert_eq!(client.calls(), vec!["delete categories 42"]);
    }

    #[tokio::test]
    async fn test_cancelled_delete_sends_nothing() {
        let client = FakeClient::default();
        let mut cache = LocalCollection::from_items(vec![category("1", "Tech")]);
        let mut coord = MutationCoordinator::new(&client, Reconcile::Refetch);

        coord.request_delete::<Category>("1").unwrap();
        coord.cancel_delete();
        assert!(coord.confirm_delete(&mut cache).await.is_err());
        assert!(client.calls().is_empty());
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_pending_delete_is_kind_specific() {
        let client = FakeClient::default();
        let mut cache = LocalCollection::<Article>::new();
        let mut coord = MutationCoordinator::new(&client, Reconcile::Refetch);

        coord.request_delete::<Category>("1").unwrap();
        let err = coord.confirm_delete(&mut cache).await.unwrap_err();
        assert!(matches!(err, MutationError::NoPendingDelete));
    }

    #[tokio::test]
    async fn test_delete_failure_keeps_confirmation_and_cache() {
        let items = vec![category("1", "Tech"), category("2", "News")];
        let client = FakeClient::default();
        client.seed(&items);
        let mut cache = LocalCollection::from_items(items);
        let mut coord = MutationCoordinator::new(&client, Reconcile::Refetch);

        client.fail_call("delete categories 1", 500, "constraint violation");
        coord.request_delete::<Category>("1").unwrap();
        let err = coord.confirm_delete(&mut cache).await.unwrap_err();

        assert!(matches!(err, MutationError::Api(ApiError::HttpStatus { status: 500, .. })));
        assert_eq!(coord.pending_delete(), Some("1"));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.total(), 2);
        match coord.state() {
            MutationState::Failed(msg) => assert!(msg.contains("constraint violation")),
            other => panic!("expected Failed, got {other:?}"),
        }

        // Retrying the same confirmation succeeds.
        coord.confirm_delete(&mut cache).await.unwrap();
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_action_while_submitting_is_busy() {
        let client = FakeClient::default();
        client.stall();
        let mut cache = LocalCollection::new();
        let mut coord = MutationCoordinator::new(&client, Reconcile::Merge);

        let abandoned = tokio::time::timeout(
            Duration::from_millis(50),
            coord.submit_article(&mut cache, &Target::Create, &form("slow")),
        )
        .await;
        assert!(abandoned.is_err());
        assert!(coord.is_busy());

        let err = coord
            .submit_article(&mut cache, &Target::Create, &form("again"))
            .await
            .unwrap_err();
        assert!(matches!(err, MutationError::Busy));
        assert!(matches!(
            coord.request_delete::<Article>("1"),
            Err(MutationError::Busy)
        ));
        assert_eq!(client.calls(), vec!["create articles"]);

        coord.reset();
        assert_eq!(coord.state(), &MutationState::Idle);
    }
}
