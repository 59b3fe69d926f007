//! Domain types shared by the API client, the collection views and the CLI.
//!
//! Field names follow the remote API's camelCase JSON. Optional fields carry
//! `#[serde(default)]` because list and detail endpoints do not always return
//! the same projection of an entity.
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Entity Kinds
// ============================================================================

/// The two persisted collections exposed by the remote API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Article,
    Category,
}

impl EntityKind {
    /// Collection path segment under the API base URL.
    pub fn path(self) -> &'static str {
        match self {
            EntityKind::Article => "articles",
            EntityKind::Category => "categories",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Article => f.write_str("article"),
            EntityKind::Category => f.write_str("category"),
        }
    }
}

/// A persisted domain object identified by a stable string id.
///
/// The accessors are what the filter/sort predicate reads. Entities without a
/// natural body or category (categories) use the default empty values so the
/// same predicate serves every list view.
pub trait Entity: Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Payload sent on create/update.
    type Fields: Serialize + fmt::Debug + Send + Sync;

    const KIND: EntityKind;

    fn id(&self) -> &str;

    /// Display title; categories use their name.
    fn title(&self) -> &str;

    fn content(&self) -> &str {
        ""
    }

    fn category_name(&self) -> Option<&str> {
        None
    }

    fn created_at(&self) -> DateTime<Utc>;
}

// ============================================================================
// Article
// ============================================================================

/// Denormalized category reference embedded in an article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    #[serde(default)]
    pub id: String,
    pub name: String,
}

/// Owning-user reference embedded in an article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    #[serde(default)]
    pub id: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub title: String,
    /// Rich-text body as HTML.
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub category: Option<CategoryRef>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub user: Option<UserRef>,
}

impl Article {
    /// Category id from either the flat `categoryId` or the embedded reference.
    pub fn category_ref_id(&self) -> Option<&str> {
        self.category_id
            .as_deref()
            .or_else(|| self.category.as_ref().map(|c| c.id.as_str()))
            .filter(|id| !id.is_empty())
    }

    pub fn author(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.username.as_str())
    }
}

/// Create/update payload for an article.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleFields {
    pub title: String,
    pub content: String,
    pub category_id: String,
    pub image_url: String,
}

impl Entity for Article {
    type Fields = ArticleFields;
    const KIND: EntityKind = EntityKind::Article;

    fn id(&self) -> &str {
        &self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn content(&self) -> &str {
        &self.content
    }

    fn category_name(&self) -> Option<&str> {
        self.category.as_ref().map(|c| c.name.as_str())
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

// ============================================================================
// Category
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Create/update payload for a category. `userId` is only sent on create.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryFields {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl Entity for Category {
    type Fields = CategoryFields;
    const KIND: EntityKind = EntityKind::Category;

    fn id(&self) -> &str {
        &self.id
    }

    fn title(&self) -> &str {
        &self.name
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

// ============================================================================
// Users and Roles
// ============================================================================

#[derive(Debug, Error)]
#[error("Unknown role: {0}")]
pub struct UnknownRole(pub String);

/// Capability attached to a user profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::User => "User",
        }
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Admin" => Ok(Role::Admin),
            "User" => Ok(Role::User),
            other => Err(UnknownRole(other.to_owned())),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_owned()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Profile returned by `GET /auth/profile`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(default, alias = "userId")]
    pub id: String,
    pub username: String,
    pub role: Role,
}

// ============================================================================
// Preview Draft
// ============================================================================

/// Which form produced a preview draft, so "back" can return to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftSource {
    Create,
    Edit,
}

/// Article payload parked between an edit form and the preview screen.
///
/// `id` is set when `source` is [`DraftSource::Edit`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub content: String,
    pub category_id: String,
    pub thumbnail: String,
    pub source: DraftSource,
}

impl PreviewDraft {
    pub fn into_fields(self) -> ArticleFields {
        ArticleFields {
            title: self.title,
            content: self.content,
            category_id: self.category_id,
            image_url: self.thumbnail,
        }
    }
}
