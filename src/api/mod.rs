//! Remote collection client for the CMS REST API.
//!
//! - [`client`] - reqwest-backed [`ApiClient`] implementing [`CollectionClient`]
//! - [`auth`] - login, registration and profile endpoints
//! - [`envelope`] - tolerant decoding of the API's response wrappers
//!
//! No request is retried. A failure is reported once to the caller, which
//! decides how to surface it.

mod auth;
mod client;
mod envelope;

pub use client::ApiClient;

use crate::models::{Entity, EntityKind};
use crate::util::UrlValidationError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default API endpoint used when neither config nor env override it.
pub const DEFAULT_BASE_URL: &str = "https://test-fe.mysellerpintar.com/api";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-2xx response. `message` is the server's `message` field when present.
    #[error("HTTP error {status}: {message}")]
    HttpStatus { status: u16, message: String },

    /// 401/403: the token is missing, expired or lacks the required role.
    #[error("Not authorized (HTTP {status}): {message}")]
    Unauthorized { status: u16, message: String },

    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),

    #[error("Upload file too large (exceeds {0} bytes)")]
    UploadTooLarge(u64),

    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(#[from] UrlValidationError),

    #[error("Failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Response missing required field: {0}")]
    MissingField(&'static str),
}

impl ApiError {
    /// True when the stored session should be discarded.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }
}

// ============================================================================
// Paging Types
// ============================================================================

/// Query parameters for the server-paged listing variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    /// 1-based page number. `None` leaves it to the server, which starts at 1.
    pub page: Option<usize>,
    pub limit: usize,
    pub sort: Option<&'static str>,
}

/// One page of a collection as reported by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerPage<E> {
    pub items: Vec<E>,
    /// Total matching entities across all pages.
    pub total: usize,
    pub page: usize,
    pub total_pages: usize,
}

// ============================================================================
// Client Contract
// ============================================================================

/// CRUD and upload operations against the remote collections.
///
/// All calls are fallible and may be slow; callers must not assume success.
#[async_trait]
pub trait CollectionClient: Send + Sync {
    /// Fetch the full collection in server order.
    async fn list<E: Entity>(&self) -> Result<Vec<E>, ApiError>;

    /// Fetch one page, letting the server do the slicing.
    async fn list_page<E: Entity>(&self, query: &PageQuery) -> Result<ServerPage<E>, ApiError>;

    async fn get<E: Entity>(&self, id: &str) -> Result<E, ApiError>;

    async fn create<E: Entity>(&self, fields: &E::Fields) -> Result<E, ApiError>;

    async fn update<E: Entity>(&self, id: &str, fields: &E::Fields) -> Result<E, ApiError>;

    async fn delete<E: Entity>(&self, id: &str) -> Result<(), ApiError>;

    /// Upload a binary asset, returning its public URL.
    async fn upload_asset(&self, path: &Path) -> Result<String, ApiError>;
}
