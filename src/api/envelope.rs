//! Response wrappers returned by the CMS API.
//!
//! The API is inconsistent: most list endpoints wrap results as
//! `{ "data": [...] }`, some detail endpoints return the bare object and
//! others wrap it in `data` too. Each envelope accepts both shapes.
use serde::Deserialize;

use super::ServerPage;

/// `{ "data": [...] }` or a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ListEnvelope<T> {
    Wrapped { data: Vec<T> },
    Bare(Vec<T>),
}

impl<T> ListEnvelope<T> {
    pub(crate) fn into_items(self) -> Vec<T> {
        match self {
            ListEnvelope::Wrapped { data } | ListEnvelope::Bare(data) => data,
        }
    }
}

/// `{ "data": {...} }` or the bare object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ItemEnvelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> ItemEnvelope<T> {
    pub(crate) fn into_item(self) -> T {
        match self {
            ItemEnvelope::Wrapped { data } | ItemEnvelope::Bare(data) => data,
        }
    }
}

/// Paged listing. Categories report `totalData/currentPage/totalPages`,
/// articles report `total/page/limit`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PagedEnvelope<T> {
    pub data: Vec<T>,
    #[serde(default, alias = "total")]
    pub total_data: Option<usize>,
    #[serde(default, alias = "page")]
    pub current_page: Option<usize>,
    #[serde(default)]
    pub total_pages: Option<usize>,
}

impl<T> PagedEnvelope<T> {
    /// Fill in whatever the server left out from the request parameters.
    pub(crate) fn into_page(self, requested_page: usize, limit: usize) -> ServerPage<T> {
        let total = self.total_data.unwrap_or(self.data.len());
        let total_pages = self
            .total_pages
            .unwrap_or_else(|| if limit == 0 { 0 } else { total.div_ceil(limit) });
        ServerPage {
            items: self.data,
            total,
            page: self.current_page.unwrap_or(requested_page),
            total_pages,
        }
    }
}

/// `POST /upload` response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UploadResponse {
    pub image_url: Option<String>,
}

/// `POST /auth/login` response.
#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    pub token: Option<String>,
}

/// Error body: `{ "message": "..." }` or `{ "error": "..." }`.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub message: Option<String>,
    pub error: Option<String>,
}
