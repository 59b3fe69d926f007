use super::envelope::{ErrorBody, ItemEnvelope, ListEnvelope, PagedEnvelope, UploadResponse};
use super::{ApiError, CollectionClient, PageQuery, ServerPage};
use crate::models::{Entity, EntityKind};
use crate::util::validate_base_url;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// JSON responses above this size are rejected.
const MAX_RESPONSE_SIZE: usize = 5 * 1024 * 1024; // 5MB

/// Upload files above this size are rejected before any bytes are sent.
const MAX_UPLOAD_SIZE: u64 = 10 * 1024 * 1024; // 10MB

/// HTTP client bound to one API base URL and, after login, one bearer token.
///
/// The token is held as a [`SecretString`] and only exposed when building the
/// `Authorization` header. The `Debug` impl never prints it.
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    token: Option<SecretString>,
    timeout_secs: u64,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base", &self.base.as_str())
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ApiClient {
    /// Build a client for `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidBaseUrl`] if the URL does not parse, is not
    /// http(s), or uses plain http against a non-loopback host.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let base = validate_base_url(base_url)?;

        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(30))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            base,
            token: None,
            timeout_secs: timeout.as_secs(),
        })
    }

    /// Attach a bearer token to every subsequent request.
    pub fn with_token(mut self, token: SecretString) -> Self {
        self.token = Some(token);
        self
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Join path segments onto the base URL, percent-encoding each one.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // validate_base_url guarantees an http(s) URL, which always has segments
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            path.extend(segments);
        }
        url
    }

    pub(crate) fn request(&self, method: Method, url: Url) -> RequestBuilder {
        tracing::debug!(method = %method, path = %url.path(), "API request");
        let builder = self.http.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    /// Send a request and turn transport failures and non-2xx statuses into
    /// [`ApiError`]s.
    pub(crate) async fn execute(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout(self.timeout_secs)
            } else {
                ApiError::Network(e)
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let path = response.url().path().to_owned();
        let body = read_limited_bytes(response, MAX_RESPONSE_SIZE)
            .await
            .unwrap_or_default();
        let message = error_message(status, &body);
        tracing::warn!(status = status.as_u16(), path = %path, message = %message, "API request failed");

        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Unauthorized {
                status: status.as_u16(),
                message,
            },
            _ => ApiError::HttpStatus {
                status: status.as_u16(),
                message,
            },
        })
    }

    pub(crate) async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let bytes = read_limited_bytes(response, MAX_RESPONSE_SIZE).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Map a 404 on an id-addressed endpoint to [`ApiError::NotFound`].
fn not_found_as(err: ApiError, kind: EntityKind, id: &str) -> ApiError {
    match err {
        ApiError::HttpStatus { status: 404, .. } => ApiError::NotFound {
            kind,
            id: id.to_owned(),
        },
        other => other,
    }
}

/// Best human-readable message for a failed response.
fn error_message(status: StatusCode, body: &[u8]) -> String {
    if let Ok(parsed) = serde_json::from_slice::<ErrorBody>(body) {
        if let Some(msg) = parsed.message.or(parsed.error) {
            return msg;
        }
    }
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_owned()
    } else {
        text.to_owned()
    }
}

fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

async fn read_limited_bytes(response: Response, limit: usize) -> Result<Vec<u8>, ApiError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(ApiError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(ApiError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(ApiError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}

#[async_trait]
impl CollectionClient for ApiClient {
    async fn list<E: Entity>(&self) -> Result<Vec<E>, ApiError> {
        let url = self.endpoint(&[E::KIND.path()]);
        let response = self.execute(self.request(Method::GET, url)).await?;
        let envelope: ListEnvelope<E> = Self::decode(response).await?;
        let items = envelope.into_items();
        tracing::debug!(kind = %E::KIND, count = items.len(), "Fetched collection");
        Ok(items)
    }

    async fn list_page<E: Entity>(&self, query: &PageQuery) -> Result<ServerPage<E>, ApiError> {
        let mut url = self.endpoint(&[E::KIND.path()]);
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(page) = query.page {
                pairs.append_pair("page", &page.to_string());
            }
            pairs.append_pair("limit", &query.limit.to_string());
            if let Some(sort) = query.sort {
                pairs.append_pair("sort", sort);
            }
        }
        let response = self.execute(self.request(Method::GET, url)).await?;
        let envelope: PagedEnvelope<E> = Self::decode(response).await?;
        Ok(envelope.into_page(query.page.unwrap_or(1), query.limit))
    }

    async fn get<E: Entity>(&self, id: &str) -> Result<E, ApiError> {
        let url = self.endpoint(&[E::KIND.path(), id]);
        let response = self
            .execute(self.request(Method::GET, url))
            .await
            .map_err(|e| not_found_as(e, E::KIND, id))?;
        let envelope: ItemEnvelope<E> = Self::decode(response).await?;
        Ok(envelope.into_item())
    }

    async fn create<E: Entity>(&self, fields: &E::Fields) -> Result<E, ApiError> {
        let url = self.endpoint(&[E::KIND.path()]);
        let response = self
            .execute(self.request(Method::POST, url).json(fields))
            .await?;
        let envelope: ItemEnvelope<E> = Self::decode(response).await?;
        let created = envelope.into_item();
        tracing::info!(kind = %E::KIND, id = %created.id(), "Created entity");
        Ok(created)
    }

    async fn update<E: Entity>(&self, id: &str, fields: &E::Fields) -> Result<E, ApiError> {
        let url = self.endpoint(&[E::KIND.path(), id]);
        let response = self
            .execute(self.request(Method::PUT, url).json(fields))
            .await
            .map_err(|e| not_found_as(e, E::KIND, id))?;
        let envelope: ItemEnvelope<E> = Self::decode(response).await?;
        tracing::info!(kind = %E::KIND, id = %id, "Updated entity");
        Ok(envelope.into_item())
    }

    async fn delete<E: Entity>(&self, id: &str) -> Result<(), ApiError> {
        let url = self.endpoint(&[E::KIND.path(), id]);
        self.execute(self.request(Method::DELETE, url))
            .await
            .map_err(|e| not_found_as(e, E::KIND, id))?;
        tracing::info!(kind = %E::KIND, id = %id, "Deleted entity");
        Ok(())
    }

    async fn upload_asset(&self, path: &Path) -> Result<String, ApiError> {
        let io_err = |source| ApiError::Io {
            path: path.to_path_buf(),
            source,
        };

        let meta = tokio::fs::metadata(path).await.map_err(io_err)?;
        if meta.len() > MAX_UPLOAD_SIZE {
            return Err(ApiError::UploadTooLarge(MAX_UPLOAD_SIZE));
        }
        let bytes = tokio::fs::read(path).await.map_err(io_err)?;

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_owned();
        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime_for(path))?;
        let form = Form::new().part("image", part);

        let url = self.endpoint(&["upload"]);
        let response = self
            .execute(self.request(Method::POST, url).multipart(form))
            .await?;
        let uploaded: UploadResponse = Self::decode(response).await?;
        let image_url = uploaded
            .image_url
            .ok_or(ApiError::MissingField("imageUrl"))?;
        tracing::info!(path = %path.display(), "Uploaded asset");
        Ok(image_url)
    }
}
