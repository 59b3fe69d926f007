use std::net::IpAddr;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum UrlValidationError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    #[error("URL has no host")]
    MissingHost,
    /// Plain http is only accepted against loopback hosts (local test servers).
    #[error("Insecure URL: HTTPS required (except localhost for testing)")]
    Insecure,
    #[error("Private IP address not allowed: {0}")]
    PrivateIp(String),
    #[error("Localhost not allowed")]
    Localhost,
}

fn parse_http(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str.trim())?;
    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlValidationError::MissingHost);
    }
    Ok(url)
}

fn host_ip(url: &Url) -> Option<IpAddr> {
    let host = url.host_str()?;
    host.strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host)
        .parse()
        .ok()
}

fn is_loopback_host(url: &Url) -> bool {
    url.host_str() == Some("localhost") || host_ip(url).is_some_and(|ip| ip.is_loopback())
}

/// Validate the CMS API base URL.
///
/// The bearer token travels with every request, so plain http is refused
/// unless the host is loopback.
///
/// ```
/// use newsdesk::util::validate_base_url;
///
/// assert!(validate_base_url("https://cms.example.com/api").is_ok());
/// assert!(validate_base_url("http://127.0.0.1:8080/api").is_ok());
/// assert!(validate_base_url("http://cms.example.com/api").is_err());
/// ```
pub fn validate_base_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = parse_http(url_str)?;
    if url.scheme() == "http" {
        if !is_loopback_host(&url) {
            tracing::error!(base_url = %url, "Rejecting non-HTTPS base URL");
            return Err(UrlValidationError::Insecure);
        }
        tracing::warn!(base_url = %url, "Using non-HTTPS base URL (localhost only)");
    }
    Ok(url)
}

/// Validate a thumbnail URL supplied directly instead of uploading a file.
///
/// The URL is stored server-side and fetched by every reader, so loopback
/// and private addresses are rejected.
pub fn validate_image_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = parse_http(url_str)?;
    if is_loopback_host(&url) {
        return Err(UrlValidationError::Localhost);
    }
    if let Some(ip) = host_ip(&url) {
        if is_private_ip(&ip) {
            return Err(UrlValidationError::PrivateIp(ip.to_string()));
        }
    }
    Ok(url)
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => {
            ipv4.is_private() || ipv4.is_loopback() || ipv4.is_link_local() || ipv4.is_unspecified()
        }
        IpAddr::V6(ipv6) => {
            if ipv6.is_loopback() || ipv6.is_unspecified() {
                return true;
            }
            let segments = ipv6.segments();
            // fc00::/7 unique local, fe80::/10 link local
            (segments[0] & 0xfe00) == 0xfc00 || (segments[0] & 0xffc0) == 0xfe80
        }
    }
}
