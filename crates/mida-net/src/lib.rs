//! mida Networking
//!
//! The fetch seam. Loading documents and schemas is an external concern, so
//! the engine only talks to a [`Fetcher`]; hosts plug in their HTTP stack and
//! tests use [`StaticFetcher`].

mod static_fetcher;

pub use static_fetcher::StaticFetcher;
pub use url::Url;

use std::future::Future;
use std::pin::Pin;

/// Boxed, non-`Send` future returned by fetchers
pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<Response, NetError>> + 'a>>;

/// Source of remote resources
///
/// Object safe so the engine can hold an `Rc<dyn Fetcher>`.
pub trait Fetcher {
    /// Fetch a URL with GET
    fn fetch<'a>(&'a self, url: &'a str) -> FetchFuture<'a>;
}

/// HTTP Response
#[derive(Debug, Clone)]
pub struct Response {
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    /// 200 response with a body
    pub fn ok(url: &str, body: impl Into<Vec<u8>>) -> Self {
        Self::with_status(url, 200, body)
    }

    /// Response with an explicit status
    pub fn with_status(url: &str, status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            url: url.to_string(),
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Check if response is OK (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Get header value (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Body as UTF-8 text
    pub fn text(&self) -> Result<String, NetError> {
        String::from_utf8(self.body.clone())
            .map_err(|e| NetError::Network(e.to_string()))
    }
}

/// Network error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NetError {
    #[error("HTTP error: {status}")]
    HttpError { status: u16 },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("No resource at {0}")]
    NotFound(String),
}

/// Fetch a URL and fail on non-2xx statuses
pub async fn fetch_ok(fetcher: &dyn Fetcher, url: &str) -> Result<Response, NetError> {
    let response = fetcher.fetch(url).await?;
    if !response.is_success() {
        return Err(NetError::HttpError { status: response.status });
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_success_range() {
        assert!(Response::ok("https://a.test/", "x").is_success());
        assert!(!Response::with_status("https://a.test/", 404, "").is_success());
        assert!(!Response::with_status("https://a.test/", 302, "").is_success());
    }

    #[test]
    fn test_header_lookup_ignores_case() {
        let mut response = Response::ok("https://a.test/", "");
        response.headers.push(("Content-Type".into(), "application/json".into()));
        assert_eq!(response.header("content-type"), Some("application/json"));
    }

    #[test]
    fn test_fetch_ok_maps_status() {
        let fetcher = StaticFetcher::new();
        fetcher.insert_status("https://a.test/missing", 404, "");
        let err = smol::block_on(fetch_ok(&fetcher, "https://a.test/missing")).unwrap_err();
        assert_eq!(err, NetError::HttpError { status: 404 });
    }
}
