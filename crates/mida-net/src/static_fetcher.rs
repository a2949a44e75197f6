//! In-memory fetcher
//!
//! Serves fixed responses by URL and counts requests, so callers can verify
//! that concurrent loads of the same resource coalesce.

use crate::{FetchFuture, Fetcher, NetError, Response};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use url::Url;

#[derive(Debug, Clone)]
enum Route {
    Respond { status: u16, body: Vec<u8> },
    Fail(String),
}

/// Fetcher backed by a URL → response table
#[derive(Debug, Default)]
pub struct StaticFetcher {
    routes: RefCell<HashMap<String, Route>>,
    counts: RefCell<HashMap<String, usize>>,
    /// Scheduler yields before each response, simulating pending I/O
    latency: Cell<usize>,
}

/// Route key: the URL without its fragment
fn route_key(url: &str) -> Result<String, NetError> {
    let mut parsed = Url::parse(url).map_err(|_| NetError::InvalidUrl(url.to_string()))?;
    parsed.set_fragment(None);
    Ok(parsed.to_string())
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Yield to the executor `ticks` times before every response
    pub fn with_latency(self, ticks: usize) -> Self {
        self.latency.set(ticks);
        self
    }

    /// Serve `body` with status 200
    pub fn insert(&self, url: &str, body: impl Into<Vec<u8>>) {
        self.insert_status(url, 200, body);
    }

    /// Serve `body` with the given status
    pub fn insert_status(&self, url: &str, status: u16, body: impl Into<Vec<u8>>) {
        let key = route_key(url).unwrap_or_else(|_| url.to_string());
        self.routes.borrow_mut().insert(key, Route::Respond { status, body: body.into() });
    }

    /// Fail requests for `url` with a network error
    pub fn insert_failure(&self, url: &str, message: &str) {
        let key = route_key(url).unwrap_or_else(|_| url.to_string());
        self.routes.borrow_mut().insert(key, Route::Fail(message.to_string()));
    }

    /// Number of requests made for `url`
    pub fn request_count(&self, url: &str) -> usize {
        let key = route_key(url).unwrap_or_else(|_| url.to_string());
        self.counts.borrow().get(&key).copied().unwrap_or(0)
    }

    /// Total number of requests
    pub fn total_requests(&self) -> usize {
        self.counts.borrow().values().sum()
    }
}

impl Fetcher for StaticFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> FetchFuture<'a> {
        Box::pin(async move {
            let key = route_key(url)?;
            *self.counts.borrow_mut().entry(key.clone()).or_insert(0) += 1;
            tracing::debug!("GET {}", key);

            for _ in 0..self.latency.get() {
                smol::future::yield_now().await;
            }

            let route = self.routes.borrow().get(&key).cloned();
            match route {
                Some(Route::Respond { status, body }) => {
                    Ok(Response::with_status(&key, status, body))
                }
                Some(Route::Fail(message)) => Err(NetError::Network(message)),
                None => Err(NetError::NotFound(key)),
            }
        })
    }
}
