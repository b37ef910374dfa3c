//! Network access abstraction
//!
//! Provides a trait for issuing GET requests so the interceptor and the
//! lifecycle controller can run against the real network or a scripted one.

use crate::error::{WarmbootError, WarmbootResult};
use crate::fetch::request::{Request, Response};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Abstract network interface
///
/// An HTTP error status is a successful fetch (`Ok` with that status);
/// `Err` means the server could not be reached or the transfer broke off.
#[async_trait]
pub trait Network: Send + Sync {
    /// Perform a GET request
    async fn fetch(&self, request: &Request) -> WarmbootResult<Response>;
}

/// Network backed by a blocking `ureq` agent on tokio's blocking pool
#[derive(Clone)]
pub struct HttpNetwork {
    agent: ureq::Agent,
    max_body_bytes: u64,
}

impl HttpNetwork {
    /// Create an HTTP network with a per-request timeout and body size limit
    pub fn new(timeout: Duration, max_body_bytes: u64) -> Self {
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build();

        Self {
            agent: config.into(),
            max_body_bytes,
        }
    }

    fn fetch_blocking(&self, url: &str) -> WarmbootResult<Response> {
        let mut response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| WarmbootError::network(url, e.to_string()))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response
            .body_mut()
            .with_config()
            .limit(self.max_body_bytes)
            .read_to_vec()
            .map_err(|e| WarmbootError::network(url, format!("reading body: {}", e)))?;

        debug!("GET {} -> {} ({} bytes)", url, status, body.len());
        Ok(Response::from_network(url, status, content_type, body))
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> WarmbootResult<Response> {
        let network = self.clone();
        let url = request.url().to_string();

        tokio::task::spawn_blocking(move || network.fetch_blocking(&url))
            .await
            .map_err(|e| WarmbootError::Internal(format!("fetch task failed: {}", e)))?
    }
}
