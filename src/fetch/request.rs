//! Request identity, origins and responses

use crate::error::{WarmbootError, WarmbootResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use ureq::http::Uri;

/// Scheme, host and effective port of a URL
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Origin {
    scheme: String,
    host: String,
    port: u16,
}

impl Origin {
    /// Parse the origin out of an absolute http(s) URL
    pub fn parse(url: &str) -> WarmbootResult<Self> {
        Self::from_uri(&parse_uri(url)?, url)
    }

    fn from_uri(uri: &Uri, raw: &str) -> WarmbootResult<Self> {
        let invalid = |reason: &str| WarmbootError::InvalidUrl {
            url: raw.to_string(),
            reason: reason.to_string(),
        };

        let scheme = uri
            .scheme_str()
            .ok_or_else(|| invalid("missing scheme"))?
            .to_ascii_lowercase();
        let default_port = match scheme.as_str() {
            "http" => 80,
            "https" => 443,
            _ => return Err(invalid("only http and https are supported")),
        };
        let host = uri
            .host()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| invalid("missing host"))?
            .to_ascii_lowercase();
        let port = uri.port_u16().unwrap_or(default_port);

        Ok(Self { scheme, host, port })
    }

    fn default_port(&self) -> u16 {
        if self.scheme == "https" {
            443
        } else {
            80
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.port == self.default_port() {
            write!(f, "{}://{}", self.scheme, self.host)
        } else {
            write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
        }
    }
}

/// A GET request for one resource
///
/// The URL is always absolute with any fragment removed; it doubles as the
/// request identity used to key the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    url: String,
    origin: Origin,
}

impl Request {
    /// Resolve a resource reference against the application origin.
    ///
    /// Absolute `http(s)://` URLs keep their path and query but are rewritten
    /// onto the normalized origin; anything else is a path on
    /// `base` (`/app.js`, `app.js` and `./app.js` are equivalent).
    pub fn resolve(resource: &str, base: &Origin) -> WarmbootResult<Self> {
        let resource = resource.trim();
        let without_fragment = resource.split('#').next().unwrap_or_default();

        if is_absolute(without_fragment) {
            let uri = parse_uri(without_fragment)?;
            let origin = Origin::from_uri(&uri, without_fragment)?;
            let url = match uri.query() {
                Some(query) => format!("{}{}?{}", origin, uri.path(), query),
                None => format!("{}{}", origin, uri.path()),
            };
            return Ok(Self { url, origin });
        }

        let path = without_fragment.trim_start_matches("./");
        let path = path.trim_start_matches('/');
        Ok(Self {
            url: format!("{}/{}", base, path),
            origin: base.clone(),
        })
    }

    /// Absolute URL, also the cache identity
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn is_same_origin(&self, origin: &Origin) -> bool {
        &self.origin == origin
    }

    /// Stable on-disk key for this request (SHA256 of the URL, hex encoded)
    pub fn cache_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.url.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Resolve `reference` relative to this request's URL, the way a
    /// document resolves the relative links it contains
    pub fn join(&self, reference: &str) -> WarmbootResult<Self> {
        if is_absolute(reference) || reference.starts_with('/') {
            return Self::resolve(reference, &self.origin);
        }

        let base = self.url.split(['?', '#']).next().unwrap_or(&self.url);
        let authority_end = base.find("://").map(|i| i + 3).unwrap_or(0);
        let dir = match base[authority_end..].rfind('/') {
            Some(i) => &base[..authority_end + i + 1],
            None => base,
        };
        let sep = if dir.ends_with('/') { "" } else { "/" };
        let joined = format!("{}{}{}", dir, sep, reference.trim_start_matches("./"));
        Self::resolve(&joined, &self.origin)
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

fn parse_uri(url: &str) -> WarmbootResult<Uri> {
    url.parse().map_err(|e: ureq::http::uri::InvalidUri| WarmbootError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

fn is_absolute(resource: &str) -> bool {
    let lower = resource.get(..8).unwrap_or(resource).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Where a response body came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Network,
    Cache,
}

impl fmt::Display for ResponseSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => write!(f, "network"),
            Self::Cache => write!(f, "cache"),
        }
    }
}

/// A resolved response, from the network or the cache
#[derive(Debug, Clone)]
pub struct Response {
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    pub source: ResponseSource,
}

impl Response {
    /// Response that arrived over the network
    pub fn from_network(
        url: impl Into<String>,
        status: u16,
        content_type: Option<String>,
        body: Vec<u8>,
    ) -> Self {
        Self {
            url: url.into(),
            status,
            content_type,
            body,
            source: ResponseSource::Network,
        }
    }

    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn an error status into `HttpStatus`
    pub fn error_for_status(self) -> WarmbootResult<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(WarmbootError::HttpStatus {
                url: self.url,
                status: self.status,
            })
        }
    }
}
