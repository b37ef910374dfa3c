//! Resource manifest for one cache generation

use crate::cache::GenerationId;
use crate::error::{WarmbootError, WarmbootResult};
use crate::fetch::{Origin, Request};
use std::collections::HashSet;

/// Resources a generation caches at install time
///
/// Static paths are the minimum offline-runnable application shell and must
/// all be stored for install to succeed. External URLs are large third-party
/// dependencies cached on a best-effort basis.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceManifest {
    static_paths: Vec<String>,
    external_urls: Vec<String>,
}

impl ResourceManifest {
    /// Build a manifest, dropping duplicates while keeping first-seen order
    pub fn new<S, E>(static_paths: S, external_urls: E) -> Self
    where
        S: IntoIterator,
        S::Item: Into<String>,
        E: IntoIterator,
        E::Item: Into<String>,
    {
        Self {
            static_paths: dedup(static_paths),
            external_urls: dedup(external_urls),
        }
    }

    pub fn static_paths(&self) -> &[String] {
        &self.static_paths
    }

    pub fn external_urls(&self) -> &[String] {
        &self.external_urls
    }

    /// Generation id: explicit version when given, else derived from contents
    pub fn generation_id(&self, prefix: &str, version: Option<&str>) -> WarmbootResult<GenerationId> {
        match version {
            Some(version) => GenerationId::from_version(prefix, version),
            None => GenerationId::from_resources(
                prefix,
                self.static_paths
                    .iter()
                    .chain(self.external_urls.iter())
                    .map(String::as_str),
            ),
        }
    }

    /// Resolve static paths; each must live on `origin`
    pub fn static_requests(&self, origin: &Origin) -> WarmbootResult<Vec<Request>> {
        self.static_paths
            .iter()
            .map(|path| {
                let request = Request::resolve(path, origin)?;
                if !request.is_same_origin(origin) {
                    return Err(WarmbootError::InvalidUrl {
                        url: path.clone(),
                        reason: format!("static resources must be served from {}", origin),
                    });
                }
                Ok(request)
            })
            .collect()
    }

    /// Resolve external URLs; each must be absolute
    pub fn external_requests(&self, origin: &Origin) -> WarmbootResult<Vec<Request>> {
        self.external_urls
            .iter()
            .map(|url| {
                // Parsing the origin rejects relative references
                Origin::parse(url)?;
                Request::resolve(url, origin)
            })
            .collect()
    }
}

fn dedup<I>(items: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .map(Into::into)
        .filter(|item: &String| seen.insert(item.clone()))
        .collect()
}
