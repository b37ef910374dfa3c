//! Model loading and application start-up
//!
//! `HttpModelLoader` reads a layers-model document (topology plus a weights
//! manifest) and its binary shards through a `ResourceClient`, so a claimed
//! scope serves them from the cache. `ShellInitializer` checks the result is
//! usable and that the application shell can be served.

use crate::bootstrap::{AppInitializer, ModelLoader};
use crate::error::{WarmbootError, WarmbootResult};
use crate::fetch::Request;
use crate::lifecycle::ResourceClient;
use async_trait::async_trait;
use futures_util::future::try_join_all;
use serde::Deserialize;
use tracing::debug;

/// A model ready for the application
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedModel {
    /// Where the document came from
    pub url: String,
    /// Declared format, e.g. `layers-model`
    pub format: Option<String>,
    pub topology: serde_json::Value,
    /// All weight shards, concatenated in manifest order
    pub weights: Vec<u8>,
    pub shard_count: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelDocument {
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    model_topology: serde_json::Value,
    #[serde(default)]
    weights_manifest: Vec<WeightGroup>,
}

#[derive(Debug, Deserialize)]
struct WeightGroup {
    #[serde(default)]
    paths: Vec<String>,
}

/// Loads a model over a resource client
pub struct HttpModelLoader {
    client: ResourceClient,
    model_url: String,
}

impl HttpModelLoader {
    pub fn new(client: ResourceClient, model_url: impl Into<String>) -> Self {
        Self {
            client,
            model_url: model_url.into(),
        }
    }

    fn parse(&self, body: &[u8]) -> WarmbootResult<ModelDocument> {
        let document: ModelDocument = serde_json::from_slice(body)
            .map_err(|e| WarmbootError::ModelFormat(format!("{}: {}", self.model_url, e)))?;

        if document.model_topology.is_null() {
            return Err(WarmbootError::ModelFormat(format!(
                "{}: missing modelTopology",
                self.model_url
            )));
        }
        Ok(document)
    }
}

#[async_trait]
impl ModelLoader for HttpModelLoader {
    async fn load_model(&self) -> WarmbootResult<LoadedModel> {
        let request = Request::resolve(&self.model_url, self.client.origin())?;
        let response = self.client.fetch_request(&request).await?.error_for_status()?;
        let document = self.parse(&response.body)?;

        let shards = document
            .weights_manifest
            .iter()
            .flat_map(|group| group.paths.iter())
            .map(|path| request.join(path))
            .collect::<WarmbootResult<Vec<_>>>()?;

        let bodies = try_join_all(shards.iter().map(|shard| async move {
            let response = self.client.fetch_request(shard).await?.error_for_status()?;
            debug!("Fetched weight shard {} ({} bytes)", shard.url(), response.body.len());
            Ok::<_, WarmbootError>(response.body)
        }))
        .await?;

        Ok(LoadedModel {
            url: request.url().to_string(),
            format: document.format,
            topology: document.model_topology,
            weights: bodies.concat(),
            shard_count: shards.len(),
        })
    }
}

/// Checks the model and the application shell before declaring ready
pub struct ShellInitializer {
    client: ResourceClient,
    shell: Vec<String>,
}

impl ShellInitializer {
    pub fn new(client: ResourceClient, shell: Vec<String>) -> Self {
        Self { client, shell }
    }
}

#[async_trait]
impl AppInitializer for ShellInitializer {
    async fn initialize(&self, model: &LoadedModel) -> WarmbootResult<()> {
        if model.weights.is_empty() {
            return Err(WarmbootError::ModelFormat(format!(
                "{} has no weights",
                model.url
            )));
        }

        for path in &self.shell {
            self.client.fetch(path).await?.error_for_status()?;
        }
        Ok(())
    }
}
