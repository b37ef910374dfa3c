//! Component wiring
//!
//! Builds the cache store, routing scope, lifecycle controller and
//! bootstrapper for one configuration.

use crate::bootstrap::{Bootstrapper, StatusSink};
use crate::cache::{CacheStore, GenerationId};
use crate::config::Config;
use crate::error::{WarmbootError, WarmbootResult};
use crate::fetch::{FetchInterceptor, HttpNetwork, Network};
use crate::lifecycle::{LifecycleController, Registration, ResourceManifest, Scope};
use crate::model::{HttpModelLoader, ShellInitializer};
use std::sync::Arc;
use tracing::{info, warn};

/// How the scope came under a cache generation
#[derive(Debug)]
pub enum Attachment {
    /// The configured generation installed (or was already) and activated
    Registered(Registration),
    /// The configured generation could not install; an older one serves
    Previous {
        generation: GenerationId,
        reason: String,
    },
}

/// Everything one configuration needs at run time
pub struct AppContext {
    config: Config,
    store: CacheStore,
    scope: Scope,
    manifest: ResourceManifest,
    generation: GenerationId,
}

impl AppContext {
    /// Wire against the real network
    pub fn from_config(config: &Config) -> WarmbootResult<Self> {
        let network = Arc::new(HttpNetwork::new(
            config.network.timeout(),
            config.network.max_body_bytes(),
        ));
        Self::with_network(config, network)
    }

    pub fn with_network(config: &Config, network: Arc<dyn Network>) -> WarmbootResult<Self> {
        let origin = config.origin()?;
        Ok(Self {
            config: config.clone(),
            store: CacheStore::new(config.cache.root()),
            scope: Scope::new(origin, network),
            manifest: config.manifest(),
            generation: config.generation_id()?,
        })
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Generation this configuration installs
    pub fn generation(&self) -> &GenerationId {
        &self.generation
    }

    pub fn controller(&self) -> LifecycleController {
        LifecycleController::new(
            self.store.clone(),
            self.scope.clone(),
            self.manifest.clone(),
            self.generation.clone(),
        )
    }

    /// Register the configured generation, falling back to the newest
    /// complete one if it cannot be installed
    pub async fn attach(&self) -> WarmbootResult<Attachment> {
        let mut controller = self.controller();
        let install_err = match controller.register().await {
            Ok(registration) => return Ok(Attachment::Registered(registration)),
            Err(e) => e,
        };

        warn!("Could not install {}: {}", self.generation, install_err);
        match controller.serve_previous().await {
            Ok(generation) => Ok(Attachment::Previous {
                generation,
                reason: install_err.to_string(),
            }),
            Err(WarmbootError::NoInstalledGeneration) => Err(install_err),
            Err(e) => Err(e),
        }
    }

    /// Route the scope through the newest complete generation without
    /// installing anything; `None` when nothing is installed
    pub async fn attach_installed(&self) -> WarmbootResult<Option<GenerationId>> {
        let Some(info) = self.store.latest_complete().await? else {
            return Ok(None);
        };

        let handle = self.store.open(&info.id).await?;
        self.scope.claim(Arc::new(FetchInterceptor::new(
            self.scope.origin().clone(),
            handle,
            self.scope.network(),
        )));
        info!("Serving from installed generation {}", info.id);
        Ok(Some(info.id))
    }

    /// Bootstrapper loading the configured model through the scope
    pub fn bootstrapper(&self, status: Arc<dyn StatusSink>) -> Bootstrapper {
        let loader = HttpModelLoader::new(self.scope.client(), self.config.bootstrap.model_url.clone());
        let initializer = ShellInitializer::new(
            self.scope.client(),
            self.manifest.static_paths().to_vec(),
        );
        Bootstrapper::new(
            Arc::new(loader),
            Arc::new(initializer),
            status,
            self.config.retry_policy(),
        )
    }
}
