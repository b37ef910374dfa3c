//! Install / activate lifecycle of one cache generation

use crate::cache::{CacheStore, GenerationId};
use crate::error::{WarmbootError, WarmbootResult};
use crate::fetch::{FetchInterceptor, Request, Response};
use crate::lifecycle::manifest::ResourceManifest;
use crate::lifecycle::scope::Scope;
use futures_util::future::{join, join_all, try_join_all};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Lifecycle phase of a controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Created, nothing done yet
    Pending,
    Installing,
    /// Every static resource stored, waiting for activation
    Installed,
    Activating,
    /// Stale generations purged, scope claimed (steady state)
    Activated,
    /// Install failed; this generation will not serve
    Redundant,
}

impl Phase {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Installing => "installing",
            Self::Installed => "installed",
            Self::Activating => "activating",
            Self::Activated => "activated",
            Self::Redundant => "redundant",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the install phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub generation: GenerationId,
    /// Static resources written
    pub stored: usize,
    /// External resources written
    pub external_stored: usize,
    /// External resources that could not be cached
    pub external_failed: Vec<String>,
    /// Install was skipped because the generation was already complete
    pub skipped: bool,
}

/// Outcome of the activate phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationReport {
    pub generation: GenerationId,
    pub removed: Vec<GenerationId>,
}

/// Install and activation results of `register`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub install: InstallReport,
    pub activation: ActivationReport,
}

/// Drives one generation through install and activation
pub struct LifecycleController {
    store: CacheStore,
    scope: Scope,
    manifest: ResourceManifest,
    generation: GenerationId,
    phase: Phase,
}

impl LifecycleController {
    pub fn new(
        store: CacheStore,
        scope: Scope,
        manifest: ResourceManifest,
        generation: GenerationId,
    ) -> Self {
        Self {
            store,
            scope,
            manifest,
            generation,
            phase: Phase::Pending,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn generation(&self) -> &GenerationId {
        &self.generation
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    fn expect_phase(&self, allowed: &[Phase], expected: &'static str) -> WarmbootResult<()> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(WarmbootError::InvalidPhase {
                expected,
                actual: self.phase.as_str(),
            })
        }
    }

    /// Install then activate, skipping install if this generation already
    /// completed one in an earlier run
    pub async fn register(&mut self) -> WarmbootResult<Registration> {
        self.expect_phase(&[Phase::Pending], "pending")?;

        let already_installed = self
            .store
            .generation_info(&self.generation)
            .await?
            .is_some_and(|info| info.is_complete());

        let install = if already_installed {
            debug!("Generation {} already installed", self.generation);
            self.phase = Phase::Installed;
            InstallReport {
                generation: self.generation.clone(),
                stored: 0,
                external_stored: 0,
                external_failed: Vec::new(),
                skipped: true,
            }
        } else {
            self.install().await?
        };

        let activation = self.activate().await?;
        Ok(Registration {
            install,
            activation,
        })
    }

    /// Populate the generation.
    ///
    /// Static resources are all-or-nothing: every one must fetch with a 2xx
    /// status before any is written. External resources are fetched
    /// alongside them, stored only once the static group succeeded, and
    /// their failures only logged.
    pub async fn install(&mut self) -> WarmbootResult<InstallReport> {
        self.expect_phase(&[Phase::Pending, Phase::Redundant], "pending")?;
        self.phase = Phase::Installing;
        info!("Installing cache generation {}", self.generation);

        match self.populate().await {
            Ok(report) => {
                if let Err(e) = self.store.mark_complete(&self.generation).await {
                    self.phase = Phase::Redundant;
                    return Err(e);
                }
                self.phase = Phase::Installed;
                info!(
                    "Installed {}: {} static, {} external ({} failed)",
                    self.generation,
                    report.stored,
                    report.external_stored,
                    report.external_failed.len()
                );
                Ok(report)
            }
            Err(e) => {
                warn!("Install of {} failed: {}", self.generation, e);
                self.phase = Phase::Redundant;
                Err(e)
            }
        }
    }

    async fn populate(&self) -> WarmbootResult<InstallReport> {
        let origin = self.scope.origin().clone();
        let network = self.scope.network();
        let static_requests = self.manifest.static_requests(&origin)?;
        let external_requests = self.manifest.external_requests(&origin)?;

        let static_group = try_join_all(static_requests.into_iter().map(|request| {
            let network = network.clone();
            async move {
                let response = network.fetch(&request).await.map_err(|e| {
                    WarmbootError::ManifestEntry {
                        resource: request.url().to_string(),
                        reason: e.to_string(),
                    }
                })?;
                if !response.is_success() {
                    return Err(WarmbootError::ManifestEntry {
                        resource: request.url().to_string(),
                        reason: format!("HTTP {}", response.status),
                    });
                }
                Ok((request, response))
            }
        }));
        let external_group = join_all(external_requests.into_iter().map(|request| {
            let network = network.clone();
            async move {
                let result = match network.fetch(&request).await {
                    Ok(response) if response.is_success() => Ok(response),
                    Ok(response) => Err(WarmbootError::HttpStatus {
                        url: request.url().to_string(),
                        status: response.status,
                    }),
                    Err(e) => Err(e),
                };
                (request, result)
            }
        }));

        let (fetched, external) = join(static_group, external_group).await;
        let fetched: Vec<(Request, Response)> = fetched?;

        let handle = self.store.open(&self.generation).await?;
        for (request, response) in &fetched {
            handle.put(request, response).await?;
        }

        let mut outcomes = Vec::with_capacity(external.len());
        for (request, result) in external {
            let result = match result {
                Ok(response) => handle.put(&request, &response).await.map(|_| ()),
                Err(e) => Err(e),
            };
            if let Err(ref e) = result {
                warn!("Skipping optional resource {}: {}", request, e);
            }
            outcomes.push((request, result.is_ok()));
        }

        let external_stored = outcomes.iter().filter(|(_, ok)| *ok).count();
        let external_failed = outcomes
            .into_iter()
            .filter(|(_, ok)| !ok)
            .map(|(request, _)| request.url().to_string())
            .collect();

        Ok(InstallReport {
            generation: self.generation.clone(),
            stored: fetched.len(),
            external_stored,
            external_failed,
            skipped: false,
        })
    }

    /// Purge stale generations and take over the scope
    pub async fn activate(&mut self) -> WarmbootResult<ActivationReport> {
        self.expect_phase(&[Phase::Installed], "installed")?;
        self.phase = Phase::Activating;
        info!("Activating cache generation {}", self.generation);

        let removed = match self.store.delete_all_except(&self.generation).await {
            Ok(removed) => removed,
            Err(e) => {
                self.phase = Phase::Installed;
                return Err(e);
            }
        };

        let handle = self.store.open(&self.generation).await?;
        let interceptor = Arc::new(FetchInterceptor::new(
            self.scope.origin().clone(),
            handle,
            self.scope.network(),
        ));
        self.scope.claim(interceptor);
        self.phase = Phase::Activated;

        Ok(ActivationReport {
            generation: self.generation.clone(),
            removed,
        })
    }

    /// Keep serving the newest complete generation after this one failed
    /// to install, the way the previous controller stays in charge.
    pub async fn serve_previous(&mut self) -> WarmbootResult<GenerationId> {
        self.expect_phase(&[Phase::Pending, Phase::Redundant], "redundant")?;

        let info = self
            .store
            .latest_complete()
            .await?
            .ok_or(WarmbootError::NoInstalledGeneration)?;
        let handle = self.store.open(&info.id).await?;

        warn!(
            "Generation {} unavailable, serving {} from cache",
            self.generation, info.id
        );
        self.scope.claim(Arc::new(FetchInterceptor::new(
            self.scope.origin().clone(),
            handle,
            self.scope.network(),
        )));
        Ok(info.id)
    }
}
