//! Routing scope shared by all application clients
//!
//! Clients created before any generation is active talk to the network
//! directly. When a controller activates it claims the scope, and every
//! client, old or new, routes through its interceptor from the next request
//! on. No client has to be recreated.

use crate::error::WarmbootResult;
use crate::fetch::{FetchInterceptor, Network, Origin, Request, Response};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

type Controller = Option<Arc<FetchInterceptor>>;

/// Owner of the routing decision for one application origin
#[derive(Clone)]
pub struct Scope {
    origin: Origin,
    network: Arc<dyn Network>,
    controller: Arc<watch::Sender<Controller>>,
}

impl Scope {
    pub fn new(origin: Origin, network: Arc<dyn Network>) -> Self {
        let (controller, _) = watch::channel(None);
        Self {
            origin,
            network,
            controller: Arc::new(controller),
        }
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Underlying network, bypassing any interceptor
    pub fn network(&self) -> Arc<dyn Network> {
        self.network.clone()
    }

    /// Hand a client to the application
    pub fn client(&self) -> ResourceClient {
        ResourceClient {
            origin: self.origin.clone(),
            network: self.network.clone(),
            controller: self.controller.subscribe(),
        }
    }

    /// Route every client through `interceptor` from now on
    pub fn claim(&self, interceptor: Arc<FetchInterceptor>) {
        info!(
            "Generation {} now controls {}",
            interceptor.cache().generation(),
            self.origin
        );
        let previous = self.controller.send_replace(Some(interceptor));
        if let Some(previous) = previous {
            debug!("Released generation {}", previous.cache().generation());
        }
    }

    /// Interceptor currently in control, if any
    pub fn controller(&self) -> Option<Arc<FetchInterceptor>> {
        self.controller.borrow().clone()
    }

    /// Wait for the controlling interceptor's background cache writes
    pub async fn settle(&self) {
        if let Some(controller) = self.controller() {
            controller.settle().await;
        }
    }
}

/// Cloneable handle the application uses for every resource request
#[derive(Clone)]
pub struct ResourceClient {
    origin: Origin,
    network: Arc<dyn Network>,
    controller: watch::Receiver<Controller>,
}

impl ResourceClient {
    /// Fetch a path on the application origin or an absolute URL
    pub async fn fetch(&self, resource: &str) -> WarmbootResult<Response> {
        let request = Request::resolve(resource, &self.origin)?;
        self.fetch_request(&request).await
    }

    pub async fn fetch_request(&self, request: &Request) -> WarmbootResult<Response> {
        // Read the controller before the first await
        let controller = self.controller.borrow().clone();
        match controller {
            Some(interceptor) => interceptor.handle(request).await,
            None => self.network.fetch(request).await,
        }
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Whether an interceptor currently handles this client's requests
    pub fn is_controlled(&self) -> bool {
        self.controller.borrow().is_some()
    }
}
