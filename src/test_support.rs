//! In-memory doubles for the network, the model loader, the initializer and
//! the status sink

use crate::bootstrap::{AppInitializer, ModelLoader, StatusSink};
use crate::error::{WarmbootError, WarmbootResult};
use crate::fetch::{Network, Request, Response};
use crate::model::LoadedModel;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Network answering from a URL table; unknown URLs get a 404
#[derive(Default)]
pub struct ScriptedNetwork {
    routes: Mutex<HashMap<String, (u16, Vec<u8>)>>,
    broken: Mutex<HashSet<String>>,
    calls: Mutex<HashMap<String, usize>>,
    offline: AtomicBool,
}

impl ScriptedNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, status: u16, body: &str) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), (status, body.as_bytes().to_vec()));
    }

    /// Make a single URL unreachable
    pub fn fail(&self, url: &str) {
        self.broken.lock().unwrap().insert(url.to_string());
    }

    pub fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    /// Requests that reached this network for `url`, including failed ones
    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &Request) -> WarmbootResult<Response> {
        let url = request.url();
        *self.calls.lock().unwrap().entry(url.to_string()).or_default() += 1;

        if self.offline.load(Ordering::SeqCst) {
            return Err(WarmbootError::network(url, "offline"));
        }
        if self.broken.lock().unwrap().contains(url) {
            return Err(WarmbootError::network(url, "connection reset"));
        }

        let route = self.routes.lock().unwrap().get(url).cloned();
        Ok(match route {
            Some((status, body)) => Response::from_network(url, status, None, body),
            None => Response::from_network(url, 404, None, Vec::new()),
        })
    }
}

/// What one `ScriptedLoader` attempt does
#[derive(Debug, Clone)]
pub enum LoadOutcome {
    Ok,
    Fail(String),
    /// Never completes
    Hang,
}

/// Loader that plays back outcomes in order; fails once they run out
pub struct ScriptedLoader {
    outcomes: Mutex<VecDeque<LoadOutcome>>,
    started: Mutex<Vec<Instant>>,
}

impl ScriptedLoader {
    pub fn new(outcomes: Vec<LoadOutcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            started: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.started.lock().unwrap().len()
    }

    /// Time between consecutive attempt starts
    pub fn gaps(&self) -> Vec<Duration> {
        let started = self.started.lock().unwrap();
        started.windows(2).map(|w| w[1] - w[0]).collect()
    }
}

#[async_trait]
impl ModelLoader for ScriptedLoader {
    async fn load_model(&self) -> WarmbootResult<LoadedModel> {
        self.started.lock().unwrap().push(Instant::now());
        let outcome = self.outcomes.lock().unwrap().pop_front();

        match outcome {
            Some(LoadOutcome::Ok) => Ok(LoadedModel {
                url: "http://localhost:8080/model.json".to_string(),
                format: Some("layers-model".to_string()),
                topology: serde_json::json!({"class_name": "Sequential"}),
                weights: vec![0; 16],
                shard_count: 1,
            }),
            Some(LoadOutcome::Fail(reason)) => {
                Err(WarmbootError::network("http://localhost:8080/model.json", reason))
            }
            Some(LoadOutcome::Hang) => std::future::pending::<WarmbootResult<LoadedModel>>().await,
            None => Err(WarmbootError::Internal("no scripted outcome left".to_string())),
        }
    }
}

/// Initializer that counts calls and optionally fails
#[derive(Default)]
pub struct StubInitializer {
    failure: Option<String>,
    calls: AtomicUsize,
}

impl StubInitializer {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            failure: Some(reason.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AppInitializer for StubInitializer {
    async fn initialize(&self, _model: &LoadedModel) -> WarmbootResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(reason) => Err(WarmbootError::Internal(reason.clone())),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    Status(String),
    Ready,
    Failed(String),
}

/// Status sink that keeps everything it is told
#[derive(Default)]
pub struct RecordingStatus {
    events: Mutex<Vec<StatusEvent>>,
}

impl RecordingStatus {
    pub fn events(&self) -> Vec<StatusEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl StatusSink for RecordingStatus {
    fn report_status(&self, message: &str) {
        self.events
            .lock()
            .unwrap()
            .push(StatusEvent::Status(message.to_string()));
    }

    fn show_ready(&self) {
        self.events.lock().unwrap().push(StatusEvent::Ready);
    }

    fn show_failed(&self, reason: &str) {
        self.events
            .lock()
            .unwrap()
            .push(StatusEvent::Failed(reason.to_string()));
    }
}
