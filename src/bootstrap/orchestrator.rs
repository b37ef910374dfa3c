//! Model bootstrap with bounded retries

use super::collaborators::{AppInitializer, ModelLoader, StatusSink};
use super::policy::RetryPolicy;
use super::state::{BootFailure, BootState};
use crate::error::{WarmbootError, WarmbootResult};
use crate::model::LoadedModel;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Drives a model load through `Idle -> LoadingModel -> (RetryPending ->
/// LoadingModel)* -> Ready | Failed`
pub struct Bootstrapper {
    loader: Arc<dyn ModelLoader>,
    initializer: Arc<dyn AppInitializer>,
    status: Arc<dyn StatusSink>,
    policy: RetryPolicy,
    state: BootState,
    attempt: u32,
    delay: Duration,
    model: Option<Arc<LoadedModel>>,
    failure: Option<BootFailure>,
    history: Vec<BootState>,
}

impl Bootstrapper {
    pub fn new(
        loader: Arc<dyn ModelLoader>,
        initializer: Arc<dyn AppInitializer>,
        status: Arc<dyn StatusSink>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            loader,
            initializer,
            status,
            policy,
            state: BootState::Idle,
            attempt: 0,
            delay: Duration::ZERO,
            model: None,
            failure: None,
            history: vec![BootState::Idle],
        }
    }

    pub fn state(&self) -> BootState {
        self.state
    }

    /// Current attempt number, 1-based; 0 before the first start
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Last backoff waited (or being waited)
    pub fn current_delay(&self) -> Duration {
        self.delay
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn model(&self) -> Option<&Arc<LoadedModel>> {
        self.model.as_ref()
    }

    pub fn failure(&self) -> Option<&BootFailure> {
        self.failure.as_ref()
    }

    /// Every state entered since construction, in order
    pub fn history(&self) -> &[BootState] {
        &self.history
    }

    /// Run the bootstrap to a terminal state
    ///
    /// Only valid from `Idle`. Load failures are retried up to the policy's
    /// budget with exponential backoff; a failing initializer ends the run
    /// immediately.
    pub async fn start(&mut self) -> WarmbootResult<Arc<LoadedModel>> {
        if self.state != BootState::Idle {
            return Err(WarmbootError::InvalidTransition {
                action: "start",
                state: self.state.as_str(),
            });
        }

        let max_attempts = self.policy.max_attempts.max(1);
        self.attempt = 1;
        self.delay = Duration::ZERO;
        debug!(
            "Loading model with up to {} attempt(s), waits {:?}",
            max_attempts,
            self.policy.schedule()
        );

        loop {
            self.transition(BootState::LoadingModel);
            self.status.report_status(&format!(
                "Loading model (attempt {}/{})",
                self.attempt, max_attempts
            ));

            let err = match self.load_once().await {
                Ok(model) => return self.initialize(model).await,
                Err(e) => e,
            };

            warn!(
                "Model load attempt {}/{} failed: {}",
                self.attempt, max_attempts, err
            );

            if self.attempt >= max_attempts {
                return Err(self.fail(BootFailure::ModelLoad {
                    attempts: self.attempt,
                    reason: err.to_string(),
                }));
            }

            self.delay = self.policy.backoff_before(self.attempt + 1);
            self.transition(BootState::RetryPending);
            self.status.report_status(&format!(
                "Model load failed, retrying in {}",
                format_delay(self.delay)
            ));
            tokio::time::sleep(self.delay).await;
            self.attempt += 1;
        }
    }

    /// Reset a failed run so `start` can begin again from attempt 1
    pub fn retry(&mut self) -> WarmbootResult<()> {
        if self.state != BootState::Failed {
            return Err(WarmbootError::InvalidTransition {
                action: "retry",
                state: self.state.as_str(),
            });
        }

        info!("Restarting bootstrap after {} attempt(s)", self.attempt);
        self.attempt = 0;
        self.delay = Duration::ZERO;
        self.failure = None;
        self.model = None;
        self.transition(BootState::Idle);
        Ok(())
    }

    async fn load_once(&self) -> WarmbootResult<LoadedModel> {
        match self.policy.attempt_timeout {
            Some(limit) => tokio::time::timeout(limit, self.loader.load_model())
                .await
                .map_err(|_| WarmbootError::AttemptTimeout {
                    secs: limit.as_secs(),
                })?,
            None => self.loader.load_model().await,
        }
    }

    async fn initialize(&mut self, model: LoadedModel) -> WarmbootResult<Arc<LoadedModel>> {
        let model = Arc::new(model);
        self.model = Some(model.clone());
        self.transition(BootState::Ready);
        self.status.report_status("Model loaded, starting application");

        if let Err(e) = self.initializer.initialize(&model).await {
            return Err(self.fail(BootFailure::Initialization {
                reason: e.to_string(),
            }));
        }

        info!("Bootstrap ready after {} attempt(s)", self.attempt);
        self.status.show_ready();
        Ok(model)
    }

    fn fail(&mut self, failure: BootFailure) -> WarmbootError {
        self.transition(BootState::Failed);
        self.status.show_failed(failure.reason());
        let err = WarmbootError::from(&failure);
        self.failure = Some(failure);
        err
    }

    fn transition(&mut self, next: BootState) {
        debug!("Bootstrap {} -> {}", self.state, next);
        self.state = next;
        self.history.push(next);
    }
}

fn format_delay(delay: Duration) -> String {
    if delay.subsec_millis() == 0 {
        format!("{}s", delay.as_secs())
    } else {
        format!("{}ms", delay.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{LoadOutcome, RecordingStatus, ScriptedLoader, StatusEvent, StubInitializer};
    use tokio::time::Instant;

    struct Harness {
        loader: Arc<ScriptedLoader>,
        initializer: Arc<StubInitializer>,
        status: Arc<RecordingStatus>,
        boot: Bootstrapper,
    }

    fn harness(outcomes: Vec<LoadOutcome>, initializer: StubInitializer, policy: RetryPolicy) -> Harness {
        let loader = Arc::new(ScriptedLoader::new(outcomes));
        let initializer = Arc::new(initializer);
        let status = Arc::new(RecordingStatus::default());
        let boot = Bootstrapper::new(loader.clone(), initializer.clone(), status.clone(), policy);
        Harness {
            loader,
            initializer,
            status,
            boot,
        }
    }

    fn fail() -> LoadOutcome {
        LoadOutcome::Fail("connection refused".to_string())
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_three_attempts_with_doubling_backoff() {
        let mut h = harness(vec![fail(), fail(), fail()], StubInitializer::ok(), RetryPolicy::default());

        let err = h.boot.start().await.unwrap_err();

        assert!(matches!(err, WarmbootError::BootFailed { attempts: 3, .. }));
        assert_eq!(h.boot.state(), BootState::Failed);
        assert_eq!(h.boot.attempt(), 3);
        assert_eq!(h.loader.gaps(), vec![Duration::from_secs(1), Duration::from_secs(2)]);
        assert_eq!(h.initializer.calls(), 0);
        assert_eq!(
            h.boot.history(),
            &[
                BootState::Idle,
                BootState::LoadingModel,
                BootState::RetryPending,
                BootState::LoadingModel,
                BootState::RetryPending,
                BootState::LoadingModel,
                BootState::Failed,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_third_attempt() {
        let mut h = harness(
            vec![fail(), fail(), LoadOutcome::Ok],
            StubInitializer::ok(),
            RetryPolicy::default(),
        );
        let started = Instant::now();

        let model = h.boot.start().await.unwrap();

        assert_eq!(h.boot.state(), BootState::Ready);
        assert_eq!(h.boot.attempt(), 3);
        assert!(started.elapsed() >= Duration::from_secs(3));
        assert_eq!(h.boot.current_delay(), Duration::from_secs(2));
        assert_eq!(h.initializer.calls(), 1);
        assert!(h.boot.model().is_some());
        assert!(!model.weights.is_empty());
        assert!(h.status.events().contains(&StatusEvent::Ready));
    }

    #[tokio::test(start_paused = true)]
    async fn first_attempt_success_has_no_delay() {
        let mut h = harness(vec![LoadOutcome::Ok], StubInitializer::ok(), RetryPolicy::default());
        let started = Instant::now();

        h.boot.start().await.unwrap();

        assert_eq!(h.boot.attempt(), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(
            h.boot.history(),
            &[BootState::Idle, BootState::LoadingModel, BootState::Ready]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn initializer_failure_is_not_retried() {
        let mut h = harness(
            vec![LoadOutcome::Ok, LoadOutcome::Ok],
            StubInitializer::failing("canvas missing"),
            RetryPolicy::default(),
        );

        let err = h.boot.start().await.unwrap_err();

        assert!(matches!(err, WarmbootError::Initialization(_)));
        assert_eq!(h.loader.calls(), 1);
        assert_eq!(
            h.boot.history(),
            &[
                BootState::Idle,
                BootState::LoadingModel,
                BootState::Ready,
                BootState::Failed,
            ]
        );
        assert!(matches!(
            h.boot.failure(),
            Some(BootFailure::Initialization { .. })
        ));
        let events = h.status.events();
        assert!(!events.contains(&StatusEvent::Ready));
        assert!(events
            .iter()
            .any(|e| matches!(e, StatusEvent::Failed(r) if r.contains("canvas missing"))));
    }

    #[tokio::test(start_paused = true)]
    async fn retry_restarts_from_first_attempt() {
        let mut h = harness(
            vec![fail(), fail(), fail(), LoadOutcome::Ok],
            StubInitializer::ok(),
            RetryPolicy::default(),
        );

        h.boot.start().await.unwrap_err();
        h.boot.retry().unwrap();

        assert_eq!(h.boot.state(), BootState::Idle);
        assert_eq!(h.boot.attempt(), 0);
        assert!(h.boot.failure().is_none());

        h.boot.start().await.unwrap();
        assert_eq!(h.boot.state(), BootState::Ready);
        assert_eq!(h.boot.attempt(), 1);
        assert_eq!(h.loader.calls(), 4);
    }

    #[tokio::test]
    async fn start_requires_idle() {
        let mut h = harness(vec![LoadOutcome::Ok], StubInitializer::ok(), RetryPolicy::default());
        h.boot.start().await.unwrap();

        let err = h.boot.start().await.unwrap_err();
        assert!(matches!(
            err,
            WarmbootError::InvalidTransition { action: "start", state: "ready" }
        ));
    }

    #[tokio::test]
    async fn retry_requires_failed() {
        let mut h = harness(vec![], StubInitializer::ok(), RetryPolicy::default());

        let err = h.boot.retry().unwrap_err();
        assert!(matches!(
            err,
            WarmbootError::InvalidTransition { action: "retry", state: "idle" }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn hung_attempt_counts_as_failure() {
        let policy = RetryPolicy {
            attempt_timeout: Some(Duration::from_secs(5)),
            ..RetryPolicy::default()
        };
        let mut h = harness(vec![LoadOutcome::Hang, LoadOutcome::Ok], StubInitializer::ok(), policy);
        let started = Instant::now();

        h.boot.start().await.unwrap();

        assert_eq!(h.boot.attempt(), 2);
        assert!(started.elapsed() >= Duration::from_secs(6));
        assert!(h.status
            .events()
            .iter()
            .any(|e| matches!(e, StatusEvent::Status(m) if m.contains("retrying in 1s"))));
    }

    #[tokio::test(start_paused = true)]
    async fn status_reports_each_attempt() {
        let mut h = harness(vec![fail(), LoadOutcome::Ok], StubInitializer::ok(), RetryPolicy::default());

        h.boot.start().await.unwrap();

        let events = h.status.events();
        assert_eq!(
            events.first(),
            Some(&StatusEvent::Status("Loading model (attempt 1/3)".to_string()))
        );
        assert!(events.contains(&StatusEvent::Status("Loading model (attempt 2/3)".to_string())));
        assert_eq!(events.last(), Some(&StatusEvent::Ready));
    }

    #[test]
    fn delay_formatting() {
        assert_eq!(format_delay(Duration::from_secs(2)), "2s");
        assert_eq!(format_delay(Duration::from_millis(250)), "250ms");
    }
}
