//! Retry logic with exponential backoff and circuit breaking for LLM calls.
//!
//! This module provides resilient handling of the single LLM endpoint with:
//! - Exponential backoff: 1s, 2s, 4s... up to `max_delay`
//! - Circuit breaker pattern: 5 failures = 30s cooldown
//! - Configurable timeout: per-request and total-operation
//!
//! The orchestrator's own retry budget (§4.8 step 2: "retry up to 2 times
//! with back-off") is expressed as `RetryPolicy::max_attempts = 3` (the
//! initial attempt plus two retries).

use crate::error::{EngineError, EngineResult};
use crate::logging::{log_debug, log_error, log_warn};

use std::time::{Duration, Instant};
use tokio::time::sleep;

/// Retry policy configuration for the LLM call.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Initial delay before the first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
    /// Maximum total time across all attempts.
    pub total_timeout: Duration,
    /// Timeout for a single attempt.
    pub request_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            backoff_multiplier: 2.0,
            total_timeout: Duration::from_secs(60),
            request_timeout: Duration::from_secs(45),
        }
    }
}

/// Circuit breaker states.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Circuit breaker guarding the LLM endpoint.
#[derive(Debug)]
pub(crate) struct CircuitBreaker {
    pub(crate) state: CircuitState,
    pub(crate) failure_count: u32,
    pub(crate) last_failure_time: Option<Instant>,
    pub(crate) failure_threshold: u32,
    pub(crate) recovery_timeout: Duration,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            last_failure_time: None,
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
        }
    }
}

impl CircuitBreaker {
    pub fn should_allow_request(&mut self) -> bool {
        match self.state {
            CircuitState::Closed => true,
            CircuitState::Open => self.check_recovery_timeout(),
            CircuitState::HalfOpen => true,
        }
    }

    fn check_recovery_timeout(&mut self) -> bool {
        let Some(last_failure) = self.last_failure_time else {
            return false;
        };

        if last_failure.elapsed() >= self.recovery_timeout {
            log_debug!(
                circuit_breaker = "transitioning_to_half_open",
                recovery_timeout_seconds = self.recovery_timeout.as_secs(),
                "circuit breaker attempting recovery"
            );
            self.state = CircuitState::HalfOpen;
            true
        } else {
            false
        }
    }

    pub fn record_success(&mut self) {
        match self.state {
            CircuitState::HalfOpen => {
                log_debug!(circuit_breaker = "recovered", "circuit breaker closed again");
                self.state = CircuitState::Closed;
                self.failure_count = 0;
                self.last_failure_time = None;
            }
            CircuitState::Closed => self.failure_count = 0,
            CircuitState::Open => {
                self.failure_count = 0;
                self.last_failure_time = None;
            }
        }
    }

    pub fn record_failure(&mut self) {
        self.failure_count += 1;
        self.last_failure_time = Some(Instant::now());

        if self.failure_count >= self.failure_threshold && self.state != CircuitState::Open {
            log_warn!(
                circuit_breaker = "opened",
                failure_count = self.failure_count,
                failure_threshold = self.failure_threshold,
                recovery_timeout_seconds = self.recovery_timeout.as_secs(),
                "circuit breaker opened after repeated LLM failures"
            );
        }
        if self.failure_count >= self.failure_threshold {
            self.state = CircuitState::Open;
        }
    }

    pub fn state(&self) -> CircuitState {
        self.state.clone()
    }
}

/// Executes an LLM call with retry, backoff and circuit breaking.
#[derive(Debug)]
pub(crate) struct RetryExecutor {
    pub(crate) policy: RetryPolicy,
    pub(crate) circuit_breaker: CircuitBreaker,
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            circuit_breaker: CircuitBreaker::default(),
        }
    }

    /// Execute `operation`, retrying on retryable errors with backoff.
    pub async fn execute<F, Fut, T>(&mut self, operation: F) -> EngineResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = EngineResult<T>>,
    {
        let start_time = Instant::now();
        let mut attempt = 0;
        let mut last_error = None;

        while attempt < self.policy.max_attempts {
            self.check_circuit_breaker()?;
            self.check_total_timeout(&start_time)?;

            attempt += 1;

            match self
                .execute_single_attempt(&operation, attempt, &mut last_error)
                .await
            {
                Ok(response) => return Ok(response),
                Err(should_continue) => {
                    if !should_continue {
                        break;
                    }
                    sleep(self.calculate_delay(attempt)).await;
                }
            }
        }

        self.handle_exhausted_retries(attempt, last_error, &start_time)
    }

    async fn execute_single_attempt<F, Fut, T>(
        &mut self,
        operation: &F,
        attempt: u32,
        last_error: &mut Option<EngineError>,
    ) -> Result<T, bool>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = EngineResult<T>>,
    {
        self.log_attempt(attempt);

        let operation_start = Instant::now();
        let result = tokio::time::timeout(self.policy.request_timeout, operation()).await;

        match result {
            Ok(Ok(response)) => {
                self.circuit_breaker.record_success();
                log_debug!(
                    attempt = attempt,
                    duration_ms = operation_start.elapsed().as_millis(),
                    "LLM call succeeded"
                );
                Ok(response)
            }
            Ok(Err(error)) => Err(self.handle_error(error, attempt, last_error)),
            Err(_timeout) => Err(self.handle_timeout(attempt, last_error)),
        }
    }

    fn check_circuit_breaker(&mut self) -> EngineResult<()> {
        if !self.circuit_breaker.should_allow_request() {
            return Err(EngineError::llm_unreachable(
                "circuit breaker open — LLM endpoint temporarily unavailable",
            ));
        }
        Ok(())
    }

    fn check_total_timeout(&mut self, start_time: &Instant) -> EngineResult<()> {
        if start_time.elapsed() >= self.policy.total_timeout {
            return Err(EngineError::llm_unreachable(format!(
                "exceeded total retry timeout of {}s",
                self.policy.total_timeout.as_secs()
            )));
        }
        Ok(())
    }

    fn log_attempt(&mut self, attempt: u32) {
        log_debug!(
            attempt = attempt,
            max_attempts = self.policy.max_attempts,
            circuit_state = ?self.circuit_breaker.state(),
            "calling LLM endpoint"
        );
    }

    fn handle_error(
        &mut self,
        error: EngineError,
        attempt: u32,
        last_error: &mut Option<EngineError>,
    ) -> bool {
        let should_retry = error.is_retryable();
        self.circuit_breaker.record_failure();
        *last_error = Some(error);

        if should_retry && attempt < self.policy.max_attempts {
            let delay = self.calculate_delay(attempt);
            log_debug!(
                attempt = attempt,
                max_attempts = self.policy.max_attempts,
                delay_ms = delay.as_millis(),
                "LLM call failed, retrying after delay"
            );
            true
        } else {
            false
        }
    }

    fn handle_timeout(&mut self, attempt: u32, last_error: &mut Option<EngineError>) -> bool {
        let timeout_error =
            EngineError::llm_unreachable(format!("no response within {}s", self.policy.request_timeout.as_secs()));
        self.circuit_breaker.record_failure();
        *last_error = Some(timeout_error);

        if attempt < self.policy.max_attempts {
            let delay = self.calculate_delay(attempt);
            log_debug!(
                attempt = attempt,
                max_attempts = self.policy.max_attempts,
                delay_ms = delay.as_millis(),
                timeout_seconds = self.policy.request_timeout.as_secs(),
                "LLM call timed out, retrying after delay"
            );
            true
        } else {
            false
        }
    }

    fn handle_exhausted_retries<T>(
        &mut self,
        attempt: u32,
        last_error: Option<EngineError>,
        start_time: &Instant,
    ) -> EngineResult<T> {
        let final_error = last_error
            .unwrap_or_else(|| EngineError::llm_unreachable("maximum retry attempts exceeded"));

        log_error!(
            attempts = attempt,
            total_duration_ms = start_time.elapsed().as_millis(),
            circuit_state = ?self.circuit_breaker.state(),
            error = %final_error,
            "LLM call failed after all retry attempts"
        );

        Err(final_error)
    }

    /// Delay before the next attempt, with jitter to avoid thundering herd.
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let delay_seconds = self.policy.initial_delay.as_secs_f64()
            * self.policy.backoff_multiplier.powi((attempt - 1) as i32);

        let delay = Duration::from_secs_f64(delay_seconds.min(self.policy.max_delay.as_secs_f64()));

        let jitter = fastrand::f64() * 0.1;
        Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter))
    }
}
