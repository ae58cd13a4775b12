// src/pipeline/supervisor.rs

//! Failure supervisor around the cycle scheduler.
//!
//! ## State machine
//!
//! ```text
//! Uninitialized --init ok--> Ready --cycle ok--> Ready (sleep poll interval)
//!       ^                      |
//!       |                 cycle failed
//!       |                      v
//!       +---backoff sleep--- Retrying --failures >= threshold--> Fatal
//! ```
//!
//! Initialization failures go through `Retrying` too. The failure counter
//! resets only after a full successful cycle.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::watch;

use crate::error::{AppError, Disposition, Result};
use crate::models::{ScheduleConfig, SupervisorConfig};
use crate::pipeline::{Clock, Monitor};
use crate::services::Acquisition;

/// Supervisor lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    /// Resource not acquired
    Uninitialized,
    /// Resource acquired, cycles running
    Ready,
    /// Resource released, waiting out a backoff
    Retrying,
    /// Threshold reached, supervisor stopped for good
    Fatal,
}

/// Timing knobs for polling and retrying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub poll_min: Duration,
    pub poll_max: Duration,
    pub backoff_base: Duration,
    pub failure_threshold: u32,
}

impl RetryPolicy {
    pub fn from_config(schedule: &ScheduleConfig, supervisor: &SupervisorConfig) -> Self {
        Self {
            poll_min: Duration::from_secs(schedule.poll_min_secs),
            poll_max: Duration::from_secs(schedule.poll_max_secs),
            backoff_base: Duration::from_secs(supervisor.backoff_base_secs),
            failure_threshold: supervisor.failure_threshold,
        }
    }

    /// Linear backoff: `base * failures`.
    pub fn backoff_for(&self, failures: u32) -> Duration {
        self.backoff_base.saturating_mul(failures)
    }

    /// Uniformly random delay in `[poll_min, poll_max]`.
    pub fn next_poll_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.poll_max <= self.poll_min {
            return self.poll_min;
        }
        let secs = rng.gen_range(self.poll_min.as_secs_f64()..=self.poll_max.as_secs_f64());
        Duration::from_secs_f64(secs)
    }

    pub fn is_exhausted(&self, failures: u32) -> bool {
        failures >= self.failure_threshold
    }
}

/// Drives a monitor with a single acquisition resource, restarting the
/// resource on failure and giving up after repeated failures.
pub struct Supervisor<A: Acquisition> {
    acquisition: A,
    clock: Arc<dyn Clock>,
    policy: RetryPolicy,
    rng: StdRng,
    state: SupervisorState,
    consecutive_failures: u32,
}

impl<A: Acquisition> Supervisor<A> {
    pub fn new(acquisition: A, clock: Arc<dyn Clock>, policy: RetryPolicy) -> Self {
        Self {
            acquisition,
            clock,
            policy,
            rng: StdRng::from_entropy(),
            state: SupervisorState::Uninitialized,
            consecutive_failures: 0,
        }
    }

    /// Use a fixed seed for the poll jitter.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn acquisition(&self) -> &A {
        &self.acquisition
    }

    /// Run until `stop` turns true or the failure threshold is reached.
    ///
    /// Returns `Ok(())` on a requested stop and an error when the supervisor
    /// ends in `Fatal`. A stop is honored between cycles and interrupts any
    /// sleep.
    pub async fn run(
        &mut self,
        monitor: &mut Monitor,
        mut stop: watch::Receiver<bool>,
    ) -> Result<()> {
        log::info!(
            "Supervisor started (poll {}-{}s, backoff {}s, threshold {})",
            self.policy.poll_min.as_secs(),
            self.policy.poll_max.as_secs(),
            self.policy.backoff_base.as_secs(),
            self.policy.failure_threshold
        );

        loop {
            if *stop.borrow() {
                log::info!("Stop requested, shutting down");
                self.acquisition.release().await;
                return Ok(());
            }

            match self.state {
                SupervisorState::Uninitialized => match self.acquisition.initialize().await {
                    Ok(()) => self.transition(SupervisorState::Ready),
                    Err(e) => {
                        // Nothing to absorb before the resource exists.
                        let disposition = match e.disposition() {
                            Disposition::Absorb => Disposition::Retry,
                            other => other,
                        };
                        self.on_failure(e, disposition, monitor, &mut stop).await?;
                    }
                },
                SupervisorState::Ready => match monitor.run_cycle(&mut self.acquisition).await {
                    Ok(report) => {
                        if self.consecutive_failures > 0 {
                            log::info!(
                                "Recovered after {} consecutive failures",
                                self.consecutive_failures
                            );
                        }
                        self.consecutive_failures = 0;
                        log::info!(
                            "Cycle complete: {} offers, {} new, {} removed",
                            report.candidates,
                            report.summary.added,
                            report.summary.removed
                        );
                        self.sleep_between_cycles(&mut stop).await;
                    }
                    Err(e) => {
                        let disposition = e.disposition();
                        if disposition == Disposition::Absorb {
                            log::warn!("Cycle error absorbed: {}", e);
                            self.sleep_between_cycles(&mut stop).await;
                        } else {
                            self.on_failure(e, disposition, monitor, &mut stop).await?;
                        }
                    }
                },
                SupervisorState::Retrying => self.transition(SupervisorState::Uninitialized),
                SupervisorState::Fatal => {
                    return Err(AppError::AcquisitionFatal {
                        failures: self.consecutive_failures,
                    });
                }
            }
        }
    }

    async fn on_failure(
        &mut self,
        error: AppError,
        disposition: Disposition,
        monitor: &Monitor,
        stop: &mut watch::Receiver<bool>,
    ) -> Result<()> {
        if disposition == Disposition::Fatal {
            log::error!("Unrecoverable error: {}", error);
            self.acquisition.release().await;
            self.transition(SupervisorState::Fatal);
            return Err(error);
        }

        self.consecutive_failures += 1;
        log::error!(
            "Acquisition failure {}/{}: {}",
            self.consecutive_failures,
            self.policy.failure_threshold,
            error
        );
        self.transition(SupervisorState::Retrying);

        if let Some(capture) = self.acquisition.capture_diagnostics().await {
            monitor.save_diagnostic(&capture).await;
        }
        self.acquisition.release().await;

        if self.policy.is_exhausted(self.consecutive_failures) {
            self.transition(SupervisorState::Fatal);
            return Err(AppError::AcquisitionFatal {
                failures: self.consecutive_failures,
            });
        }

        let delay = self.policy.backoff_for(self.consecutive_failures);
        log::info!("Retrying in {}s", delay.as_secs());
        self.sleep_or_stop(delay, stop).await;
        Ok(())
    }

    async fn sleep_between_cycles(&mut self, stop: &mut watch::Receiver<bool>) {
        if *stop.borrow() {
            return;
        }
        let delay = self.policy.next_poll_delay(&mut self.rng);
        log::info!("Next check in {:.0}s", delay.as_secs_f64());
        self.sleep_or_stop(delay, stop).await;
    }

    /// Sleep for `delay`, returning early if a stop is requested.
    async fn sleep_or_stop(&self, delay: Duration, stop: &mut watch::Receiver<bool>) {
        let stopped = async {
            let requested = stop.wait_for(|stop| *stop).await.is_ok();
            if !requested {
                // Sender gone: nobody can ask us to stop any more.
                std::future::pending::<()>().await;
            }
        };

        tokio::select! {
            biased;
            _ = self.clock.sleep(delay) => {}
            _ = stopped => {}
        }
    }

    fn transition(&mut self, next: SupervisorState) {
        if self.state != next {
            log::info!("Supervisor: {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }
}
