use std::time::Duration;

use log::{debug, info, warn};
use tokio::time::Instant;

use crate::{
    backend_config::{ReadinessConfig, ShellConfig},
    error::{LaunchError, Result},
    port_probe::{PortProbe, PortStatus},
    process_control::{BackendLiveness, Liveness},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessReport {
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Level-triggered poll of a port until the backend starts listening on it.
#[derive(Debug, Clone)]
pub struct ReadinessPoller {
    config: ReadinessConfig,
    probe_error_retries: u32,
}

impl ReadinessPoller {
    pub fn new(config: ReadinessConfig) -> Self {
        Self {
            config,
            probe_error_retries: 0,
        }
    }

    pub fn from_config(config: &ShellConfig) -> Self {
        Self::new(config.readiness.clone()).with_probe_error_retries(config.probe_error_retries)
    }

    pub fn with_probe_error_retries(mut self, retries: u32) -> Self {
        self.probe_error_retries = retries;
        self
    }

    /// Polls until `port` is open.
    ///
    /// Stops early with `BackendExited` as soon as `backend` is seen to have
    /// exited, and with `ReadinessTimeout` once the attempt or time bound is hit
    /// or probes keep erroring past the retry budget.
    pub async fn wait_until_ready<P, L>(
        &self,
        probe: &P,
        port: u16,
        backend: &mut L,
    ) -> Result<ReadinessReport>
    where
        P: PortProbe,
        L: BackendLiveness,
    {
        let started = Instant::now();
        let deadline = started + self.config.timeout;
        let mut attempts = 0_u32;
        let mut consecutive_errors = 0_u32;
        let mut last_probe_error: Option<String> = None;

        loop {
            if let Liveness::Exited(status) = backend.liveness()? {
                return Err(LaunchError::BackendExited { port, status });
            }

            attempts += 1;
            let outcome = match tokio::time::timeout_at(deadline, probe.probe(port)).await {
                Ok(outcome) => outcome,
                Err(_) => return Err(self.timeout(port, attempts, started, last_probe_error)),
            };
            match outcome {
                Ok(PortStatus::Open) => {
                    // Another process may hold the port once the backend has died.
                    if let Liveness::Exited(status) = backend.liveness()? {
                        return Err(LaunchError::BackendExited { port, status });
                    }
                    let report = ReadinessReport {
                        attempts,
                        elapsed: started.elapsed(),
                    };
                    info!(
                        "backend is listening on port {port} after {} attempts ({}ms)",
                        report.attempts,
                        report.elapsed.as_millis()
                    );
                    return Ok(report);
                }
                Ok(PortStatus::Closed) => {
                    consecutive_errors = 0;
                    debug!(
                        "port {port} current activity: closed (attempt {attempts}/{})",
                        self.config.max_attempts
                    );
                }
                Err(error) => {
                    consecutive_errors += 1;
                    warn!(
                        "readiness probe of port {port} failed ({consecutive_errors}/{}): {error}",
                        self.probe_error_retries + 1
                    );
                    last_probe_error = Some(error.to_string());
                    if consecutive_errors > self.probe_error_retries {
                        return Err(self.timeout(port, attempts, started, last_probe_error));
                    }
                }
            }

            let now = Instant::now();
            if attempts >= self.config.max_attempts || now >= deadline {
                return Err(self.timeout(port, attempts, started, last_probe_error));
            }
            // The last sleep is cut short so one final probe lands on the deadline.
            tokio::time::sleep_until((now + self.config.interval).min(deadline)).await;
        }
    }

    fn timeout(
        &self,
        port: u16,
        attempts: u32,
        started: Instant,
        last_probe_error: Option<String>,
    ) -> LaunchError {
        LaunchError::ReadinessTimeout {
            port,
            attempts,
            elapsed: started.elapsed(),
            last_probe_error,
        }
    }
}
