//! Error types for the launch sequence.

use std::{fmt, time::Duration};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LaunchError>;

/// The stage of the startup sequence an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePhase {
    Config,
    Allocation,
    Spawn,
    Readiness,
    Shell,
}

impl fmt::Display for FailurePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Config => "configuration",
            Self::Allocation => "port allocation",
            Self::Spawn => "backend spawn",
            Self::Readiness => "backend readiness",
            Self::Shell => "shell",
        };
        f.write_str(label)
    }
}

/// Terminal failures of a launch attempt.
#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// No closed, non-blacklisted port in `[start, upper_bound)`.
    #[error("No available port in range {start}..{upper_bound}{}", describe_probe_error(.last_probe_error))]
    PortExhausted {
        start: u16,
        upper_bound: u16,
        last_probe_error: Option<String>,
    },

    /// The executable is missing or could not be started.
    #[error("Failed to start backend {command}: {reason}")]
    SpawnFailure { command: String, reason: String },

    /// The backend process ended before its port opened.
    #[error("Backend process exited before port {port} became reachable: {status}")]
    BackendExited { port: u16, status: String },

    /// The backend is alive but never opened its port within the configured bounds.
    #[error(
        "Timed out waiting for backend on port {port} after {attempts} attempts ({}ms){}",
        elapsed_millis(.elapsed),
        describe_probe_error(.last_probe_error)
    )]
    ReadinessTimeout {
        port: u16,
        attempts: u32,
        elapsed: Duration,
        last_probe_error: Option<String>,
    },

    #[error("Launch sequence already started (current phase: {0})")]
    AlreadyLaunched(String),

    #[error("Illegal launch transition {from} -> {to}")]
    IllegalTransition { from: String, to: String },

    #[error("Launch cancelled during {0}")]
    Cancelled(FailurePhase),

    #[error("Failed to build backend URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LaunchError {
    pub fn phase(&self) -> FailurePhase {
        match self {
            Self::Config(_) => FailurePhase::Config,
            Self::PortExhausted { .. } => FailurePhase::Allocation,
            Self::SpawnFailure { .. } | Self::BackendExited { .. } => FailurePhase::Spawn,
            Self::ReadinessTimeout { .. } => FailurePhase::Readiness,
            Self::Cancelled(phase) => *phase,
            Self::AlreadyLaunched(_)
            | Self::IllegalTransition { .. }
            | Self::Url(_)
            | Self::Io(_) => FailurePhase::Shell,
        }
    }
}

/// One-line summary naming the failed phase, for dialogs and console output.
pub fn startup_failure_message(error: &LaunchError) -> String {
    format!("Autexys startup failed during {}: {error}", error.phase())
}

fn elapsed_millis(elapsed: &Duration) -> u128 {
    elapsed.as_millis()
}

fn describe_probe_error(last_probe_error: &Option<String>) -> String {
    match last_probe_error {
        Some(error) => format!(" (last probe error: {error})"),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_groups_exited_backend_with_spawn_failures() {
        let exited = LaunchError::BackendExited {
            port: 5050,
            status: "exit status: 1".to_string(),
        };
        let missing = LaunchError::SpawnFailure {
            command: "autexys-server".to_string(),
            reason: "not found".to_string(),
        };
        assert_eq!(exited.phase(), FailurePhase::Spawn);
        assert_eq!(missing.phase(), FailurePhase::Spawn);
    }

    #[test]
    fn readiness_timeout_is_distinct_from_spawn_failure() {
        let error = LaunchError::ReadinessTimeout {
            port: 5001,
            attempts: 3,
            elapsed: Duration::from_millis(3000),
            last_probe_error: None,
        };
        assert_eq!(error.phase(), FailurePhase::Readiness);
        assert_eq!(
            error.to_string(),
            "Timed out waiting for backend on port 5001 after 3 attempts (3000ms)"
        );
    }

    #[test]
    fn startup_failure_message_names_the_phase() {
        let error = LaunchError::SpawnFailure {
            command: "/opt/autexys/backend/autexys-server".to_string(),
            reason: "backend executable is missing".to_string(),
        };
        assert_eq!(
            startup_failure_message(&error),
            "Autexys startup failed during backend spawn: Failed to start backend \
             /opt/autexys/backend/autexys-server: backend executable is missing"
        );
    }

    #[test]
    fn port_exhausted_message_mentions_last_probe_error() {
        let error = LaunchError::PortExhausted {
            start: 5000,
            upper_bound: 5002,
            last_probe_error: Some("permission denied".to_string()),
        };
        assert_eq!(error.phase(), FailurePhase::Allocation);
        assert_eq!(
            error.to_string(),
            "No available port in range 5000..5002 (last probe error: permission denied)"
        );
    }
}
