use std::io;

use log::{info, warn};
use tokio::sync::{Mutex, Notify};

use crate::{
    error::{FailurePhase, LaunchError, Result},
    launch_sequence::{LaunchContext, LaunchPhase, ReadyEvent},
    port_probe::PortProbe,
};

/// Owns the run's [`LaunchContext`] and lets the host cancel a launch that is
/// still in flight when the user quits.
#[derive(Debug)]
pub struct ShellSession {
    context: Mutex<LaunchContext>,
    shutdown_requested: Notify,
}

impl ShellSession {
    pub fn new(context: LaunchContext) -> Self {
        Self {
            context: Mutex::new(context),
            shutdown_requested: Notify::new(),
        }
    }

    pub async fn launch<A, R>(
        &self,
        allocation_probe: &A,
        readiness_probe: &R,
    ) -> Result<ReadyEvent>
    where
        A: PortProbe,
        R: PortProbe,
    {
        let mut context = self.context.lock().await;
        if context.phase() == LaunchPhase::Stopped {
            return Err(LaunchError::Cancelled(FailurePhase::Allocation));
        }
        let outcome = tokio::select! {
            result = context.launch(allocation_probe, readiness_probe) => Some(result),
            _ = self.shutdown_requested.notified() => None,
        };

        match outcome {
            Some(result) => result,
            None => Err(LaunchError::Cancelled(context.abandon())),
        }
    }

    /// Cancels pending launch work, then terminates the backend process group.
    pub async fn shutdown(&self) -> io::Result<()> {
        self.shutdown_requested.notify_one();
        let mut context = self.context.lock().await;
        if context.phase() == LaunchPhase::Stopped {
            return Ok(());
        }

        info!("shutting down shell session");
        let result = context.shutdown().await;
        if let Err(error) = &result {
            warn!("failed to stop backend during shutdown: {error}");
        }
        result
    }

    pub async fn phase(&self) -> LaunchPhase {
        self.context.lock().await.phase()
    }

    pub async fn selected_port(&self) -> Option<u16> {
        self.context.lock().await.selected_port()
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use super::*;
    use crate::{
        backend_config::{BackendConfig, PortRange, ReadinessConfig, ShellConfig},
        test_support::ScriptedProbe,
    };

    fn session_running(command: &[&str]) -> ShellSession {
        let config = ShellConfig {
            port_range: PortRange::new(5070, 5080).unwrap(),
            readiness: ReadinessConfig {
                interval: Duration::from_millis(20),
                max_attempts: 10_000,
                timeout: Duration::from_secs(600),
            },
            backend: BackendConfig {
                command_override: Some(command.iter().map(|piece| piece.to_string()).collect()),
                ..BackendConfig::default()
            },
            shutdown_grace: Duration::from_millis(500),
            ..ShellConfig::default()
        };
        ShellSession::new(LaunchContext::new(config))
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn shutdown_cancels_pending_readiness_polling() {
        let session = Arc::new(session_running(&["sh", "-c", "sleep 30", "sh"]));
        let probe = Arc::new(ScriptedProbe::new());

        let launching = {
            let session = Arc::clone(&session);
            let probe = Arc::clone(&probe);
            tokio::spawn(async move { session.launch(probe.as_ref(), probe.as_ref()).await })
        };

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while probe.calls_for(5070) < 3 {
            assert!(tokio::time::Instant::now() < deadline, "polling never started");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        session.shutdown().await.unwrap();
        let result = launching.await.unwrap();

        assert!(matches!(
            result,
            Err(LaunchError::Cancelled(FailurePhase::Readiness))
        ));
        assert_eq!(session.phase().await, LaunchPhase::Stopped);

        let calls_after_shutdown = probe.calls().len();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(probe.calls().len(), calls_after_shutdown);
    }

    #[tokio::test]
    async fn shutdown_before_launch_leaves_nothing_running() {
        let session = session_running(&["sh", "-c", "sleep 30", "sh"]);
        session.shutdown().await.unwrap();

        for _ in 0..50 {
            let probe = ScriptedProbe::new();
            let result = session.launch(&probe, &probe).await;
            assert!(
                matches!(result, Err(LaunchError::Cancelled(FailurePhase::Allocation))),
                "{result:?}"
            );
            assert!(probe.calls().is_empty());
        }
        assert_eq!(session.selected_port().await, None);
        assert_eq!(session.phase().await, LaunchPhase::Stopped);
    }
}
