//! The startup state machine: scan for a port, spawn the backend on it, wait
//! for it to listen, then hand back the URL to display.

use std::{fmt, io, path::PathBuf};

use log::{error, info, warn};
use url::Url;

use crate::{
    backend_config::ShellConfig,
    backend_launch::spawn_backend,
    backend_readiness::ReadinessPoller,
    error::{FailurePhase, LaunchError, Result},
    launch_plan::resolve_launch_plan,
    port_allocator::PortAllocator,
    port_probe::PortProbe,
    process_control::BackendProcess,
    webui_url::backend_ui_url,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchPhase {
    Idle,
    Scanning,
    Spawning,
    Polling,
    Ready,
    Failed,
    Stopped,
}

impl LaunchPhase {
    pub fn can_transition_to(self, next: LaunchPhase) -> bool {
        use LaunchPhase::*;
        matches!(
            (self, next),
            (Idle, Scanning)
                | (Scanning, Spawning)
                | (Spawning, Polling)
                | (Polling, Ready)
                | (Scanning | Spawning | Polling, Failed)
                | (_, Stopped)
        )
    }

    pub fn is_active(self) -> bool {
        matches!(self, Self::Scanning | Self::Spawning | Self::Polling)
    }

    /// Which failure phase an interruption in this state belongs to.
    pub fn failure_phase(self) -> FailurePhase {
        match self {
            Self::Idle | Self::Scanning => FailurePhase::Allocation,
            Self::Spawning => FailurePhase::Spawn,
            Self::Polling => FailurePhase::Readiness,
            Self::Ready | Self::Failed | Self::Stopped => FailurePhase::Shell,
        }
    }
}

impl fmt::Display for LaunchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Emitted exactly once per run, when the backend is reachable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyEvent {
    pub port: u16,
    pub url: Url,
    pub attempts: u32,
}

/// Everything one application run owns: its config, the selected port and the
/// backend process. Built once per run and torn down with [`LaunchContext::shutdown`].
#[derive(Debug)]
pub struct LaunchContext {
    config: ShellConfig,
    resource_backend_dir: Option<PathBuf>,
    phase: LaunchPhase,
    selected_port: Option<u16>,
    backend: Option<BackendProcess>,
}

impl LaunchContext {
    pub fn new(config: ShellConfig) -> Self {
        Self {
            config,
            resource_backend_dir: None,
            phase: LaunchPhase::Idle,
            selected_port: None,
            backend: None,
        }
    }

    /// Directory holding the packaged backend, when the host knows one.
    pub fn with_resource_backend_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.resource_backend_dir = dir;
        self
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    pub fn phase(&self) -> LaunchPhase {
        self.phase
    }

    pub fn selected_port(&self) -> Option<u16> {
        self.selected_port
    }

    pub fn backend_pid(&self) -> Option<u32> {
        self.backend.as_ref().and_then(BackendProcess::pid)
    }

    /// Runs the whole sequence. Only the first call can succeed.
    ///
    /// On failure the backend (if one was spawned) is terminated before the
    /// error is returned.
    pub async fn launch<A, R>(
        &mut self,
        allocation_probe: &A,
        readiness_probe: &R,
    ) -> Result<ReadyEvent>
    where
        A: PortProbe,
        R: PortProbe,
    {
        match self.phase {
            LaunchPhase::Idle => {}
            LaunchPhase::Stopped => {
                info!("launch requested after shutdown; nothing to start");
                return Err(LaunchError::Cancelled(FailurePhase::Allocation));
            }
            phase => return Err(LaunchError::AlreadyLaunched(phase.to_string())),
        }

        match self.run_sequence(allocation_probe, readiness_probe).await {
            Ok(event) => {
                info!("backend ready at {}", event.url);
                Ok(event)
            }
            Err(launch_error) => {
                error!("startup failed during {}: {launch_error}", launch_error.phase());
                if self.phase.is_active() {
                    self.transition(LaunchPhase::Failed).ok();
                }
                if let Err(stop_error) = self.stop_backend().await {
                    warn!("failed to stop backend after startup failure: {stop_error}");
                }
                Err(launch_error)
            }
        }
    }

    async fn run_sequence<A, R>(
        &mut self,
        allocation_probe: &A,
        readiness_probe: &R,
    ) -> Result<ReadyEvent>
    where
        A: PortProbe,
        R: PortProbe,
    {
        self.transition(LaunchPhase::Scanning)?;
        let allocator = PortAllocator::from_config(&self.config);
        let port = match self.config.fixed_port {
            Some(port) => allocator.claim(allocation_probe, port).await?,
            None => allocator.allocate(allocation_probe).await?,
        };
        self.selected_port = Some(port);

        self.transition(LaunchPhase::Spawning)?;
        let plan = resolve_launch_plan(
            &self.config.backend,
            self.resource_backend_dir.as_deref(),
            port,
        )?;
        let spawned = spawn_backend(&plan, port)?;

        self.transition(LaunchPhase::Polling)?;
        let backend = self.backend.insert(spawned);
        let report = ReadinessPoller::from_config(&self.config)
            .wait_until_ready(readiness_probe, port, backend)
            .await?;

        let url = backend_ui_url(&self.config.probe_host, port, &self.config.ui_path)?;
        self.transition(LaunchPhase::Ready)?;
        Ok(ReadyEvent {
            port,
            url,
            attempts: report.attempts,
        })
    }

    /// Records that in-flight work was abandoned; the backend stays owned here
    /// until [`LaunchContext::shutdown`].
    pub fn abandon(&mut self) -> FailurePhase {
        let phase = self.phase.failure_phase();
        if self.phase.is_active() {
            warn!("startup abandoned during {phase}");
            self.transition(LaunchPhase::Failed).ok();
        }
        phase
    }

    /// Terminates the backend's process group, if any, and ends the run.
    pub async fn shutdown(&mut self) -> io::Result<()> {
        let result = self.stop_backend().await;
        if self.phase != LaunchPhase::Stopped {
            self.transition(LaunchPhase::Stopped).ok();
        }
        result
    }

    async fn stop_backend(&mut self) -> io::Result<()> {
        match self.backend.take() {
            Some(mut backend) => backend.terminate(self.config.shutdown_grace).await,
            None => Ok(()),
        }
    }

    /// Moves to `next` if the transition table allows it; otherwise the phase
    /// is left untouched.
    fn transition(&mut self, next: LaunchPhase) -> Result<()> {
        if !self.phase.can_transition_to(next) {
            error!("rejected illegal launch transition {} -> {next}", self.phase);
            return Err(LaunchError::IllegalTransition {
                from: self.phase.to_string(),
                to: next.to_string(),
            });
        }
        info!("launch phase {} -> {next}", self.phase);
        self.phase = next;
        Ok(())
    }
}
