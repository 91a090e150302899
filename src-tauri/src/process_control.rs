use std::{io, process::ExitStatus, time::Duration};

use log::{debug, info, warn};
use tokio::process::Child;

/// Whether the backend is still running, as seen by the readiness poller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Liveness {
    Running,
    Exited(String),
}

pub trait BackendLiveness {
    fn liveness(&mut self) -> io::Result<Liveness>;
}

/// Handle to the spawned backend. The child leads its own process group, so
/// teardown can reach every descendant it started.
#[derive(Debug)]
pub struct BackendProcess {
    child: Child,
    pid: Option<u32>,
    port: u16,
    command: String,
}

impl BackendProcess {
    pub(crate) fn new(child: Child, port: u16, command: String) -> Self {
        let pid = child.id();
        Self {
            child,
            pid,
            port,
            command,
        }
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn is_alive(&mut self) -> bool {
        matches!(self.liveness(), Ok(Liveness::Running))
    }

    /// Terminates the whole process group: a polite signal first, then a forced
    /// kill once `grace` has elapsed. Always reaps the direct child.
    pub async fn terminate(&mut self, grace: Duration) -> io::Result<()> {
        let Some(pid) = self.pid else {
            debug!("backend process has no pid; nothing to terminate");
            return Ok(());
        };

        info!("terminating backend process group {pid} ({})", self.command);
        terminate_process_group(pid, &mut self.child, grace).await
    }
}

impl BackendLiveness for BackendProcess {
    fn liveness(&mut self) -> io::Result<Liveness> {
        Ok(match self.child.try_wait()? {
            Some(status) => Liveness::Exited(describe_exit_status(status)),
            None => Liveness::Running,
        })
    }
}

fn describe_exit_status(status: ExitStatus) -> String {
    status.to_string()
}

#[cfg(unix)]
async fn terminate_process_group(pid: u32, child: &mut Child, grace: Duration) -> io::Result<()> {
    use nix::{
        errno::Errno,
        sys::signal::{killpg, Signal},
        unistd::Pid,
    };

    let group = Pid::from_raw(pid as i32);
    let signal_group = |signal: Signal| match killpg(group, signal) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(errno) => Err(io::Error::from(errno)),
    };

    signal_group(Signal::SIGTERM)?;
    match tokio::time::timeout(grace, child.wait()).await {
        Ok(Ok(status)) => debug!("backend process {pid} exited after SIGTERM: {status}"),
        Ok(Err(error)) => warn!("failed to wait for backend process {pid}: {error}"),
        Err(_) => warn!(
            "backend process {pid} still running {}ms after SIGTERM; sending SIGKILL",
            grace.as_millis()
        ),
    }

    // Descendants may outlive the leader or ignore SIGTERM.
    signal_group(Signal::SIGKILL)?;
    child.wait().await?;
    Ok(())
}

#[cfg(windows)]
async fn terminate_process_group(pid: u32, child: &mut Child, grace: Duration) -> io::Result<()> {
    use std::process::Stdio;
    use tokio::process::Command;

    let status = Command::new("taskkill")
        .args(["/pid", &pid.to_string(), "/t", "/f"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .stdin(Stdio::null())
        .status()
        .await;
    if let Err(error) = status {
        warn!("taskkill failed for backend process {pid}: {error}");
        child.start_kill()?;
    }

    if tokio::time::timeout(grace, child.wait()).await.is_err() {
        child.kill().await?;
    }
    Ok(())
}
