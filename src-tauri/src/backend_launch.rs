use std::process::Stdio;

use log::{info, warn};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

use crate::{
    app_constants::{BACKEND_LOG_PREFIX, BACKEND_LOG_TARGET},
    error::{LaunchError, Result},
    launch_plan::LaunchPlan,
    process_control::BackendProcess,
};

#[cfg(windows)]
const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendStream {
    Stdout,
    Stderr,
}

/// Spawns the backend described by `plan` and returns without waiting for it.
///
/// Must be called from within a tokio runtime: the stdout/stderr forwarders run
/// as tasks on it for as long as the backend keeps its pipes open.
pub fn spawn_backend(plan: &LaunchPlan, port: u16) -> Result<BackendProcess> {
    let debug_command = plan.debug_command();

    let mut command = std::process::Command::new(&plan.cmd);
    command
        .args(&plan.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .env("PYTHONUNBUFFERED", "1");
    if let Some(cwd) = &plan.cwd {
        command.current_dir(cwd);
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }
    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        command.creation_flags(CREATE_NEW_PROCESS_GROUP | CREATE_NO_WINDOW);
    }

    let mut command = tokio::process::Command::from(command);
    command.kill_on_drop(true);
    let mut child = command.spawn().map_err(|error| LaunchError::SpawnFailure {
        command: debug_command.clone(),
        reason: error.to_string(),
    })?;

    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(forward_backend_output(stdout, BackendStream::Stdout));
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(forward_backend_output(stderr, BackendStream::Stderr));
    }

    let process = BackendProcess::new(child, port, debug_command);
    info!(
        "spawned backend pid={} on port {port}: {}",
        process
            .pid()
            .map(|pid| pid.to_string())
            .unwrap_or_else(|| "?".to_string()),
        process.command()
    );
    Ok(process)
}

/// Relays every line the backend writes into the shell log. Returns the number
/// of lines relayed once the stream closes.
pub async fn forward_backend_output<R>(reader: R, stream: BackendStream) -> usize
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buffer = Vec::new();
    let mut forwarded = 0;

    loop {
        buffer.clear();
        match reader.read_until(b'\n', &mut buffer).await {
            Ok(0) => break,
            Ok(_) => {
                let line = format_backend_line(&buffer);
                match stream {
                    BackendStream::Stdout => info!(target: BACKEND_LOG_TARGET, "{line}"),
                    BackendStream::Stderr => warn!(target: BACKEND_LOG_TARGET, "{line}"),
                }
                forwarded += 1;
            }
            Err(error) => {
                warn!("stopped reading backend {stream:?}: {error}");
                break;
            }
        }
    }
    forwarded
}

pub(crate) fn format_backend_line(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    format!("{BACKEND_LOG_PREFIX} {}", text.trim_end_matches(['\r', '\n']))
}
