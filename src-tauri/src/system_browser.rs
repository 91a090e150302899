use std::process::{Command, Stdio};

#[cfg(target_os = "macos")]
pub(crate) fn open_url_with_system_browser(url: &str) -> Result<(), String> {
    spawn_detached(Command::new("open").arg(url), "open")
}

#[cfg(target_os = "windows")]
pub(crate) fn open_url_with_system_browser(url: &str) -> Result<(), String> {
    spawn_detached(
        Command::new("rundll32").args(["url.dll,FileProtocolHandler", url]),
        "rundll32",
    )
}

#[cfg(all(unix, not(target_os = "macos")))]
pub(crate) fn open_url_with_system_browser(url: &str) -> Result<(), String> {
    spawn_detached(Command::new("xdg-open").arg(url), "xdg-open")
}

#[cfg(not(any(target_os = "macos", target_os = "windows", unix)))]
pub(crate) fn open_url_with_system_browser(_url: &str) -> Result<(), String> {
    Err("Opening a browser is not supported on this platform.".to_string())
}

#[cfg(any(target_os = "macos", target_os = "windows", unix))]
fn spawn_detached(command: &mut Command, program: &str) -> Result<(), String> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(|_| ())
        .map_err(|error| format!("Failed to run '{program}': {error}"))
}
