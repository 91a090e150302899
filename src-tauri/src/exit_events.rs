use log::warn;
use tauri::{AppHandle, Manager};

use autexys_desktop::ShellSession;

/// Stops the backend before the shell goes away. Runs for both exit events;
/// the second call finds the session already stopped.
pub(crate) fn handle_exit(app_handle: &AppHandle) {
    let Some(session) = app_handle.try_state::<ShellSession>() else {
        return;
    };

    if let Err(error) = tauri::async_runtime::block_on(session.shutdown()) {
        warn!("backend shutdown finished with an error: {error}");
    }
}
