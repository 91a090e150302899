use log::{error, info};
use tauri::{AppHandle, Manager};
use tauri_plugin_dialog::{DialogExt, MessageDialogKind};

use autexys_desktop::{
    startup_failure_message, ConfiguredProbe, ConnectProbe, LaunchError, ShellSession,
};

use crate::main_window;

pub(crate) fn spawn_startup_task(
    app_handle: AppHandle,
    allocation_probe: ConfiguredProbe,
    readiness_probe: ConnectProbe,
) {
    tauri::async_runtime::spawn(async move {
        let session = app_handle.state::<ShellSession>();
        match session.launch(&allocation_probe, &readiness_probe).await {
            Ok(event) => {
                info!(
                    "backend ready on port {} after {} probe(s)",
                    event.port, event.attempts
                );
                if let Err(error) = main_window::show_backend_ui(&app_handle, &event.url) {
                    show_startup_error(&app_handle, &error);
                }
            }
            Err(LaunchError::Cancelled(phase)) => {
                info!("startup cancelled during {phase}");
            }
            Err(error) => show_startup_error(&app_handle, &startup_failure_message(&error)),
        }
    });
}

fn show_startup_error(app_handle: &AppHandle, message: &str) {
    error!("{message}");
    app_handle
        .dialog()
        .message(message)
        .title("Autexys could not start")
        .kind(MessageDialogKind::Error)
        .blocking_show();
    app_handle.exit(1);
}
