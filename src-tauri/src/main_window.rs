use std::sync::Mutex;

use log::{info, warn};
use tauri::{AppHandle, Manager};
use url::Url;

use autexys_desktop::{app_constants::LOOPBACK_HOST, webui_url::is_backend_origin};

const MAIN_WINDOW_LABEL: &str = "main";

/// Backend UI address once startup has succeeded.
#[derive(Debug, Default)]
pub(crate) struct DisplayState {
    backend_url: Mutex<Option<Url>>,
}

impl DisplayState {
    fn set_backend_url(&self, url: &Url) {
        match self.backend_url.lock() {
            Ok(mut guard) => *guard = Some(url.clone()),
            Err(error) => warn!("display state lock poisoned: {error}"),
        }
    }

    fn backend_url(&self) -> Option<Url> {
        self.backend_url.lock().ok().and_then(|guard| guard.clone())
    }
}

pub(crate) fn show_backend_ui(app_handle: &AppHandle, url: &Url) -> Result<(), String> {
    app_handle.state::<DisplayState>().set_backend_url(url);
    let window = app_handle
        .get_webview_window(MAIN_WINDOW_LABEL)
        .ok_or_else(|| "Main window is unavailable after backend startup.".to_string())?;

    info!("opening backend UI at {url}");
    window
        .navigate(url.clone())
        .map_err(|error| format!("Failed to open backend UI {url}: {error}"))
}

/// Brings the window forward and puts the backend UI back if the webview has
/// wandered off it.
pub(crate) fn focus_main_window(app_handle: &AppHandle) {
    let Some(window) = app_handle.get_webview_window(MAIN_WINDOW_LABEL) else {
        warn!("focus_main_window skipped: main window not found");
        return;
    };

    if let Err(error) = window.unminimize() {
        warn!("failed to unminimize main window: {error}");
    }
    if let Err(error) = window.show() {
        warn!("failed to show main window: {error}");
    }
    if let Err(error) = window.set_focus() {
        warn!("failed to focus main window: {error}");
    }

    let Some(backend_url) = app_handle.state::<DisplayState>().backend_url() else {
        return;
    };
    let Some(port) = backend_url.port() else {
        return;
    };
    match window.url() {
        Ok(current) if is_backend_origin(&current, LOOPBACK_HOST, port) => {}
        Ok(current) => {
            info!("main window left the backend UI ({current}); reopening {backend_url}");
            if let Err(error) = window.navigate(backend_url) {
                warn!("failed to reopen backend UI: {error}");
            }
        }
        Err(error) => warn!("failed to read main window url: {error}"),
    }
}
