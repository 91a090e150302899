use log::{error, info};
use tauri::{path::BaseDirectory, webview::PageLoadEvent, Manager, RunEvent};

use autexys_desktop::{
    app_constants::BACKEND_RESOURCE_DIR, logging, startup_failure_message, LaunchContext,
    ShellConfig, ShellSession,
};

use crate::{exit_events, main_window, startup_task};

pub(crate) fn run() {
    let config = match ShellConfig::from_env() {
        Ok(config) => config,
        Err(error) => {
            logging::init_logging(None);
            error!("{}", startup_failure_message(&error));
            std::process::exit(1);
        }
    };
    logging::init_logging(config.log_file.as_deref());
    info!("desktop process starting");

    tauri::Builder::default()
        .plugin(tauri_plugin_single_instance::init(|app_handle, _argv, _cwd| {
            info!("second instance requested; focusing the existing window");
            main_window::focus_main_window(app_handle);
        }))
        .plugin(tauri_plugin_dialog::init())
        .manage(main_window::DisplayState::default())
        .on_page_load(|_webview, payload| match payload.event() {
            PageLoadEvent::Started => info!("page-load started: {}", payload.url()),
            PageLoadEvent::Finished => info!("page-load finished: {}", payload.url()),
        })
        .setup(move |app| {
            let resource_backend_dir = match app
                .path()
                .resolve(BACKEND_RESOURCE_DIR, BaseDirectory::Resource)
            {
                Ok(dir) => Some(dir),
                Err(error) => {
                    info!("no bundled backend resource directory: {error}");
                    None
                }
            };

            let (allocation_probe, readiness_probe) = autexys_desktop::probes_for(&config);
            let context = LaunchContext::new(config).with_resource_backend_dir(resource_backend_dir);
            app.manage(ShellSession::new(context));

            startup_task::spawn_startup_task(
                app.handle().clone(),
                allocation_probe,
                readiness_probe,
            );
            Ok(())
        })
        .build(tauri::generate_context!())
        .expect("error while building tauri application")
        .run(|app_handle, event| match event {
            RunEvent::ExitRequested { .. } | RunEvent::Exit => {
                exit_events::handle_exit(app_handle);
            }
            _ => {}
        });
}
