//! Browser-hosted run: start the backend, open the UI in the default browser
//! and keep the backend alive until Ctrl-C.

use log::{error, info, warn};

use autexys_desktop::{
    logging, probes_for, startup_failure_message, LaunchContext, LaunchError, ShellConfig,
    ShellSession,
};

use crate::system_browser::open_url_with_system_browser;

const EXIT_FAILURE: i32 = 1;
const EXIT_INTERRUPTED: i32 = 130;

pub(crate) fn run() -> i32 {
    let config = match ShellConfig::from_env() {
        Ok(config) => config,
        Err(error) => {
            logging::init_logging(None);
            error!("{}", startup_failure_message(&error));
            return EXIT_FAILURE;
        }
    };
    logging::init_logging(config.log_file.as_deref());

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(error) => {
            error!("failed to start async runtime: {error}");
            return EXIT_FAILURE;
        }
    };
    runtime.block_on(run_session(config))
}

async fn run_session(config: ShellConfig) -> i32 {
    let (allocation_probe, readiness_probe) = probes_for(&config);
    let session = ShellSession::new(LaunchContext::new(config));

    let launched = tokio::select! {
        result = session.launch(&allocation_probe, &readiness_probe) => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };

    let exit_code = match launched {
        None => {
            info!("interrupted before the backend became ready");
            EXIT_INTERRUPTED
        }
        Some(Err(LaunchError::Cancelled(phase))) => {
            info!("startup cancelled during {phase}");
            EXIT_INTERRUPTED
        }
        Some(Err(error)) => {
            error!("{}", startup_failure_message(&error));
            EXIT_FAILURE
        }
        Some(Ok(event)) => {
            info!("backend UI available at {}", event.url);
            if let Err(error) = open_url_with_system_browser(event.url.as_str()) {
                warn!("{error}; open {} manually", event.url);
            }
            info!("press Ctrl-C to stop the backend");
            if let Err(error) = tokio::signal::ctrl_c().await {
                warn!("failed to wait for Ctrl-C: {error}");
            }
            0
        }
    };

    if let Err(error) = session.shutdown().await {
        error!("backend did not stop cleanly: {error}");
    }
    exit_code
}
