use std::time::Duration;

pub const LOOPBACK_HOST: &str = "127.0.0.1";
pub const DEFAULT_UI_PATH: &str = "/ui/index.html";

pub const DEFAULT_PORT_START: u16 = 5000;
pub const DEFAULT_PORT_END: u16 = 5100;
pub const DEFAULT_PORT_BLACKLIST: &[u16] = &[5000];

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(400);
pub const DEFAULT_PROBE_ERROR_RETRIES: u32 = 3;
pub const PROBE_ERROR_RETRY_DELAY: Duration = Duration::from_millis(50);

pub const DEFAULT_READINESS_INTERVAL: Duration = Duration::from_millis(1000);
pub const DEFAULT_READINESS_MAX_ATTEMPTS: u32 = 120;
pub const DEFAULT_READINESS_TIMEOUT: Duration = Duration::from_secs(120);

pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_millis(3000);

pub const BACKEND_EXECUTABLE_NAME: &str = "autexys-server";
pub const BACKEND_RESOURCE_DIR: &str = "backend";
pub const RUNTIME_MANIFEST_FILE: &str = "runtime-manifest.json";
pub const BACKEND_LOG_TARGET: &str = "backend";
pub const BACKEND_LOG_PREFIX: &str = "[BACKEND]";

pub const ENV_PORT_START: &str = "AUTEXYS_PORT_START";
pub const ENV_PORT_END: &str = "AUTEXYS_PORT_END";
pub const ENV_PORT_BLACKLIST: &str = "AUTEXYS_PORT_BLACKLIST";
pub const ENV_BACKEND_PORT: &str = "AUTEXYS_BACKEND_PORT";
pub const ENV_PORT_PROBE: &str = "AUTEXYS_PORT_PROBE";
pub const ENV_PROBE_TIMEOUT_MS: &str = "AUTEXYS_PROBE_TIMEOUT_MS";
pub const ENV_PROBE_ERROR_RETRIES: &str = "AUTEXYS_PROBE_ERROR_RETRIES";
pub const ENV_READINESS_INTERVAL_MS: &str = "AUTEXYS_READINESS_INTERVAL_MS";
pub const ENV_READINESS_MAX_ATTEMPTS: &str = "AUTEXYS_READINESS_MAX_ATTEMPTS";
pub const ENV_READINESS_TIMEOUT_MS: &str = "AUTEXYS_READINESS_TIMEOUT_MS";
pub const ENV_BACKEND_CMD: &str = "AUTEXYS_BACKEND_CMD";
pub const ENV_BACKEND_DIR: &str = "AUTEXYS_BACKEND_DIR";
pub const ENV_BACKEND_CWD: &str = "AUTEXYS_BACKEND_CWD";
pub const ENV_UI_PATH: &str = "AUTEXYS_UI_PATH";
pub const ENV_SHUTDOWN_GRACE_MS: &str = "AUTEXYS_SHUTDOWN_GRACE_MS";
pub const ENV_LOG_FILE: &str = "AUTEXYS_LOG_FILE";
