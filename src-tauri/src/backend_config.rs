use std::{collections::BTreeSet, env, path::PathBuf, time::Duration};

use crate::{
    app_constants::*,
    error::{LaunchError, Result},
    port_probe::ProbeStrategy,
};

/// Half-open scan range `[start, upper_bound)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRange {
    pub start: u16,
    pub upper_bound: u16,
}

impl PortRange {
    pub fn new(start: u16, upper_bound: u16) -> Result<Self> {
        if start >= upper_bound {
            return Err(LaunchError::Config(format!(
                "port range start {start} must be below upper bound {upper_bound}"
            )));
        }
        Ok(Self { start, upper_bound })
    }

    pub fn candidates(&self) -> std::ops::Range<u16> {
        self.start..self.upper_bound
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadinessConfig {
    pub interval: Duration,
    pub max_attempts: u32,
    pub timeout: Duration,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_READINESS_INTERVAL,
            max_attempts: DEFAULT_READINESS_MAX_ATTEMPTS,
            timeout: DEFAULT_READINESS_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendConfig {
    /// Full command from `AUTEXYS_BACKEND_CMD`; the port is appended at launch.
    pub command_override: Option<Vec<String>>,
    pub backend_dir: Option<PathBuf>,
    pub cwd: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    pub port_range: PortRange,
    pub blacklist: BTreeSet<u16>,
    pub fixed_port: Option<u16>,
    pub probe_strategy: ProbeStrategy,
    pub probe_host: String,
    pub probe_timeout: Duration,
    pub probe_error_retries: u32,
    pub readiness: ReadinessConfig,
    pub backend: BackendConfig,
    pub ui_path: String,
    pub shutdown_grace: Duration,
    pub log_file: Option<PathBuf>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            port_range: PortRange {
                start: DEFAULT_PORT_START,
                upper_bound: DEFAULT_PORT_END,
            },
            blacklist: DEFAULT_PORT_BLACKLIST.iter().copied().collect(),
            fixed_port: None,
            probe_strategy: ProbeStrategy::Connect,
            probe_host: LOOPBACK_HOST.to_string(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            probe_error_retries: DEFAULT_PROBE_ERROR_RETRIES,
            readiness: ReadinessConfig::default(),
            backend: BackendConfig::default(),
            ui_path: DEFAULT_UI_PATH.to_string(),
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            log_file: None,
        }
    }
}

impl ShellConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source; unset and blank values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();

        let start = parse_or(read(ENV_PORT_START), ENV_PORT_START, defaults.port_range.start)?;
        let upper_bound = parse_or(
            read(ENV_PORT_END),
            ENV_PORT_END,
            defaults.port_range.upper_bound,
        )?;
        let port_range = PortRange::new(start, upper_bound)?;

        // Set-but-blank clears the blacklist; only an unset variable keeps the default.
        let blacklist = match lookup(ENV_PORT_BLACKLIST) {
            Some(raw) => parse_port_list(&raw)?,
            None => defaults.blacklist,
        };

        let fixed_port = read(ENV_BACKEND_PORT)
            .map(|raw| parse_value::<u16>(&raw, ENV_BACKEND_PORT))
            .transpose()?;
        if fixed_port == Some(0) {
            return Err(LaunchError::Config(format!(
                "{ENV_BACKEND_PORT} must be a non-zero port"
            )));
        }

        let probe_strategy = match read(ENV_PORT_PROBE) {
            Some(raw) => raw.parse::<ProbeStrategy>().map_err(LaunchError::Config)?,
            None => defaults.probe_strategy,
        };

        let readiness = ReadinessConfig {
            interval: parse_millis_or(
                read(ENV_READINESS_INTERVAL_MS),
                ENV_READINESS_INTERVAL_MS,
                defaults.readiness.interval,
            )?,
            max_attempts: parse_or(
                read(ENV_READINESS_MAX_ATTEMPTS),
                ENV_READINESS_MAX_ATTEMPTS,
                defaults.readiness.max_attempts,
            )?,
            timeout: parse_millis_or(
                read(ENV_READINESS_TIMEOUT_MS),
                ENV_READINESS_TIMEOUT_MS,
                defaults.readiness.timeout,
            )?,
        };
        if readiness.interval.is_zero() || readiness.max_attempts == 0 || readiness.timeout.is_zero()
        {
            return Err(LaunchError::Config(
                "readiness interval, attempts and timeout must all be positive".to_string(),
            ));
        }

        let command_override = match read(ENV_BACKEND_CMD) {
            Some(raw) => {
                let pieces = shlex::split(&raw)
                    .ok_or_else(|| LaunchError::Config(format!("Invalid {ENV_BACKEND_CMD}: {raw}")))?;
                if pieces.is_empty() {
                    return Err(LaunchError::Config(format!("{ENV_BACKEND_CMD} is empty.")));
                }
                Some(pieces)
            }
            None => None,
        };

        Ok(Self {
            port_range,
            blacklist,
            fixed_port,
            probe_strategy,
            probe_host: defaults.probe_host,
            probe_timeout: parse_millis_or(
                read(ENV_PROBE_TIMEOUT_MS),
                ENV_PROBE_TIMEOUT_MS,
                defaults.probe_timeout,
            )?,
            probe_error_retries: parse_or(
                read(ENV_PROBE_ERROR_RETRIES),
                ENV_PROBE_ERROR_RETRIES,
                defaults.probe_error_retries,
            )?,
            readiness,
            backend: BackendConfig {
                command_override,
                backend_dir: read(ENV_BACKEND_DIR).map(|raw| expand_home(&raw)),
                cwd: read(ENV_BACKEND_CWD).map(|raw| expand_home(&raw)),
            },
            ui_path: normalize_ui_path(read(ENV_UI_PATH).as_deref().unwrap_or(DEFAULT_UI_PATH)),
            shutdown_grace: parse_millis_or(
                read(ENV_SHUTDOWN_GRACE_MS),
                ENV_SHUTDOWN_GRACE_MS,
                defaults.shutdown_grace,
            )?,
            log_file: read(ENV_LOG_FILE).map(|raw| expand_home(&raw)),
        })
    }
}

pub fn normalize_ui_path(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "/" {
        return DEFAULT_UI_PATH.to_string();
    }
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// Expands a leading `~` to the user's home directory.
pub fn expand_home(raw: &str) -> PathBuf {
    let rest = match raw.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with(['/', '\\']) => rest,
        _ => return PathBuf::from(raw),
    };
    match home::home_dir() {
        Some(home) => home.join(rest.trim_start_matches(['/', '\\'])),
        None => PathBuf::from(raw),
    }
}

fn parse_value<T: std::str::FromStr>(raw: &str, key: &str) -> Result<T> {
    raw.parse::<T>()
        .map_err(|_| LaunchError::Config(format!("{key} has an invalid value: {raw}")))
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, key: &str, default: T) -> Result<T> {
    match raw {
        Some(raw) => parse_value(&raw, key),
        None => Ok(default),
    }
}

fn parse_millis_or(raw: Option<String>, key: &str, default: Duration) -> Result<Duration> {
    match raw {
        Some(raw) => parse_value::<u64>(&raw, key).map(Duration::from_millis),
        None => Ok(default),
    }
}

fn parse_port_list(raw: &str) -> Result<BTreeSet<u16>> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|piece| !piece.is_empty())
        .map(|piece| parse_value::<u16>(piece, ENV_PORT_BLACKLIST))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<ShellConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        ShellConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn from_lookup_without_variables_matches_defaults() {
        let config = config_from(&[]).expect("defaults should be valid");
        assert_eq!(config, ShellConfig::default());
        assert_eq!(config.port_range.candidates(), 5000..5100);
        assert!(config.blacklist.contains(&5000));
        assert_eq!(config.readiness.interval, Duration::from_secs(1));
    }

    #[test]
    fn from_lookup_reads_range_blacklist_and_probe_strategy() {
        let config = config_from(&[
            (ENV_PORT_START, "6000"),
            (ENV_PORT_END, "6010"),
            (ENV_PORT_BLACKLIST, "6000, 6002 6004"),
            (ENV_PORT_PROBE, "bind"),
        ])
        .expect("config should parse");

        assert_eq!(config.port_range, PortRange::new(6000, 6010).unwrap());
        assert_eq!(config.blacklist, BTreeSet::from([6000, 6002, 6004]));
        assert_eq!(config.probe_strategy, ProbeStrategy::Bind);
    }

    #[test]
    fn from_lookup_treats_blank_blacklist_as_empty() {
        let config = config_from(&[(ENV_PORT_BLACKLIST, "  ")]).expect("config should parse");
        assert!(config.blacklist.is_empty());

        let config = config_from(&[]).expect("config should parse");
        assert_eq!(config.blacklist, BTreeSet::from([5000]));
    }

    #[test]
    fn from_lookup_splits_backend_command_with_shell_words() {
        let config = config_from(&[(ENV_BACKEND_CMD, "python3 \"my server.py\" --quiet")])
            .expect("config should parse");
        assert_eq!(
            config.backend.command_override,
            Some(vec![
                "python3".to_string(),
                "my server.py".to_string(),
                "--quiet".to_string(),
            ])
        );
    }

    #[test]
    fn from_lookup_rejects_inverted_range() {
        let error = config_from(&[(ENV_PORT_START, "5100"), (ENV_PORT_END, "5000")])
            .expect_err("inverted range must fail");
        assert!(matches!(error, LaunchError::Config(_)));
    }

    #[test]
    fn from_lookup_names_the_malformed_variable() {
        let error = config_from(&[(ENV_READINESS_INTERVAL_MS, "soon")])
            .expect_err("non-numeric interval must fail");
        assert!(error.to_string().contains(ENV_READINESS_INTERVAL_MS));
    }

    #[test]
    fn from_lookup_rejects_zero_attempt_bound() {
        assert!(config_from(&[(ENV_READINESS_MAX_ATTEMPTS, "0")]).is_err());
        assert!(config_from(&[(ENV_BACKEND_PORT, "0")]).is_err());
    }

    #[test]
    fn expand_home_only_touches_a_leading_tilde() {
        assert_eq!(expand_home("/var/log/autexys.log"), PathBuf::from("/var/log/autexys.log"));
        assert_eq!(expand_home("~backup/x"), PathBuf::from("~backup/x"));
        if let Some(home) = home::home_dir() {
            assert_eq!(expand_home("~/logs/desktop.log"), home.join("logs/desktop.log"));
            assert_eq!(expand_home("~"), home);
        }
    }

    #[test]
    fn normalize_ui_path_adds_leading_slash_and_defaults_blank() {
        assert_eq!(normalize_ui_path("ui/index.html"), "/ui/index.html");
        assert_eq!(normalize_ui_path("  "), DEFAULT_UI_PATH);
        assert_eq!(normalize_ui_path("/dashboard"), "/dashboard");
    }
}
