use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::{
    app_constants::{BACKEND_EXECUTABLE_NAME, BACKEND_RESOURCE_DIR, RUNTIME_MANIFEST_FILE},
    backend_config::BackendConfig,
    error::{LaunchError, Result},
};

/// Optional `runtime-manifest.json` shipped next to a packaged backend.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeManifest {
    pub executable: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub cmd: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub packaged_mode: bool,
}

impl LaunchPlan {
    pub fn debug_command(&self) -> String {
        let mut parts = vec![self.cmd.as_str()];
        parts.extend(self.args.iter().map(String::as_str));
        shlex::try_join(parts.iter().copied()).unwrap_or_else(|_| parts.join(" "))
    }
}

/// Adds the Windows `.exe` suffix when targeting Windows and it is not already present.
pub fn backend_executable_file_name(base: &str, windows: bool) -> String {
    if windows && !base.to_ascii_lowercase().ends_with(".exe") {
        format!("{base}.exe")
    } else {
        base.to_string()
    }
}

/// `<dir of the running executable>/backend`, used when no resource dir is known.
pub fn default_backend_dir() -> Option<PathBuf> {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(BACKEND_RESOURCE_DIR)))
}

pub fn read_runtime_manifest(backend_dir: &Path) -> Result<Option<RuntimeManifest>> {
    let manifest_path = backend_dir.join(RUNTIME_MANIFEST_FILE);
    if !manifest_path.is_file() {
        return Ok(None);
    }

    let manifest_text = fs::read_to_string(&manifest_path).map_err(|error| {
        LaunchError::Config(format!(
            "Failed to read backend manifest {}: {}",
            manifest_path.display(),
            error
        ))
    })?;
    let manifest = serde_json::from_str(&manifest_text).map_err(|error| {
        LaunchError::Config(format!(
            "Failed to parse backend manifest {}: {}",
            manifest_path.display(),
            error
        ))
    })?;
    Ok(Some(manifest))
}

/// Resolves what to run for `port`.
///
/// `AUTEXYS_BACKEND_CMD` wins; otherwise the packaged executable is looked up in
/// the configured backend dir, then `resource_backend_dir`, then next to the
/// shell binary. A missing executable is reported as a spawn failure here so no
/// readiness polling is ever started for it.
pub fn resolve_launch_plan(
    config: &BackendConfig,
    resource_backend_dir: Option<&Path>,
    port: u16,
) -> Result<LaunchPlan> {
    if let Some(pieces) = &config.command_override {
        let (cmd, rest) = pieces
            .split_first()
            .ok_or_else(|| LaunchError::Config("Backend command override is empty.".to_string()))?;
        let mut args = rest.to_vec();
        args.push(port.to_string());
        return Ok(LaunchPlan {
            cmd: cmd.clone(),
            args,
            cwd: config.cwd.clone(),
            packaged_mode: false,
        });
    }

    let backend_dir = config
        .backend_dir
        .clone()
        .or_else(|| resource_backend_dir.map(Path::to_path_buf))
        .or_else(default_backend_dir)
        .ok_or_else(|| LaunchError::SpawnFailure {
            command: BACKEND_EXECUTABLE_NAME.to_string(),
            reason: "cannot determine the backend directory".to_string(),
        })?;

    let executable_name = read_runtime_manifest(&backend_dir)?
        .and_then(|manifest| manifest.executable)
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| BACKEND_EXECUTABLE_NAME.to_string());
    let executable_path =
        backend_dir.join(backend_executable_file_name(&executable_name, cfg!(windows)));
    if !executable_path.is_file() {
        return Err(LaunchError::SpawnFailure {
            command: executable_path.display().to_string(),
            reason: "backend executable is missing".to_string(),
        });
    }

    Ok(LaunchPlan {
        cmd: executable_path.to_string_lossy().to_string(),
        args: vec![port.to_string()],
        cwd: Some(config.cwd.clone().unwrap_or(backend_dir)),
        packaged_mode: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_executable_file_name_only_suffixes_on_windows() {
        assert_eq!(
            backend_executable_file_name("autexys-server", true),
            "autexys-server.exe"
        );
        assert_eq!(
            backend_executable_file_name("autexys-server", false),
            "autexys-server"
        );
        assert_eq!(backend_executable_file_name("server.EXE", true), "server.EXE");
    }

    #[test]
    fn resolve_launch_plan_appends_port_to_command_override() {
        let config = BackendConfig {
            command_override: Some(vec!["python3".to_string(), "ui.py".to_string()]),
            ..BackendConfig::default()
        };
        let plan = resolve_launch_plan(&config, None, 5050).unwrap();
        assert_eq!(plan.cmd, "python3");
        assert_eq!(plan.args, vec!["ui.py".to_string(), "5050".to_string()]);
        assert!(!plan.packaged_mode);
    }

    #[test]
    fn resolve_launch_plan_reports_missing_executable_as_spawn_failure() {
        let dir = tempfile::tempdir().unwrap();
        let config = BackendConfig {
            backend_dir: Some(dir.path().to_path_buf()),
            ..BackendConfig::default()
        };
        let error = resolve_launch_plan(&config, None, 5001).unwrap_err();
        assert!(matches!(error, LaunchError::SpawnFailure { .. }), "{error:?}");
    }

    #[test]
    fn resolve_launch_plan_passes_port_as_sole_argument() {
        let dir = tempfile::tempdir().unwrap();
        let executable = dir
            .path()
            .join(backend_executable_file_name(BACKEND_EXECUTABLE_NAME, cfg!(windows)));
        fs::write(&executable, b"").unwrap();

        let config = BackendConfig {
            backend_dir: Some(dir.path().to_path_buf()),
            ..BackendConfig::default()
        };
        let plan = resolve_launch_plan(&config, None, 5001).unwrap();
        assert_eq!(plan.cmd, executable.to_string_lossy());
        assert_eq!(plan.args, vec!["5001".to_string()]);
        assert_eq!(plan.cwd.as_deref(), Some(dir.path()));
        assert!(plan.packaged_mode);
    }

    #[test]
    fn resolve_launch_plan_prefers_manifest_executable_and_resource_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(RUNTIME_MANIFEST_FILE),
            r#"{ "executable": "custom-server" }"#,
        )
        .unwrap();
        let executable = dir
            .path()
            .join(backend_executable_file_name("custom-server", cfg!(windows)));
        fs::write(&executable, b"").unwrap();

        let plan = resolve_launch_plan(&BackendConfig::default(), Some(dir.path()), 5002).unwrap();
        assert_eq!(plan.cmd, executable.to_string_lossy());
    }

    #[test]
    fn read_runtime_manifest_rejects_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(RUNTIME_MANIFEST_FILE), "{ not json").unwrap();
        assert!(matches!(
            read_runtime_manifest(dir.path()),
            Err(LaunchError::Config(_))
        ));
    }
}
