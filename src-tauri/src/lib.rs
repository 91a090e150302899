//! Startup core of the Autexys desktop shell: pick a free loopback port, run
//! the bundled server on it, wait until it listens and hand back its UI URL.

pub mod app_constants;
pub mod backend_config;
pub mod backend_launch;
pub mod backend_readiness;
pub mod error;
pub mod launch_plan;
pub mod launch_sequence;
pub mod logging;
pub mod port_allocator;
pub mod port_probe;
pub mod process_control;
pub mod shell_session;
pub mod webui_url;

#[cfg(test)]
mod test_support;

pub use backend_config::{PortRange, ReadinessConfig, ShellConfig};
pub use error::{startup_failure_message, FailurePhase, LaunchError, Result};
pub use launch_sequence::{LaunchContext, LaunchPhase, ReadyEvent};
pub use port_probe::{ConfiguredProbe, ConnectProbe, PortProbe, PortStatus, ProbeStrategy};
pub use shell_session::ShellSession;

/// The probe pair used by real runs: the configured strategy for allocation,
/// and always a connect probe for readiness.
pub fn probes_for(config: &ShellConfig) -> (ConfiguredProbe, ConnectProbe) {
    (
        ConfiguredProbe::new(config.probe_strategy, &config.probe_host, config.probe_timeout),
        ConnectProbe::new(config.probe_host.clone(), config.probe_timeout),
    )
}
