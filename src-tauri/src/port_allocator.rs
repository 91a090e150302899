use std::{collections::BTreeSet, io};

use log::{debug, info, warn};

use crate::{
    app_constants::PROBE_ERROR_RETRY_DELAY,
    backend_config::{PortRange, ShellConfig},
    error::{LaunchError, Result},
    port_probe::{PortProbe, PortStatus},
};

/// Picks the lowest free, non-blacklisted port in a range.
///
/// Candidates are probed strictly one after another; a port is only selected
/// once its own probe has reported it closed.
#[derive(Debug, Clone)]
pub struct PortAllocator {
    range: PortRange,
    blacklist: BTreeSet<u16>,
    probe_error_retries: u32,
}

impl PortAllocator {
    pub fn new(range: PortRange, blacklist: BTreeSet<u16>) -> Self {
        Self {
            range,
            blacklist,
            probe_error_retries: 0,
        }
    }

    pub fn from_config(config: &ShellConfig) -> Self {
        Self::new(config.port_range, config.blacklist.clone())
            .with_probe_error_retries(config.probe_error_retries)
    }

    pub fn with_probe_error_retries(mut self, retries: u32) -> Self {
        self.probe_error_retries = retries;
        self
    }

    pub fn is_blacklisted(&self, port: u16) -> bool {
        self.blacklist.contains(&port)
    }

    pub async fn allocate<P: PortProbe>(&self, probe: &P) -> Result<u16> {
        let mut last_probe_error = None;

        for candidate in self.range.candidates() {
            if self.is_blacklisted(candidate) {
                debug!("port {candidate} is blacklisted; skipping");
                continue;
            }

            match self.probe_with_retries(probe, candidate).await {
                Ok(PortStatus::Closed) => {
                    info!("selected port {candidate} for the backend");
                    return Ok(candidate);
                }
                Ok(PortStatus::Open) => {
                    debug!("port {candidate} current activity: open");
                }
                Err(error) => {
                    warn!("giving up on port {candidate} after repeated probe errors: {error}");
                    last_probe_error = Some(error.to_string());
                }
            }
        }

        Err(LaunchError::PortExhausted {
            start: self.range.start,
            upper_bound: self.range.upper_bound,
            last_probe_error,
        })
    }

    /// Verifies a caller-chosen port instead of scanning for one.
    pub async fn claim<P: PortProbe>(&self, probe: &P, port: u16) -> Result<u16> {
        if self.is_blacklisted(port) {
            return Err(LaunchError::Config(format!(
                "requested backend port {port} is blacklisted"
            )));
        }

        let exhausted = |last_probe_error| LaunchError::PortExhausted {
            start: port,
            upper_bound: port.saturating_add(1),
            last_probe_error,
        };
        match self.probe_with_retries(probe, port).await {
            Ok(PortStatus::Closed) => {
                info!("using requested port {port} for the backend");
                Ok(port)
            }
            Ok(PortStatus::Open) => Err(exhausted(Some(format!("port {port} is already in use")))),
            Err(error) => Err(exhausted(Some(error.to_string()))),
        }
    }

    async fn probe_with_retries<P: PortProbe>(&self, probe: &P, port: u16) -> io::Result<PortStatus> {
        let mut attempt = 0;
        loop {
            match probe.probe(port).await {
                Ok(status) => return Ok(status),
                Err(error) if attempt < self.probe_error_retries => {
                    attempt += 1;
                    debug!(
                        "probe of port {port} failed ({error}); retry {attempt}/{}",
                        self.probe_error_retries
                    );
                    tokio::time::sleep(PROBE_ERROR_RETRY_DELAY).await;
                }
                Err(error) => return Err(error),
            }
        }
    }
}
