use std::{
    collections::{HashMap, VecDeque},
    future::Future,
    io,
    sync::Mutex,
};

use crate::port_probe::{PortProbe, PortStatus};

#[derive(Debug, Clone, Copy)]
pub(crate) enum ProbeStep {
    Status(PortStatus),
    Error(io::ErrorKind),
}

/// In-memory probe driven by per-port scripts.
///
/// Each port answers from its queue of steps first, then falls back to its
/// resting status (closed unless set otherwise). Every call is recorded.
#[derive(Debug, Default)]
pub(crate) struct ScriptedProbe {
    scripts: Mutex<HashMap<u16, VecDeque<ProbeStep>>>,
    resting: Mutex<HashMap<u16, PortStatus>>,
    calls: Mutex<Vec<u16>>,
}

impl ScriptedProbe {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_open(self, ports: &[u16]) -> Self {
        {
            let mut resting = self.resting.lock().unwrap();
            for port in ports {
                resting.insert(*port, PortStatus::Open);
            }
        }
        self
    }

    pub(crate) fn with_script(self, port: u16, steps: &[ProbeStep]) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(port)
            .or_default()
            .extend(steps.iter().copied());
        self
    }

    pub(crate) fn calls(&self) -> Vec<u16> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn calls_for(&self, port: u16) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|called| **called == port)
            .count()
    }

    fn next_answer(&self, port: u16) -> io::Result<PortStatus> {
        self.calls.lock().unwrap().push(port);
        let step = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&port)
            .and_then(VecDeque::pop_front);
        match step {
            Some(ProbeStep::Status(status)) => Ok(status),
            Some(ProbeStep::Error(kind)) => Err(io::Error::from(kind)),
            None => Ok(self
                .resting
                .lock()
                .unwrap()
                .get(&port)
                .copied()
                .unwrap_or(PortStatus::Closed)),
        }
    }
}

impl PortProbe for ScriptedProbe {
    fn probe(&self, port: u16) -> impl Future<Output = io::Result<PortStatus>> + Send {
        let answer = self.next_answer(port);
        async move { answer }
    }
}
