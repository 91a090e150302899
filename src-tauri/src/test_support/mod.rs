//! Test utilities shared by the unit tests.

mod scripted_probe;

pub(crate) use scripted_probe::{ProbeStep, ScriptedProbe};
