#![cfg_attr(
    all(feature = "desktop", not(debug_assertions)),
    windows_subsystem = "windows"
)]

#[cfg(feature = "desktop")]
mod app_runtime;
#[cfg(feature = "desktop")]
mod exit_events;
#[cfg(feature = "desktop")]
mod main_window;
#[cfg(feature = "desktop")]
mod startup_task;

#[cfg(not(feature = "desktop"))]
mod headless;
#[cfg(not(feature = "desktop"))]
mod system_browser;

#[cfg(feature = "desktop")]
fn main() {
    app_runtime::run();
}

#[cfg(not(feature = "desktop"))]
fn main() {
    std::process::exit(headless::run());
}
