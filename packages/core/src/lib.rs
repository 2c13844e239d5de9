// Library root: exposes the monitor, services and API for integration tests
// in `tests/`. The production entry point remains `src/main.rs`.

pub mod api;
pub mod error;
pub mod leads;
pub mod metrics;
pub mod monitor;
pub mod scheduler;
pub mod services;
pub mod store;

// Only needed by the binary, declared pub so tests can reach them.
pub mod cli;
pub mod config;
pub mod logging;
