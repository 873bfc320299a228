//! Multi-plane ROI model, plane-set editing and per-channel statistics for
//! microscopy images.

pub mod cli;
pub mod config;
pub mod events;
pub mod index;
pub mod model;
pub mod persistence;
pub mod planes;
pub mod sampling;
pub mod session;
pub mod stats;

pub fn run_cli() -> Result<(), String> {
    cli::run_cli()
}

/// Installs a stderr subscriber filtered by `RUST_LOG`, `info` by default.
pub fn init_logging() -> Result<(), String> {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init()
        .map_err(|error| error.to_string())
}
