mod error;
mod io;
mod settings;

#[cfg(test)]
mod tests;

pub use error::{ConfigError, Result};
pub use io::{load_config, save_config};
pub use settings::{MAX_STATS_TIMEOUT_MS, SessionConfig};
