//! Domain layer: console configuration (no I/O beyond reading the file).

pub mod config;

pub use config::{load_config, save_config, ConfigError, ConsoleConfig};
