//! Guardian console: entry point.
//!
//! Connects to a monitoring agent's event stream, keeps a rolling view of its
//! detections and statistics, polls the backend REST API, and lets the
//! operator send commands from standard input.
//!
//! # Usage
//!
//! ```text
//! guardian-console [OPTIONS]
//!
//! Options:
//!   --config <PATH>                  TOML config file [default: guardian-console.toml]
//!   --ws-url <URL>                   Agent event-stream URL
//!   --api-base <URL>                 Backend REST base URL
//!   --max-reconnect-attempts <N>     Reconnect attempts before giving up
//!   --retry-delay-ms <MS>            Delay between reconnect attempts
//!   --no-poll                        Disable backend polling
//! ```
//!
//! Command-line values override the config file.  Every flag can also be set
//! with an environment variable (`GUARDIAN_WS_URL`, `GUARDIAN_API_BASE`, ...).
//! `RUST_LOG` overrides the configured log level.

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use guardian_console::domain::{load_config, ConsoleConfig};
use guardian_console::infrastructure::run_console;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Guardian monitoring console.
#[derive(Debug, Parser)]
#[command(
    name = "guardian-console",
    about = "Operator console for the Guardian monitoring agent",
    version
)]
struct Cli {
    /// Path to the TOML config file.  A missing file means all defaults.
    #[arg(long, default_value = "guardian-console.toml", env = "GUARDIAN_CONFIG")]
    config: PathBuf,

    /// WebSocket URL of the agent's event stream.
    #[arg(long, env = "GUARDIAN_WS_URL")]
    ws_url: Option<String>,

    /// Base URL of the backend REST API.
    #[arg(long, env = "GUARDIAN_API_BASE")]
    api_base: Option<String>,

    /// Reconnect attempts after a lost connection before giving up.
    #[arg(long, env = "GUARDIAN_MAX_RECONNECT_ATTEMPTS")]
    max_reconnect_attempts: Option<u32>,

    /// Delay between reconnect attempts in milliseconds.
    #[arg(long, env = "GUARDIAN_RETRY_DELAY_MS")]
    retry_delay_ms: Option<u64>,

    /// Do not poll the backend for stats, agents and incidents.
    #[arg(long, env = "GUARDIAN_NO_POLL")]
    no_poll: bool,
}

impl Cli {
    /// Loads the config file and applies the command-line overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or
    /// parsed, or if a URL has the wrong scheme.
    fn into_console_config(self) -> anyhow::Result<ConsoleConfig> {
        let mut config = load_config(&self.config)
            .with_context(|| format!("failed to load config from {}", self.config.display()))?;

        if let Some(ws_url) = self.ws_url {
            config.connection.ws_url = ws_url;
        }
        if let Some(api_base) = self.api_base {
            config.backend.api_base = api_base;
        }
        if let Some(attempts) = self.max_reconnect_attempts {
            config.connection.max_reconnect_attempts = attempts;
        }
        if let Some(delay) = self.retry_delay_ms {
            config.connection.retry_delay_ms = delay;
        }
        if self.no_poll {
            config.polling.enabled = false;
        }

        let ws_url = &config.connection.ws_url;
        if !(ws_url.starts_with("ws://") || ws_url.starts_with("wss://")) {
            anyhow::bail!("invalid event-stream URL '{ws_url}': expected ws:// or wss://");
        }
        let api_base = &config.backend.api_base;
        if !(api_base.starts_with("http://") || api_base.starts_with("https://")) {
            anyhow::bail!("invalid backend URL '{api_base}': expected http:// or https://");
        }
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.into_console_config()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.console.log_level)),
        )
        .init();

    info!(
        "Guardian console starting — ws={}, api={}",
        config.connection.ws_url, config.backend.api_base
    );

    // ── Graceful shutdown flag ─────────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C — initiating graceful shutdown");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    run_console(config, running).await?;

    info!("Guardian console stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn missing_config() -> String {
        std::env::temp_dir()
            .join("guardian-console-cli-test/absent.toml")
            .display()
            .to_string()
    }

    #[test]
    fn test_cli_defaults() {
        // Arrange: parse with no arguments (all defaults apply)
        let cli = Cli::parse_from(["guardian-console"]);

        // Assert
        assert_eq!(cli.config, PathBuf::from("guardian-console.toml"));
        assert!(cli.ws_url.is_none());
        assert!(!cli.no_poll);
    }

    #[test]
    fn test_into_console_config_without_file_uses_defaults() {
        // Arrange
        let cli = Cli::parse_from(["guardian-console", "--config", &missing_config()]);

        // Act
        let config = cli.into_console_config().unwrap();

        // Assert
        assert_eq!(config, ConsoleConfig::default());
    }

    #[test]
    fn test_cli_overrides_config_values() {
        // Arrange
        let cli = Cli::parse_from([
            "guardian-console",
            "--config",
            &missing_config(),
            "--ws-url",
            "ws://10.0.0.5:8000/ws/dashboard",
            "--api-base",
            "http://10.0.0.5:8000/api",
            "--max-reconnect-attempts",
            "2",
            "--retry-delay-ms",
            "500",
            "--no-poll",
        ]);

        // Act
        let config = cli.into_console_config().unwrap();

        // Assert
        assert_eq!(config.connection.ws_url, "ws://10.0.0.5:8000/ws/dashboard");
        assert_eq!(config.backend.api_base, "http://10.0.0.5:8000/api");
        assert_eq!(config.connection.max_reconnect_attempts, 2);
        assert_eq!(config.connection.retry_delay_ms, 500);
        assert!(!config.polling.enabled);
    }

    #[test]
    fn test_into_console_config_rejects_http_event_stream_url() {
        let cli = Cli::parse_from([
            "guardian-console",
            "--config",
            &missing_config(),
            "--ws-url",
            "http://127.0.0.1:8000/ws/dashboard",
        ]);
        assert!(cli.into_console_config().is_err());
    }

    #[test]
    fn test_into_console_config_rejects_ws_backend_url() {
        let cli = Cli::parse_from([
            "guardian-console",
            "--config",
            &missing_config(),
            "--api-base",
            "ws://127.0.0.1:8000/api",
        ]);
        assert!(cli.into_console_config().is_err());
    }
}
