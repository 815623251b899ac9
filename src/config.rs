//! Configuration management for AlertRelay
//!
//! This module defines the main `Config` struct and its sub-structs,
//! responsible for holding all application settings. It uses the `figment`
//! crate to load configuration from an `alertrelay.toml` file and merge it
//! with environment variables and command-line arguments.

use crate::cli::Cli;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// The logging level for the application.
    pub log_level: String,
    /// Configuration for the inbound webhook server.
    pub server: ServerConfig,
    /// Configuration for metrics exposition.
    pub metrics: MetricsConfig,
    /// The receivers alerts can be routed to, in file order.
    #[serde(default)]
    pub receivers: Vec<ReceiverConfig>,
}

/// Configuration for the inbound webhook server.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// The address the webhook listener binds to.
    pub listen: SocketAddr,
}

/// Configuration for metrics exposition.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MetricsConfig {
    /// Whether to install the Prometheus recorder and serve `/metrics`.
    pub enabled: bool,
}

/// One configured receiver: a named delivery pipeline.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ReceiverConfig {
    /// Unique name of the receiver. This is used in the webhook URL.
    pub name: String,
    /// Handler type to use for this receiver.
    pub handler: String,
    /// Parameters to pass to the handler; shape depends on the handler type.
    #[serde(default)]
    pub params: serde_json::Value,
}

impl Config {
    /// Loads the application configuration by layering sources: defaults,
    /// file, environment, and CLI arguments. A missing file yields the
    /// defaults, which include an empty receiver list.
    pub fn load(cli: &Cli) -> Result<Self> {
        let path = cli
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from("alertrelay.toml"));

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            // Allow overriding with environment variables, e.g. ALERTRELAY_LOG_LEVEL=debug
            .merge(Env::prefixed("ALERTRELAY_"))
            .merge(cli.clone())
            .extract()?;
        Ok(config)
    }
}

// Provide a default implementation for tests and easy setup.
impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            server: ServerConfig {
                listen: SocketAddr::from(([0, 0, 0, 0], 8080)),
            },
            metrics: MetricsConfig { enabled: true },
            receivers: Vec::new(),
        }
    }
}
