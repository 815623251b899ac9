//! Command-Line Interface (CLI) argument parsing.
//!
//! This module defines the command-line arguments for the application using
//! the `clap` crate. These arguments are parsed at startup and then merged
//! with the configuration from the `alertrelay.toml` file and environment
//! variables.

use clap::Parser;
use figment::{
    value::{Dict, Map, Tag, Value},
    Error, Metadata, Profile, Provider,
};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Forwards Prometheus Alertmanager webhooks to pre-configured destinations.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Address to bind the webhook listener to.
    #[arg(long, value_name = "ADDR")]
    pub listen: Option<SocketAddr>,

    /// Logging level for the application.
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut dict = Dict::new();

        if let Some(listen) = self.listen {
            let mut server = Dict::new();
            server.insert("listen".into(), Value::from(listen.to_string()));
            dict.insert("server".into(), Value::Dict(Tag::Default, server));
        }

        if let Some(level) = &self.log_level {
            dict.insert("log_level".into(), Value::from(level.clone()));
        }

        let mut map = Map::new();
        map.insert(Profile::Default, dict);
        Ok(map)
    }
}
