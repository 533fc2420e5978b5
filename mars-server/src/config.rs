//! Server configuration
//!
//! The HTTP bind address plus the runner settings the job pipeline is built
//! from.

use anyhow::Context;
use std::net::SocketAddr;

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server listens on
    pub bind_addr: String,

    /// Settings of the research runner
    pub runner: mars_runner::Config,
}

impl Config {
    /// Creates configuration from environment variables
    ///
    /// Environment variables:
    /// - MARS_BIND_ADDR (optional, default: 0.0.0.0:5000)
    /// - every variable read by `mars_runner::Config::from_env`
    pub fn from_env() -> anyhow::Result<Self> {
        let bind_addr =
            std::env::var("MARS_BIND_ADDR").unwrap_or_else(|_| Self::default().bind_addr);
        let runner = mars_runner::Config::from_env().context("Invalid runner configuration")?;

        Ok(Self { bind_addr, runner })
    }

    /// Validates configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        self.bind_addr
            .parse::<SocketAddr>()
            .with_context(|| format!("MARS_BIND_ADDR '{}' is not a socket address", self.bind_addr))?;
        self.runner.validate()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5000".to_string(),
            runner: mars_runner::Config::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.bind_addr, "0.0.0.0:5000");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_bind_addr() {
        let config = Config {
            bind_addr: "localhost".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
