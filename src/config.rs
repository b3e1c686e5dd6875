//! Configuration for the relay daemon
//!
//! Sources, in increasing precedence: built-in defaults, TOML config file,
//! `SETU_*` environment variables, command-line flags (applied by the
//! binary after loading).

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// AIS transponder endpoint (TCP stream)
    pub upstream: EndpointConfig,
    /// Aggregation service endpoint (UDP datagrams)
    pub downstream: EndpointConfig,
    pub station: StationConfig,
    pub logging: LoggingConfig,
}

/// A host/port pair
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EndpointConfig {
    pub host: String,
    pub port: u16,
}

/// Station identity, used only in notification text
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StationConfig {
    pub name: String,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` still wins
    pub level: String,
}

impl EndpointConfig {
    /// `host:port` form accepted by the socket APIs
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            upstream: EndpointConfig {
                host: "192.168.50.37".to_string(),
                port: 39150,
            },
            downstream: EndpointConfig {
                host: "5.9.207.224".to_string(),
                port: 10170,
            },
            station: StationConfig {
                name: "setu-ais".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// A missing file is not an error: defaults apply, and env/flag
    /// overrides still layer on top. A file that exists but does not
    /// parse is fatal.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Apply `SETU_*` environment variable overrides.
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(v) = env::var("SETU_UPSTREAM_HOST") {
            self.upstream.host = v;
        }
        if let Ok(v) = env::var("SETU_UPSTREAM_PORT") {
            self.upstream.port = parse_port(&v)?;
        }
        if let Ok(v) = env::var("SETU_DOWNSTREAM_HOST") {
            self.downstream.host = v;
        }
        if let Ok(v) = env::var("SETU_DOWNSTREAM_PORT") {
            self.downstream.port = parse_port(&v)?;
        }
        if let Ok(v) = env::var("SETU_STATION") {
            self.station.name = v;
        }
        if let Ok(v) = env::var("SETU_LOG_LEVEL") {
            self.logging.level = v;
        }
        Ok(())
    }

    /// Override the upstream endpoint from a `HOST:PORT` flag value.
    pub fn set_upstream(&mut self, spec: &str) -> Result<()> {
        self.upstream = parse_endpoint(spec)?;
        Ok(())
    }

    /// Override the downstream endpoint from a `HOST:PORT` flag value.
    pub fn set_downstream(&mut self, spec: &str) -> Result<()> {
        self.downstream = parse_endpoint(spec)?;
        Ok(())
    }
}

fn parse_port(s: &str) -> Result<u16> {
    s.parse()
        .map_err(|_| Error::InvalidConfig(format!("invalid port: {}", s)))
}

fn parse_endpoint(spec: &str) -> Result<EndpointConfig> {
    let (host, port) = spec
        .rsplit_once(':')
        .ok_or_else(|| Error::InvalidConfig(format!("expected HOST:PORT, got: {}", spec)))?;
    if host.is_empty() {
        return Err(Error::InvalidConfig(format!(
            "expected HOST:PORT, got: {}",
            spec
        )));
    }
    Ok(EndpointConfig {
        host: host.to_string(),
        port: parse_port(port)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.upstream.port, 39150);
        assert_eq!(config.downstream.port, 10170);
        assert_eq!(config.station.name, "setu-ais");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_toml_deserialization() {
        let toml_content = r#"
[upstream]
host = "10.0.0.5"
port = 39150

[downstream]
host = "ais.example.net"
port = 12345

[station]
name = "pi-zero-mast"

[logging]
level = "debug"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.upstream.host, "10.0.0.5");
        assert_eq!(config.downstream.addr(), "ais.example.net:12345");
        assert_eq!(config.station.name, "pi-zero-mast");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        // Sections omitted entirely fall back to built-in defaults
        let config: Config = toml::from_str(
            r#"
[upstream]
host = "172.16.0.9"
port = 4000
"#,
        )
        .unwrap();
        assert_eq!(config.upstream.addr(), "172.16.0.9:4000");
        assert_eq!(config.downstream.port, 10170);
        assert_eq!(config.station.name, "setu-ais");
    }

    #[test]
    fn test_toml_round_trip() {
        let config = Config::default();
        let toml_string = toml::to_string_pretty(&config).unwrap();
        assert!(toml_string.contains("[upstream]"));
        assert!(toml_string.contains("[downstream]"));
        assert!(toml_string.contains("port = 39150"));

        let back: Config = toml::from_str(&toml_string).unwrap();
        assert_eq!(back.upstream, config.upstream);
        assert_eq!(back.downstream, config.downstream);
    }

    #[test]
    fn test_endpoint_flag_parsing() {
        let mut config = Config::default();
        config.set_upstream("transponder.local:39150").unwrap();
        assert_eq!(config.upstream.host, "transponder.local");
        assert_eq!(config.upstream.port, 39150);

        assert!(config.set_upstream("no-port-here").is_err());
        assert!(config.set_upstream(":39150").is_err());
        assert!(config.set_downstream("host:not-a-port").is_err());
        assert!(config.set_downstream("host:99999").is_err());
    }

    #[test]
    fn test_env_overrides() {
        // set_var is unsafe in edition 2024; this test owns these names
        unsafe {
            env::set_var("SETU_UPSTREAM_HOST", "env-host");
            env::set_var("SETU_UPSTREAM_PORT", "4100");
            env::set_var("SETU_STATION", "env-station");
        }

        let mut config = Config::default();
        config.apply_env().unwrap();
        assert_eq!(config.upstream.host, "env-host");
        assert_eq!(config.upstream.port, 4100);
        assert_eq!(config.station.name, "env-station");

        unsafe {
            env::set_var("SETU_UPSTREAM_PORT", "bogus");
        }
        let mut config = Config::default();
        assert!(config.apply_env().is_err());

        unsafe {
            env::remove_var("SETU_UPSTREAM_HOST");
            env::remove_var("SETU_UPSTREAM_PORT");
            env::remove_var("SETU_STATION");
        }
    }
}
