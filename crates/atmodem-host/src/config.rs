//! Host configuration: a YAML file merged with command-line overrides.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("could not read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The config file could not be parsed.
    #[error("could not parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A required setting was supplied neither in the file nor on the
    /// command line.
    #[error("missing required setting `{0}`")]
    Missing(&'static str),
}

/// One route to register, as written in the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteSpec {
    /// HTTP method token, e.g. `GET`.
    pub method: String,
    /// Path, e.g. `/led`.
    pub path: String,
}

/// Raw contents of the config file; everything is optional so the command
/// line can fill the gaps.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub bridge: Option<String>,
    pub ssid: Option<String>,
    pub password: Option<String>,
    pub port: Option<u16>,
    #[serde(default)]
    pub routes: Vec<RouteSpec>,
}

impl FileConfig {
    /// Load and parse a YAML config file.
    pub fn load(path: &Path) -> Result<FileConfig, ConfigError> {
        Ok(serde_yaml::from_str(&fs::read_to_string(path)?)?)
    }
}

/// Fully resolved host configuration.
#[derive(Debug)]
pub struct HostConfig {
    pub bridge: String,
    pub ssid: String,
    pub password: String,
    pub port: u16,
    pub routes: Vec<RouteSpec>,
}

impl HostConfig {
    /// Merge the file with command-line overrides; the command line wins.
    pub fn merge(
        file: FileConfig,
        bridge: Option<String>,
        ssid: Option<String>,
        password: Option<String>,
        port: Option<u16>,
    ) -> Result<HostConfig, ConfigError> {
        Ok(HostConfig {
            bridge: bridge.or(file.bridge).ok_or(ConfigError::Missing("bridge"))?,
            ssid: ssid.or(file.ssid).ok_or(ConfigError::Missing("ssid"))?,
            password: password
                .or(file.password)
                .ok_or(ConfigError::Missing("password"))?,
            port: port.or(file.port).unwrap_or(80),
            routes: file.routes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
bridge: \"127.0.0.1:5331\"
ssid: lab-net
password: hunter2
port: 8080
routes:
  - method: GET
    path: /
  - method: POST
    path: /led
";

    #[test]
    fn test_parse_sample() {
        let file: FileConfig = serde_yaml::from_str(SAMPLE).unwrap();
        assert_eq!(file.bridge.as_deref(), Some("127.0.0.1:5331"));
        assert_eq!(file.port, Some(8080));
        assert_eq!(file.routes.len(), 2);
        assert_eq!(file.routes[1].path, "/led");
    }

    #[test]
    fn test_command_line_wins() {
        let file: FileConfig = serde_yaml::from_str(SAMPLE).unwrap();
        let config =
            HostConfig::merge(file, Some("10.0.0.9:7000".to_string()), None, None, None).unwrap();
        assert_eq!(config.bridge, "10.0.0.9:7000");
        assert_eq!(config.ssid, "lab-net");
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_missing_setting_reported() {
        let err = HostConfig::merge(FileConfig::default(), None, None, None, None).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("bridge")));
    }

    #[test]
    fn test_port_defaults_to_80() {
        let file: FileConfig = serde_yaml::from_str("bridge: a\nssid: b\npassword: c\n").unwrap();
        let config = HostConfig::merge(file, None, None, None, None).unwrap();
        assert_eq!(config.port, 80);
    }
}
