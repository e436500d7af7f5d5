use crate::constants::{
    DATA_CONNECTION_TIMEOUT, DEFAULT_DOWNLOAD_BUFFER_SIZE, DEFAULT_UPLOAD_BUFFER_SIZE,
    SHUTDOWN_GRACE,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_address: String,
    pub listen_port: u16,
    pub pasv_address: String, // Advertised in the 227 reply, also the passive bind address
    pub pasv_port_min: Option<u16>,
    pub pasv_port_max: Option<u16>,
    pub root_dir: String,
    pub data_timeout_secs: u64,
    pub shutdown_grace_secs: u64,
    pub upload_buffer_size: Option<usize>, // Optional to allow default value
    pub download_buffer_size: Option<usize>, // Optional to allow default value
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    /// Static username -> password table, read-only once the server starts.
    pub users: HashMap<String, String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: String::from("0.0.0.0"),
            listen_port: 2023,
            pasv_address: String::from("127.0.0.1"),
            pasv_port_min: None,
            pasv_port_max: None,
            root_dir: String::from("./ftp-root"),
            data_timeout_secs: DATA_CONNECTION_TIMEOUT.as_secs(),
            shutdown_grace_secs: SHUTDOWN_GRACE.as_secs(),
            upload_buffer_size: Some(DEFAULT_UPLOAD_BUFFER_SIZE),
            download_buffer_size: Some(DEFAULT_DOWNLOAD_BUFFER_SIZE),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut users = HashMap::new();
        users.insert(String::from("hkhan"), String::from("password"));
        Self {
            server: ServerConfig::default(),
            users,
        }
    }
}

impl Config {
    pub fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let config_str = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        let config = Self::from_toml(&config_str).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_string(),
                source,
            },
            other => other,
        })?;
        Ok(config)
    }

    pub fn from_toml(config_str: &str) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(config_str).map_err(|source| ConfigError::Parse {
            path: String::from("<inline>"),
            source,
        })?;

        // Set defaults if not specified
        if config.server.upload_buffer_size.is_none() {
            config.server.upload_buffer_size = Some(DEFAULT_UPLOAD_BUFFER_SIZE);
        }
        if config.server.download_buffer_size.is_none() {
            config.server.download_buffer_size = Some(DEFAULT_DOWNLOAD_BUFFER_SIZE);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.listen_port == 0 {
            return Err(ConfigError::Invalid("listen_port cannot be 0".into()));
        }
        if self.server.data_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "data_timeout_secs must be greater than 0".into(),
            ));
        }
        self.pasv_ip()?;
        if let (Some(min), Some(max)) = (self.server.pasv_port_min, self.server.pasv_port_max) {
            if min > max {
                return Err(ConfigError::Invalid(
                    "pasv_port_min must not exceed pasv_port_max".into(),
                ));
            }
        }
        if self.server.root_dir.trim().is_empty() {
            return Err(ConfigError::Invalid("root_dir cannot be empty".into()));
        }
        if self.users.is_empty() {
            return Err(ConfigError::Invalid("at least one user is required".into()));
        }
        Ok(())
    }

    pub fn pasv_ip(&self) -> Result<Ipv4Addr, ConfigError> {
        self.server.pasv_address.parse().map_err(|_| {
            ConfigError::Invalid(format!(
                "pasv_address {} is not an IPv4 address",
                self.server.pasv_address
            ))
        })
    }

    /// Passive port range, when both bounds are configured.
    pub fn pasv_port_range(&self) -> Option<(u16, u16)> {
        match (self.server.pasv_port_min, self.server.pasv_port_max) {
            (Some(min), Some(max)) => Some((min, max)),
            _ => None,
        }
    }

    pub fn control_socket(&self) -> String {
        format!("{}:{}", self.server.listen_address, self.server.listen_port)
    }

    pub fn root_path(&self) -> PathBuf {
        PathBuf::from(&self.server.root_dir)
    }

    pub fn data_timeout(&self) -> Duration {
        Duration::from_secs(self.server.data_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_grace_secs)
    }
}
