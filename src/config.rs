//! Application configuration
//!
//! Channel definitions and service settings, loaded from TOML.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::calibration::Calibration;
use crate::constants::*;
use crate::error::{Error, Result};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceConfig,
    pub channels: Vec<ChannelConfig>,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(
            "Loaded {} channel(s) from {}",
            config.channels.len(),
            path.display()
        );
        Ok(config)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let mut config: AppConfig =
            toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;

        // Channels without their own bind address inherit the service default
        for channel in &mut config.channels {
            if channel.bind_address.is_empty() {
                channel.bind_address = config.service.default_bind_address.clone();
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Check channel definitions for problems that would only surface at runtime
    pub fn validate(&self) -> Result<()> {
        let mut ports = HashSet::new();
        for channel in &self.channels {
            channel.validate()?;
            if channel.include && channel.port != 0 && !ports.insert(channel.port) {
                return Err(Error::Config(format!(
                    "port {} is used by more than one included channel",
                    channel.port
                )));
            }
        }
        Ok(())
    }
}

/// Settings shared by every channel
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Directory that receives one log file per channel
    pub output_dir: PathBuf,

    /// Bind address for channels that do not set one
    pub default_bind_address: String,

    /// How long a stop request waits for a worker before aborting it
    pub stop_grace_ms: u64,

    /// Kernel receive buffer size requested for each socket
    pub recv_buffer_bytes: usize,

    /// Extension appended to channel names to form log file names
    pub file_extension: String,
}

impl ServiceConfig {
    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }

    /// Log file path for a channel
    pub fn log_path(&self, channel: &ChannelConfig) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", channel.name, self.file_extension))
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        let output_dir = directories::UserDirs::new()
            .and_then(|dirs| dirs.document_dir().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."));

        Self {
            output_dir,
            default_bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            stop_grace_ms: DEFAULT_STOP_GRACE_MS,
            recv_buffer_bytes: DEFAULT_RECV_BUFFER_BYTES,
            file_extension: DEFAULT_FILE_EXTENSION.to_string(),
        }
    }
}

/// One sensor bridge: a port, a name and its calibration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub port: u16,
    pub name: String,
    #[serde(default = "default_slope")]
    pub slope: f64,
    #[serde(default)]
    pub intercept: f64,
    #[serde(default)]
    pub bind_address: String,
    #[serde(default = "default_include")]
    pub include: bool,
}

fn default_slope() -> f64 {
    1.0
}

fn default_include() -> bool {
    true
}

impl ChannelConfig {
    pub fn new(port: u16, name: impl Into<String>) -> Self {
        Self {
            port,
            name: name.into(),
            slope: 1.0,
            intercept: 0.0,
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            include: true,
        }
    }

    pub fn with_calibration(mut self, calibration: Calibration) -> Self {
        self.slope = calibration.slope;
        self.intercept = calibration.intercept;
        self
    }

    pub fn with_bind_address(mut self, address: impl Into<String>) -> Self {
        self.bind_address = address.into();
        self
    }

    pub fn calibration(&self) -> Calibration {
        Calibration::new(self.slope, self.intercept)
    }

    /// Name must be usable as a plain file name
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Config(format!(
                "channel on port {} has an empty name",
                self.port
            )));
        }
        if self.name.contains(['/', '\\']) || self.name == "." || self.name == ".." {
            return Err(Error::Config(format!(
                "channel name {:?} is not a plain file name",
                self.name
            )));
        }
        if !self.slope.is_finite() || !self.intercept.is_finite() {
            return Err(Error::Config(format!(
                "channel {:?} has non-finite calibration",
                self.name
            )));
        }
        Ok(())
    }
}
