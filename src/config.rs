//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every field has a default, so a config file only needs to list the values
//! it changes. Running without a config file uses [`Config::default()`].

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{JoystickControlError, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub publisher: PublisherConfig,
    #[serde(default)]
    pub mqtt: MqttConfig,
    #[serde(default)]
    pub joystick: JoystickConfig,
    #[serde(default)]
    pub bluetooth: BluetoothConfig,
    #[serde(default)]
    pub params: ParamsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Publisher loop configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PublisherConfig {
    #[serde(default = "default_rate_hz")]
    pub rate_hz: u32,

    #[serde(default = "default_log_every_frames")]
    pub log_every_frames: u64,

    #[serde(default = "default_topic")]
    pub topic: String,
}

/// MQTT transport configuration
#[derive(Debug, Deserialize, Clone)]
pub struct MqttConfig {
    #[serde(default = "default_mqtt_host")]
    pub host: String,

    #[serde(default = "default_mqtt_port")]
    pub port: u16,

    #[serde(default = "default_client_id")]
    pub client_id: String,

    #[serde(default = "default_keep_alive_s")]
    pub keep_alive_s: u64,

    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,
}

/// Physical axis assignment of the USB joystick.
///
/// Desktop drivers and the in-vehicle computer enumerate the same pad with
/// different absolute axis codes.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum JoystickLayout {
    /// Accel on ABS_Z, steering on ABS_RX, ABS_RZ flipped onto accel.
    #[default]
    Desktop,
    /// Accel on ABS_RX, steering on ABS_Z, ABS_RY flipped onto accel.
    Onboard,
}

/// USB joystick configuration
#[derive(Debug, Deserialize, Clone)]
pub struct JoystickConfig {
    /// Empty means auto-detect.
    #[serde(default)]
    pub device_path: String,

    #[serde(default)]
    pub layout: JoystickLayout,

    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,
}

/// Bluetooth gamepad configuration
#[derive(Debug, Deserialize, Clone)]
pub struct BluetoothConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,
}

/// Parameter store configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ParamsConfig {
    #[serde(default = "default_params_dir")]
    pub dir: String,

    /// When this environment variable is set the offroad check is skipped.
    #[serde(default = "default_bypass_env")]
    pub bypass_env: String,
}

/// Log output configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    /// Directory for daily rolling log files. Console only when unset.
    #[serde(default)]
    pub dir: Option<String>,
}

// Default value functions
fn default_rate_hz() -> u32 { 100 }
fn default_log_every_frames() -> u64 { 20 }
fn default_topic() -> String { "testJoystick".to_string() }

fn default_mqtt_host() -> String { "localhost".to_string() }
fn default_mqtt_port() -> u16 { 1883 }
fn default_client_id() -> String { "joystick-control".to_string() }
fn default_keep_alive_s() -> u64 { 5 }
fn default_reconnect_interval_ms() -> u64 { 1000 }

fn default_poll_interval_ms() -> u64 { 10 }

fn default_params_dir() -> String { "/data/params/d".to_string() }
fn default_bypass_env() -> String { "ZMQ".to_string() }

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            rate_hz: default_rate_hz(),
            log_every_frames: default_log_every_frames(),
            topic: default_topic(),
        }
    }
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: default_mqtt_host(),
            port: default_mqtt_port(),
            client_id: default_client_id(),
            keep_alive_s: default_keep_alive_s(),
            reconnect_interval_ms: default_reconnect_interval_ms(),
        }
    }
}

impl Default for JoystickConfig {
    fn default() -> Self {
        Self {
            device_path: String::new(),
            layout: JoystickLayout::default(),
            reconnect_interval_ms: default_reconnect_interval_ms(),
        }
    }
}

impl Default for BluetoothConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            reconnect_interval_ms: default_reconnect_interval_ms(),
        }
    }
}

impl Default for ParamsConfig {
    fn default() -> Self {
        Self {
            dir: default_params_dir(),
            bypass_env: default_bypass_env(),
        }
    }
}

fn invalid(msg: impl std::fmt::Display) -> JoystickControlError {
    JoystickControlError::Config(toml::de::Error::custom(msg))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use joystick_control::config::Config;
    ///
    /// let config = Config::load("config/joystick.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.publisher.rate_hz == 0 || self.publisher.rate_hz > 1000 {
            return Err(invalid("rate_hz must be between 1 and 1000"));
        }

        if self.publisher.log_every_frames == 0 {
            return Err(invalid("log_every_frames must be greater than 0"));
        }

        if self.publisher.topic.is_empty() {
            return Err(invalid("publisher topic cannot be empty"));
        }

        if self.mqtt.host.is_empty() {
            return Err(invalid("mqtt host cannot be empty"));
        }

        if self.mqtt.port == 0 {
            return Err(invalid("mqtt port must be greater than 0"));
        }

        if self.mqtt.client_id.is_empty() {
            return Err(invalid("mqtt client_id cannot be empty"));
        }

        if self.mqtt.keep_alive_s == 0 || self.mqtt.keep_alive_s > 3600 {
            return Err(invalid("keep_alive_s must be between 1 and 3600"));
        }

        for (name, value) in [
            ("mqtt.reconnect_interval_ms", self.mqtt.reconnect_interval_ms),
            ("joystick.reconnect_interval_ms", self.joystick.reconnect_interval_ms),
            ("bluetooth.reconnect_interval_ms", self.bluetooth.reconnect_interval_ms),
        ] {
            if value == 0 || value > 60000 {
                return Err(invalid(format!("{} must be between 1 and 60000", name)));
            }
        }

        if self.bluetooth.poll_interval_ms == 0 || self.bluetooth.poll_interval_ms > 1000 {
            return Err(invalid("poll_interval_ms must be between 1 and 1000"));
        }

        if self.params.dir.is_empty() {
            return Err(invalid("params dir cannot be empty"));
        }

        if matches!(&self.logging.dir, Some(dir) if dir.is_empty()) {
            return Err(invalid("logging dir cannot be empty when set"));
        }

        Ok(())
    }
}
