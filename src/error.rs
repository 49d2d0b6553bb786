//! # Error Types
//!
//! Custom error types for Joystick Control using `thiserror`.

use thiserror::Error;

/// Main error type for Joystick Control
#[derive(Debug, Error)]
pub enum JoystickControlError {
    /// Input device errors (open, read, scan)
    #[error("Controller error: {0}")]
    Controller(String),

    /// No input device with the required axes was found
    #[error("No compatible joystick found")]
    ControllerNotFound,

    /// Bluetooth gamepad driver missing or failed to start
    #[error("Bluetooth gamepad unavailable: {0}")]
    BluetoothUnavailable(String),

    /// Terminal keyboard errors
    #[error("Keyboard error: {0}")]
    Keyboard(String),

    /// User requested exit from the input source (Ctrl+C in raw mode)
    #[error("Interrupted by user")]
    Interrupted,

    /// Startup preconditions not met
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Pub/sub transport errors
    #[error("Publish error: {0}")]
    Publish(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Message encoding errors
    #[error("Encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Joystick Control
pub type Result<T> = std::result::Result<T, JoystickControlError>;
