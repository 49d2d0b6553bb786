//! # Joystick Control Library
//!
//! Publish normalized control axes from a USB joystick, Bluetooth gamepad or
//! keyboard on a pub/sub channel.
//!
//! This library provides the input adapters, the response shaping and
//! auto-calibration logic, and the polling and publisher loops that connect
//! an input device to an MQTT topic.

pub mod config;
pub mod error;
pub mod controller;
pub mod logging;
pub mod params;
pub mod polling;
pub mod publisher;
