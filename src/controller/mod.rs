//! # Controller Module
//!
//! Input device handling.
//!
//! This module handles:
//! - The [`InputSource`] capability shared by every input adapter
//! - The ordered [`AxisMap`] of normalized control values
//! - Deadzone, response curve and range tracking ([`calibration`])
//! - USB joystick input via evdev ([`joystick`], [`mapper`])
//! - Terminal keyboard input ([`keyboard`])
//! - Bluetooth gamepad input ([`bluetooth`])

pub mod bluetooth;
pub mod calibration;
pub mod joystick;
pub mod keyboard;
pub mod mapper;

use std::fmt;

use crate::error::Result;

/// Ordered mapping from axis name to a normalized value in -1.0..=1.0.
///
/// The set and order of axes is fixed at construction; the order is the
/// order in which values are published.
///
/// # Examples
///
/// ```
/// use joystick_control::controller::AxisMap;
///
/// let mut axes = AxisMap::with_axes(&["gb", "steer"]);
/// axes.set("steer", -0.25);
/// assert_eq!(axes.values(), vec![0.0, -0.25]);
/// assert_eq!(axes.to_string(), "gb: 0.000, steer: -0.250");
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AxisMap {
    entries: Vec<(&'static str, f32)>,
}

impl AxisMap {
    /// Creates a map with all `names` present and zeroed, in that order.
    #[must_use]
    pub fn with_axes(names: &[&'static str]) -> Self {
        Self {
            entries: names.iter().map(|&name| (name, 0.0)).collect(),
        }
    }

    /// Returns the value of `name`, or `None` if the axis is not declared.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f32> {
        self.entries
            .iter()
            .find(|(axis, _)| *axis == name)
            .map(|&(_, value)| value)
    }

    /// Sets a declared axis. Returns `false` if `name` is not declared.
    pub fn set(&mut self, name: &str, value: f32) -> bool {
        match self.entries.iter_mut().find(|(axis, _)| *axis == name) {
            Some(entry) => {
                entry.1 = value;
                true
            }
            None => false,
        }
    }

    /// Zeroes every axis.
    pub fn reset(&mut self) {
        for entry in &mut self.entries {
            entry.1 = 0.0;
        }
    }

    /// Axis names in declared order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|&(name, _)| name)
    }

    /// Axis values in declared order.
    #[must_use]
    pub fn values(&self) -> Vec<f32> {
        self.entries.iter().map(|&(_, value)| value).collect()
    }

    /// `(name, value)` pairs in declared order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f32)> + '_ {
        self.entries.iter().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for AxisMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {:.3}", name, value)?;
        }
        Ok(())
    }
}

/// Point-in-time copy of an input source, handed from the polling loop to
/// the publisher loop.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ControlSnapshot {
    pub axes: AxisMap,
    pub cancel: bool,
}

/// A device that produces normalized control axes.
///
/// Implemented by [`keyboard::Keyboard`], [`joystick::UsbJoystick`] and
/// [`bluetooth::BluetoothGamepad`].
pub trait InputSource {
    /// Current axis values, in publishing order.
    fn axes(&self) -> &AxisMap;

    /// Current state of the cancel request.
    fn cancel(&self) -> bool;

    /// Reads the next input event and updates axes and cancel state.
    ///
    /// Returns `Ok(true)` if the event was recognized and `Ok(false)` if it
    /// was ignored or the device is currently unavailable. May block until
    /// the device produces an event.
    ///
    /// # Errors
    ///
    /// Returns an error only when the source can no longer produce input.
    fn update(&mut self) -> Result<bool>;

    /// Axis names in publishing order.
    fn axes_order(&self) -> Vec<&'static str> {
        self.axes().names().collect()
    }

    /// Copies the current state.
    fn snapshot(&self) -> ControlSnapshot {
        ControlSnapshot {
            axes: self.axes().clone(),
            cancel: self.cancel(),
        }
    }
}
