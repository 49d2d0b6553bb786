//! # USB Joystick Module
//!
//! This module handles USB joystick detection, connection, and input reading
//! using the Linux evdev interface.
//!
//! ## Controller Detection
//!
//! A joystick is either opened from the configured device path, or found by
//! scanning `/dev/input/event*` (sorted by path) for the first device that
//! reports both tracked absolute axes of the selected layout.
//!
//! ## Hot Plug
//!
//! A read failure is treated as an unplug: the outputs are zeroed, the handle
//! is dropped and every following [`InputSource::update`] call tries to
//! reopen the device, pausing between attempts.

use std::collections::VecDeque;
use std::path::Path;
use std::thread;
use std::time::Duration;

use evdev::{Device, InputEvent};
use tracing::{debug, info, warn};

use super::mapper::{AxisCodes, JoystickMapper};
use super::{AxisMap, InputSource};
use crate::config::JoystickConfig;
use crate::error::{JoystickControlError, Result};

/// A source of raw joystick events.
pub trait JoystickDevice {
    /// Blocks until the device has events and returns them.
    ///
    /// # Errors
    ///
    /// Returns `Controller` error if the device can no longer be read
    /// (e.g., unplugged).
    fn fetch_events(&mut self) -> Result<Vec<InputEvent>>;

    /// Human readable location of the device.
    fn path(&self) -> &str;
}

/// Opens a [`JoystickDevice`], called again after every disconnect.
pub type DeviceOpener = Box<dyn FnMut() -> Result<Box<dyn JoystickDevice>> + Send>;

/// Outcome of asking the device for its next event.
enum Fetch {
    Event(InputEvent),
    Empty,
    Unavailable,
}

/// Auto-calibrating USB joystick input source.
pub struct UsbJoystick {
    opener: DeviceOpener,
    device: Option<Box<dyn JoystickDevice>>,
    pending: VecDeque<InputEvent>,
    mapper: JoystickMapper,
    reconnect_interval: Duration,
}

impl UsbJoystick {
    /// Creates a joystick source backed by evdev.
    ///
    /// The device does not need to be present yet; a missing device is
    /// logged and retried on every update.
    #[must_use]
    pub fn new(config: &JoystickConfig) -> Self {
        let mapper = JoystickMapper::new(config.layout);
        let codes = mapper.codes();
        let device_path = config.device_path.clone();

        let opener: DeviceOpener = Box::new(move || {
            let path = (!device_path.is_empty()).then_some(device_path.as_str());
            let device = EvdevJoystick::open(path, codes)?;
            Ok(Box::new(device) as Box<dyn JoystickDevice>)
        });

        Self::with_opener(
            mapper,
            opener,
            Duration::from_millis(config.reconnect_interval_ms),
        )
    }

    /// Creates a joystick source with a custom device opener.
    #[must_use]
    pub fn with_opener(
        mapper: JoystickMapper,
        mut opener: DeviceOpener,
        reconnect_interval: Duration,
    ) -> Self {
        let device = match opener() {
            Ok(device) => {
                info!("Joystick connected at {}", device.path());
                Some(device)
            }
            Err(e) => {
                warn!("Joystick not available yet: {}", e);
                None
            }
        };

        Self {
            opener,
            device,
            pending: VecDeque::new(),
            mapper,
            reconnect_interval,
        }
    }

    /// Returns `true` while a device handle is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.device.is_some()
    }

    /// Access to the learned calibration state.
    #[must_use]
    pub fn mapper(&self) -> &JoystickMapper {
        &self.mapper
    }

    fn next_event(&mut self) -> Fetch {
        if let Some(event) = self.pending.pop_front() {
            return Fetch::Event(event);
        }

        if self.device.is_none() {
            match (self.opener)() {
                Ok(device) => {
                    info!("Joystick reconnected at {}", device.path());
                    self.device = Some(device);
                }
                Err(e) => {
                    debug!("Joystick still unavailable: {}", e);
                    thread::sleep(self.reconnect_interval);
                    return Fetch::Unavailable;
                }
            }
        }

        let Some(device) = self.device.as_mut() else {
            return Fetch::Unavailable;
        };

        match device.fetch_events() {
            Ok(events) => self.pending.extend(events),
            Err(e) => {
                warn!("Joystick disconnected: {}", e);
                self.device = None;
                self.pending.clear();
                return Fetch::Unavailable;
            }
        }

        match self.pending.pop_front() {
            Some(event) => Fetch::Event(event),
            None => Fetch::Empty,
        }
    }
}

impl InputSource for UsbJoystick {
    fn axes(&self) -> &AxisMap {
        self.mapper.axes()
    }

    fn cancel(&self) -> bool {
        self.mapper.cancel()
    }

    fn update(&mut self) -> Result<bool> {
        match self.next_event() {
            Fetch::Event(event) => Ok(self.mapper.process_event(&event)),
            Fetch::Empty => Ok(false),
            Fetch::Unavailable => {
                self.mapper.reset();
                Ok(false)
            }
        }
    }
}

/// Joystick handle opened through evdev.
pub struct EvdevJoystick {
    device: Device,
    device_path: String,
}

impl EvdevJoystick {
    /// Opens the joystick at `path`, or scans `/dev/input` when `path` is
    /// `None`.
    ///
    /// # Errors
    ///
    /// - `ControllerNotFound`: No device with the tracked axes found
    /// - `Controller`: The device at `path` could not be opened
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use joystick_control::config::JoystickLayout;
    /// use joystick_control::controller::joystick::EvdevJoystick;
    /// use joystick_control::controller::mapper::AxisCodes;
    ///
    /// let codes = AxisCodes::for_layout(JoystickLayout::Desktop);
    /// let joystick = EvdevJoystick::open(None, codes)?;
    /// println!("Connected to {:?}", joystick.name());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(path: Option<&str>, codes: AxisCodes) -> Result<Self> {
        match path {
            Some(path) => {
                let device = Device::open(path).map_err(|e| {
                    JoystickControlError::Controller(format!("Failed to open {}: {}", path, e))
                })?;
                Ok(Self {
                    device,
                    device_path: path.to_string(),
                })
            }
            None => Self::scan(codes),
        }
    }

    fn scan(codes: AxisCodes) -> Result<Self> {
        let input_dir = Path::new("/dev/input");

        if !input_dir.exists() {
            return Err(JoystickControlError::Controller(
                "/dev/input directory not found".to_string(),
            ));
        }

        let mut entries: Vec<_> = std::fs::read_dir(input_dir)
            .map_err(|e| JoystickControlError::Controller(format!("Failed to read /dev/input: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| JoystickControlError::Controller(format!("Failed to read directory entry: {}", e)))?;

        // Deterministic pick when several pads are connected
        entries.sort_by_key(|entry| entry.path());

        for entry in entries {
            let path = entry.path();

            let is_event_node = path
                .file_name()
                .map(|name| name.to_string_lossy().starts_with("event"))
                .unwrap_or(false);
            if !is_event_node {
                continue;
            }

            match Device::open(&path) {
                Ok(device) => {
                    debug!(
                        "Found input device: {} ({})",
                        path.display(),
                        device.name().unwrap_or("unnamed")
                    );

                    let has_axes = device
                        .supported_absolute_axes()
                        .map(|axes| axes.contains(codes.accel) && axes.contains(codes.steer))
                        .unwrap_or(false);

                    if has_axes {
                        let device_path = path.to_string_lossy().to_string();
                        info!("Found joystick at: {}", device_path);
                        return Ok(Self {
                            device,
                            device_path,
                        });
                    }
                }
                Err(e) => {
                    // Permission denied or other errors - skip device
                    debug!("Could not open {}: {}", path.display(), e);
                }
            }
        }

        Err(JoystickControlError::ControllerNotFound)
    }

    /// Device name reported by the kernel.
    pub fn name(&self) -> Option<&str> {
        self.device.name()
    }
}

impl JoystickDevice for EvdevJoystick {
    fn fetch_events(&mut self) -> Result<Vec<InputEvent>> {
        self.device
            .fetch_events()
            .map(|events| events.collect())
            .map_err(|e| JoystickControlError::Controller(format!("Failed to fetch events: {}", e)))
    }

    fn path(&self) -> &str {
        &self.device_path
    }
}
