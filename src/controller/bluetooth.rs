//! # Bluetooth Gamepad Module
//!
//! PS4/PS5 style gamepads paired over Bluetooth. The gamepad driver already
//! reports axes in -1.0..=1.0, so no range tracking is needed.
//!
//! | Input | Function |
//! |-------|----------|
//! | Left stick X | Steering (inverted) |
//! | R2 | Accelerate |
//! | L2 | Brake |
//! | D-Pad up / down | Speed mode up / down |
//! | Triangle | Cancel (held) |
//!
//! Acceleration is `speed_scale * (r2 - l2)` with both triggers rescaled to
//! 0.0..=1.0. The three speed modes scale it by 0.33, 0.66 and 1.0.
//!
//! The production driver uses `gilrs` and is only built with the
//! `bluetooth` cargo feature.

use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use super::{AxisMap, InputSource};
use crate::config::BluetoothConfig;
use crate::error::Result;

/// Acceleration scale for each speed mode.
pub const SPEED_SCALES: [f32; 3] = [0.33, 0.66, 1.0];

/// Speed mode selected at startup.
pub const INITIAL_SPEED_MODE: usize = 1;

/// D-pad deflection treated as a press.
const DPAD_THRESHOLD: f32 = 0.5;

/// Acceleration axis name.
pub const AXIS_ACCEL: &str = "accel";
/// Steering axis name.
pub const AXIS_STEER: &str = "steer";

/// Sampled gamepad state, all axes in -1.0..=1.0.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PadState {
    pub left_x: f32,
    /// -1.0 released, 1.0 fully pressed.
    pub l2: f32,
    /// -1.0 released, 1.0 fully pressed.
    pub r2: f32,
    /// Negative is up, positive is down.
    pub dpad_y: f32,
    pub triangle: bool,
}

/// Access to a paired gamepad.
pub trait GamepadDriver {
    /// Looks for a pad to bind to. Returns `true` once one is bound.
    fn try_attach(&mut self) -> bool;

    /// Returns `false` once the bound pad is gone.
    fn is_connected(&mut self) -> bool;

    /// Waits for pending input (bounded by the driver's poll interval) and
    /// returns the current pad state.
    fn read(&mut self) -> PadState;
}

/// Bluetooth gamepad input source.
pub struct BluetoothGamepad<D: GamepadDriver> {
    driver: D,
    reconnect_interval: Duration,
    speed_mode: usize,
    dpad_latched: bool,
    axes: AxisMap,
    cancel: bool,
}

impl<D: GamepadDriver> BluetoothGamepad<D> {
    /// Creates the source, blocking until a gamepad is attached.
    pub fn new(driver: D, reconnect_interval: Duration) -> Self {
        let mut gamepad = Self {
            driver,
            reconnect_interval,
            speed_mode: INITIAL_SPEED_MODE,
            dpad_latched: false,
            axes: AxisMap::with_axes(&[AXIS_ACCEL, AXIS_STEER]),
            cancel: false,
        };
        gamepad.connect();
        gamepad
    }

    /// Current speed mode index (0..=2).
    #[must_use]
    pub fn speed_mode(&self) -> usize {
        self.speed_mode
    }

    fn connect(&mut self) {
        if !self.driver.try_attach() {
            info!("Waiting for Bluetooth gamepad connection...");
            info!("Make sure the Bluetooth UART is attached (hciattach) and the pad is paired via bluetoothctl");
            while !self.driver.try_attach() {
                thread::sleep(self.reconnect_interval);
            }
        }
        info!("Bluetooth gamepad connected!");
    }

    /// Applies a sampled pad state to the axes.
    pub fn apply(&mut self, state: &PadState) {
        self.axes.set(AXIS_STEER, -state.left_x);

        let accel_amount = (state.r2 + 1.0) / 2.0;
        let brake_amount = (state.l2 + 1.0) / 2.0;
        self.axes.set(
            AXIS_ACCEL,
            SPEED_SCALES[self.speed_mode] * (accel_amount - brake_amount),
        );

        if state.dpad_y.abs() > DPAD_THRESHOLD {
            if !self.dpad_latched {
                self.dpad_latched = true;
                self.step_speed_mode(state.dpad_y < 0.0);
            }
        } else {
            self.dpad_latched = false;
        }

        self.cancel = state.triangle;
    }

    fn step_speed_mode(&mut self, up: bool) {
        let next = if up {
            (self.speed_mode + 1).min(SPEED_SCALES.len() - 1)
        } else {
            self.speed_mode.saturating_sub(1)
        };

        if next != self.speed_mode {
            self.speed_mode = next;
            info!("Speed mode: {}/{}", self.speed_mode + 1, SPEED_SCALES.len());
        }
    }
}

impl<D: GamepadDriver> InputSource for BluetoothGamepad<D> {
    fn axes(&self) -> &AxisMap {
        &self.axes
    }

    fn cancel(&self) -> bool {
        self.cancel
    }

    fn update(&mut self) -> Result<bool> {
        if !self.driver.is_connected() {
            warn!("Gamepad disconnected, attempting to reconnect...");
            self.connect();
            return Ok(false);
        }

        let state = self.driver.read();
        self.apply(&state);
        Ok(true)
    }
}

/// Opens the Bluetooth gamepad through gilrs.
///
/// # Errors
///
/// Returns `BluetoothUnavailable` if the gilrs backend fails to start.
#[cfg(feature = "bluetooth")]
pub fn open(config: &BluetoothConfig) -> Result<BluetoothGamepad<gilrs_driver::GilrsDriver>> {
    let driver = gilrs_driver::GilrsDriver::new(Duration::from_millis(config.poll_interval_ms))?;
    Ok(BluetoothGamepad::new(
        driver,
        Duration::from_millis(config.reconnect_interval_ms),
    ))
}

/// Without the `bluetooth` feature there is no gamepad driver to open.
///
/// # Errors
///
/// Always returns `BluetoothUnavailable` with rebuild instructions.
#[cfg(not(feature = "bluetooth"))]
pub fn open(_config: &BluetoothConfig) -> Result<BluetoothGamepad<NoDriver>> {
    Err(crate::error::JoystickControlError::BluetoothUnavailable(
        "gamepad driver not compiled in. Rebuild with: cargo build --release --features bluetooth"
            .to_string(),
    ))
}

/// Placeholder driver type for builds without the `bluetooth` feature.
#[cfg(not(feature = "bluetooth"))]
#[derive(Debug)]
pub enum NoDriver {}

#[cfg(not(feature = "bluetooth"))]
impl GamepadDriver for NoDriver {
    fn try_attach(&mut self) -> bool {
        match *self {}
    }

    fn is_connected(&mut self) -> bool {
        match *self {}
    }

    fn read(&mut self) -> PadState {
        match *self {}
    }
}

#[cfg(feature = "bluetooth")]
pub mod gilrs_driver {
    //! gilrs backed [`GamepadDriver`].

    use std::time::Duration;

    use gilrs::{Axis, Button, GamepadId, Gilrs};
    use tracing::{debug, info};

    use super::{GamepadDriver, PadState};
    use crate::error::{JoystickControlError, Result};

    /// Gamepad driver using gilrs.
    pub struct GilrsDriver {
        gilrs: Gilrs,
        active: Option<GamepadId>,
        poll_interval: Duration,
    }

    impl GilrsDriver {
        /// Starts the gilrs backend.
        ///
        /// # Errors
        ///
        /// Returns `BluetoothUnavailable` if gilrs cannot access input
        /// devices.
        pub fn new(poll_interval: Duration) -> Result<Self> {
            let gilrs = Gilrs::new().map_err(|e| {
                JoystickControlError::BluetoothUnavailable(format!("Failed to initialize gilrs: {}", e))
            })?;
            Ok(Self {
                gilrs,
                active: None,
                poll_interval,
            })
        }

        fn drain_events(&mut self) {
            while let Some(event) = self.gilrs.next_event() {
                debug!("Gamepad event: {:?}", event.event);
            }
        }

        /// Trigger pressure mapped from 0.0..=1.0 onto -1.0..=1.0.
        fn trigger(gamepad: &gilrs::Gamepad<'_>, button: Button) -> f32 {
            let pressure = gamepad
                .button_data(button)
                .map(|data| data.value())
                .unwrap_or(0.0);
            pressure * 2.0 - 1.0
        }
    }

    impl GamepadDriver for GilrsDriver {
        fn try_attach(&mut self) -> bool {
            self.drain_events();
            match self.gilrs.gamepads().next() {
                Some((id, gamepad)) => {
                    info!("Using gamepad {} ({})", gamepad.name(), id);
                    self.active = Some(id);
                    true
                }
                None => false,
            }
        }

        fn is_connected(&mut self) -> bool {
            self.active
                .map(|id| self.gilrs.connected_gamepad(id).is_some())
                .unwrap_or(false)
        }

        fn read(&mut self) -> PadState {
            if let Some(event) = self.gilrs.next_event_blocking(Some(self.poll_interval)) {
                debug!("Gamepad event: {:?}", event.event);
            }
            self.drain_events();

            let Some(gamepad) = self.active.and_then(|id| self.gilrs.connected_gamepad(id)) else {
                return PadState::default();
            };

            let dpad_y = if gamepad.is_pressed(Button::DPadUp) {
                -1.0
            } else if gamepad.is_pressed(Button::DPadDown) {
                1.0
            } else {
                0.0
            };

            PadState {
                left_x: gamepad.value(Axis::LeftStickX),
                l2: Self::trigger(&gamepad, Button::LeftTrigger2),
                r2: Self::trigger(&gamepad, Button::RightTrigger2),
                dpad_y,
                triangle: gamepad.is_pressed(Button::North),
            }
        }
    }
}
