//! # Keyboard Module
//!
//! Drive the control axes from the terminal keyboard.
//!
//! | Key | Action |
//! |-----|--------|
//! | `W` / `S` | Gas / brake (`gb`) up / down by 5% |
//! | `A` / `D` | Steering left / right by 5% |
//! | `R` | Reset all axes to 0 |
//! | `C` | Cancel for one update |
//! | `Ctrl+C` | Quit |
//!
//! Every keypress clears the cancel request first, so `C` only lasts until
//! the next key.

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use tracing::trace;

use super::{AxisMap, InputSource};
use crate::error::{JoystickControlError, Result};

/// Axis change per keypress, as a fraction of full scale.
pub const AXIS_INCREMENT: f32 = 0.05;

/// Gas/brake axis name.
pub const AXIS_GB: &str = "gb";
/// Steering axis name.
pub const AXIS_STEER: &str = "steer";

/// A blocking source of keypresses.
pub trait KeySource {
    /// Blocks until the next character key is pressed.
    ///
    /// # Errors
    ///
    /// Returns `Interrupted` when the user asks to quit, or `Keyboard` /
    /// `Io` errors if the terminal can no longer be read.
    fn next_key(&mut self) -> Result<char>;
}

/// Reads keys from the controlling terminal in raw mode.
///
/// Raw mode is enabled on creation and restored on drop.
#[derive(Debug)]
pub struct TerminalKeys {
    _private: (),
}

impl TerminalKeys {
    /// Switches the terminal to raw mode.
    ///
    /// # Errors
    ///
    /// Returns `Keyboard` error if there is no terminal to read from.
    pub fn new() -> Result<Self> {
        terminal::enable_raw_mode()
            .map_err(|e| JoystickControlError::Keyboard(format!("Failed to enable raw mode: {}", e)))?;
        Ok(Self { _private: () })
    }
}

impl KeySource for TerminalKeys {
    fn next_key(&mut self) -> Result<char> {
        loop {
            let Event::Key(key) = event::read()? else {
                continue;
            };

            if key.kind != KeyEventKind::Press {
                continue;
            }

            match key.code {
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    return Err(JoystickControlError::Interrupted);
                }
                KeyCode::Char(c) => return Ok(c),
                other => trace!("Ignoring key {:?}", other),
            }
        }
    }
}

impl Drop for TerminalKeys {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Keyboard input source.
pub struct Keyboard<K: KeySource = TerminalKeys> {
    keys: K,
    axes: AxisMap,
    cancel: bool,
}

impl Keyboard<TerminalKeys> {
    /// Creates a keyboard source reading the controlling terminal.
    ///
    /// # Errors
    ///
    /// Returns error if the terminal cannot be put into raw mode.
    pub fn open() -> Result<Self> {
        Ok(Self::new(TerminalKeys::new()?))
    }
}

impl<K: KeySource> Keyboard<K> {
    /// Creates a keyboard source over `keys` with all axes at zero.
    #[must_use]
    pub fn new(keys: K) -> Self {
        Self {
            keys,
            axes: AxisMap::with_axes(&[AXIS_GB, AXIS_STEER]),
            cancel: false,
        }
    }

    /// Applies one keypress. Returns `true` if the key is bound.
    pub fn handle_key(&mut self, key: char) -> bool {
        self.cancel = false;

        let (axis, increment) = match key.to_ascii_lowercase() {
            'r' => {
                self.axes.reset();
                return true;
            }
            'c' => {
                self.cancel = true;
                return true;
            }
            'w' => (AXIS_GB, AXIS_INCREMENT),
            's' => (AXIS_GB, -AXIS_INCREMENT),
            'a' => (AXIS_STEER, AXIS_INCREMENT),
            'd' => (AXIS_STEER, -AXIS_INCREMENT),
            _ => return false,
        };

        let current = self.axes.get(axis).unwrap_or(0.0);
        self.axes.set(axis, (current + increment).clamp(-1.0, 1.0));
        true
    }
}

impl<K: KeySource> InputSource for Keyboard<K> {
    fn axes(&self) -> &AxisMap {
        &self.axes
    }

    fn cancel(&self) -> bool {
        self.cancel
    }

    fn update(&mut self) -> Result<bool> {
        let key = self.keys.next_key()?;
        Ok(self.handle_key(key))
    }
}
