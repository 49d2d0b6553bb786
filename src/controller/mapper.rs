//! # Joystick Event Mapper Module
//!
//! This module turns raw evdev events from a USB joystick into normalized
//! acceleration and steering values.
//!
//! ## Axis Layouts
//!
//! | Layout | Accel | Steer | Flipped onto accel |
//! |--------|-------|-------|--------------------|
//! | Desktop | ABS_Z | ABS_RX | ABS_RZ |
//! | Onboard | ABS_RX | ABS_Z | ABS_RY |
//!
//! The flipped channel lets a second trigger act as negative acceleration:
//! its raw value is negated before it enters the accel axis range tracker.
//!
//! ## Buttons
//!
//! | Button | evdev Code | Function |
//! |--------|------------|----------|
//! | Triangle / North | BTN_NORTH | Cancel (held) |
//!
//! ## Usage
//!
//! ```
//! use evdev::{AbsoluteAxisType, EventType, InputEvent};
//! use joystick_control::config::JoystickLayout;
//! use joystick_control::controller::mapper::JoystickMapper;
//!
//! let mut mapper = JoystickMapper::new(JoystickLayout::Desktop);
//! let steer = AbsoluteAxisType::ABS_RX;
//!
//! assert!(mapper.process_event(&InputEvent::new(EventType::ABSOLUTE, steer.0, 0)));
//! assert!(mapper.process_event(&InputEvent::new(EventType::ABSOLUTE, steer.0, 255)));
//! assert!((mapper.axes().get("ABS_RX").unwrap() - (-1.0)).abs() < 0.001);
//! ```

use evdev::{AbsoluteAxisType, InputEvent, InputEventKind, Key};
use tracing::trace;

use super::calibration::{CalibrationRange, ResponseCurve};
use super::AxisMap;
use crate::config::JoystickLayout;

/// Button that raises the cancel request while held.
pub const CANCEL_BUTTON: Key = Key::BTN_NORTH;

/// Key event value for a button press.
const KEY_PRESSED: i32 = 1;
/// Key event value for a button release.
const KEY_RELEASED: i32 = 0;

/// Raw axis codes used by one [`JoystickLayout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisCodes {
    pub accel: AbsoluteAxisType,
    pub steer: AbsoluteAxisType,
    /// Channel negated and merged into `accel`.
    pub flipped: AbsoluteAxisType,
}

impl AxisCodes {
    /// Returns the axis codes for `layout`.
    #[must_use]
    pub fn for_layout(layout: JoystickLayout) -> Self {
        match layout {
            JoystickLayout::Desktop => Self {
                accel: AbsoluteAxisType::ABS_Z,
                steer: AbsoluteAxisType::ABS_RX,
                flipped: AbsoluteAxisType::ABS_RZ,
            },
            JoystickLayout::Onboard => Self {
                accel: AbsoluteAxisType::ABS_RX,
                steer: AbsoluteAxisType::ABS_Z,
                flipped: AbsoluteAxisType::ABS_RY,
            },
        }
    }
}

/// Name used in the [`AxisMap`] for a raw axis.
#[must_use]
pub fn axis_name(axis: AbsoluteAxisType) -> &'static str {
    match axis {
        AbsoluteAxisType::ABS_X => "ABS_X",
        AbsoluteAxisType::ABS_Y => "ABS_Y",
        AbsoluteAxisType::ABS_Z => "ABS_Z",
        AbsoluteAxisType::ABS_RX => "ABS_RX",
        AbsoluteAxisType::ABS_RY => "ABS_RY",
        AbsoluteAxisType::ABS_RZ => "ABS_RZ",
        _ => "ABS_OTHER",
    }
}

/// Auto-calibrating mapper from joystick events to normalized axes.
///
/// Keeps one [`CalibrationRange`] per tracked axis for the lifetime of the
/// mapper; [`JoystickMapper::reset`] zeroes the outputs but keeps the learned
/// ranges.
#[derive(Debug)]
pub struct JoystickMapper {
    codes: AxisCodes,
    curve: ResponseCurve,
    accel_range: Option<CalibrationRange>,
    steer_range: Option<CalibrationRange>,
    axes: AxisMap,
    cancel: bool,
}

impl JoystickMapper {
    /// Creates a mapper for `layout` with all axes at zero.
    #[must_use]
    pub fn new(layout: JoystickLayout) -> Self {
        let codes = AxisCodes::for_layout(layout);
        Self {
            codes,
            curve: ResponseCurve::default(),
            accel_range: None,
            steer_range: None,
            axes: AxisMap::with_axes(&[axis_name(codes.accel), axis_name(codes.steer)]),
            cancel: false,
        }
    }

    #[must_use]
    pub fn codes(&self) -> AxisCodes {
        self.codes
    }

    #[must_use]
    pub fn axes(&self) -> &AxisMap {
        &self.axes
    }

    #[must_use]
    pub fn cancel(&self) -> bool {
        self.cancel
    }

    /// Learned raw range of the accel axis, if any sample was seen.
    #[must_use]
    pub fn accel_range(&self) -> Option<CalibrationRange> {
        self.accel_range
    }

    /// Learned raw range of the steer axis, if any sample was seen.
    #[must_use]
    pub fn steer_range(&self) -> Option<CalibrationRange> {
        self.steer_range
    }

    /// Processes a single evdev input event.
    ///
    /// Returns `true` if the event touched a tracked axis or the cancel
    /// button, `false` if it was ignored.
    pub fn process_event(&mut self, event: &InputEvent) -> bool {
        match event.kind() {
            InputEventKind::AbsAxis(axis) => self.process_axis_event(axis, event.value()),
            InputEventKind::Key(key) => self.process_key_event(key, event.value()),
            _ => {
                trace!("Ignoring event {:?}", event.kind());
                false
            }
        }
    }

    /// Processes a raw absolute axis sample.
    pub fn process_axis_event(&mut self, axis: AbsoluteAxisType, value: i32) -> bool {
        // Second trigger drives accel in the negative direction
        let (axis, value) = if axis == self.codes.flipped {
            (self.codes.accel, value.saturating_neg())
        } else {
            (axis, value)
        };

        let range = if axis == self.codes.accel {
            &mut self.accel_range
        } else if axis == self.codes.steer {
            &mut self.steer_range
        } else {
            trace!("Ignoring untracked axis {:?}", axis);
            return false;
        };

        let range = range.get_or_insert_with(|| CalibrationRange::new(value));
        range.observe(value);

        // Device polarity is inverted
        let norm = -range.normalize(value);
        self.axes.set(axis_name(axis), self.curve.apply(norm));
        true
    }

    /// Processes a key event. Only the cancel button is recognized.
    pub fn process_key_event(&mut self, key: Key, value: i32) -> bool {
        if key != CANCEL_BUTTON {
            trace!("Ignoring button {:?}", key);
            return false;
        }

        match value {
            KEY_PRESSED => self.cancel = true,
            KEY_RELEASED => self.cancel = false,
            _ => {}
        }
        true
    }

    /// Zeroes all axes and clears cancel. Learned ranges are kept.
    pub fn reset(&mut self) {
        self.axes.reset();
        self.cancel = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evdev::EventType;

    /// Helper to create an axis event for testing.
    fn make_axis_event(axis: AbsoluteAxisType, value: i32) -> InputEvent {
        InputEvent::new(EventType::ABSOLUTE, axis.0, value)
    }

    /// Helper to create a key event for testing.
    fn make_key_event(key: Key, value: i32) -> InputEvent {
        InputEvent::new(EventType::KEY, key.code(), value)
    }

    // ==================== Layout Tests ====================

    #[test]
    fn test_desktop_layout_codes() {
        let codes = AxisCodes::for_layout(JoystickLayout::Desktop);
        assert_eq!(codes.accel, AbsoluteAxisType::ABS_Z);
        assert_eq!(codes.steer, AbsoluteAxisType::ABS_RX);
        assert_eq!(codes.flipped, AbsoluteAxisType::ABS_RZ);
    }

    #[test]
    fn test_onboard_layout_codes() {
        let codes = AxisCodes::for_layout(JoystickLayout::Onboard);
        assert_eq!(codes.accel, AbsoluteAxisType::ABS_RX);
        assert_eq!(codes.steer, AbsoluteAxisType::ABS_Z);
        assert_eq!(codes.flipped, AbsoluteAxisType::ABS_RY);
    }

    #[test]
    fn test_axis_order_is_accel_then_steer() {
        let mapper = JoystickMapper::new(JoystickLayout::Desktop);
        assert_eq!(mapper.axes().names().collect::<Vec<_>>(), vec!["ABS_Z", "ABS_RX"]);

        let mapper = JoystickMapper::new(JoystickLayout::Onboard);
        assert_eq!(mapper.axes().names().collect::<Vec<_>>(), vec!["ABS_RX", "ABS_Z"]);
    }

    // ==================== Axis Event Tests ====================

    #[test]
    fn test_first_sample_maps_to_zero() {
        let mut mapper = JoystickMapper::new(JoystickLayout::Desktop);
        assert!(mapper.process_event(&make_axis_event(AbsoluteAxisType::ABS_Z, 128)));
        assert_eq!(mapper.axes().get("ABS_Z"), Some(0.0));
        assert_eq!(mapper.accel_range(), Some(CalibrationRange::new(128)));
    }

    #[test]
    fn test_end_to_end_range_widening() {
        let mut mapper = JoystickMapper::new(JoystickLayout::Desktop);
        for sample in [100, 150, 200] {
            assert!(mapper.process_event(&make_axis_event(AbsoluteAxisType::ABS_RX, sample)));
        }

        let range = mapper.steer_range().unwrap();
        assert_eq!((range.min(), range.max()), (100, 200));

        // 150 is the midpoint of the learned range: deadzone, then shaping
        let curve = ResponseCurve::default();
        assert_eq!(curve.apply(-range.normalize(150)), 0.0);

        // Latest sample is the new maximum, inverted to full negative
        assert!((mapper.axes().get("ABS_RX").unwrap() - (-1.0)).abs() < 0.0001);
    }

    #[test]
    fn test_sample_normalized_against_range_at_arrival() {
        let mut mapper = JoystickMapper::new(JoystickLayout::Desktop);
        mapper.process_event(&make_axis_event(AbsoluteAxisType::ABS_RX, 100));
        mapper.process_event(&make_axis_event(AbsoluteAxisType::ABS_RX, 150));

        // Range is [100, 150] when 150 arrives, so it is the top of travel
        assert!((mapper.axes().get("ABS_RX").unwrap() - (-1.0)).abs() < 0.0001);
    }

    #[test]
    fn test_center_returns_to_zero_after_full_travel() {
        let mut mapper = JoystickMapper::new(JoystickLayout::Desktop);
        for sample in [0, 255, 128] {
            mapper.process_event(&make_axis_event(AbsoluteAxisType::ABS_Z, sample));
        }
        // 128 on [0, 255] is ~0.004 off center, inside the deadzone
        assert_eq!(mapper.axes().get("ABS_Z"), Some(0.0));
    }

    #[test]
    fn test_partial_deflection_is_shaped() {
        let mut mapper = JoystickMapper::new(JoystickLayout::Desktop);
        for sample in [0, 200, 50] {
            mapper.process_event(&make_axis_event(AbsoluteAxisType::ABS_Z, sample));
        }
        // 50 on [0, 200] normalizes to -0.5, inverted to 0.5 -> 0.35
        let value = mapper.axes().get("ABS_Z").unwrap();
        assert!((value - 0.35).abs() < 1e-5);
    }

    #[test]
    fn test_output_always_bounded() {
        let mut mapper = JoystickMapper::new(JoystickLayout::Onboard);
        let samples = [512, -40, 3000, 17, 999, -32768, 32767, 0, 1, -1];
        for &sample in &samples {
            mapper.process_event(&make_axis_event(AbsoluteAxisType::ABS_Z, sample));
            mapper.process_event(&make_axis_event(AbsoluteAxisType::ABS_RX, sample));
            for value in mapper.axes().values() {
                assert!((-1.0..=1.0).contains(&value), "{} out of range", value);
            }
        }
    }

    #[test]
    fn test_range_contains_all_samples() {
        let mut mapper = JoystickMapper::new(JoystickLayout::Desktop);
        let samples = [300, 120, 700, 450, 90, 1023];
        for &sample in &samples {
            mapper.process_event(&make_axis_event(AbsoluteAxisType::ABS_RX, sample));
        }
        let range = mapper.steer_range().unwrap();
        for &sample in &samples {
            assert!(range.min() <= sample && sample <= range.max());
        }
    }

    #[test]
    fn test_flipped_trigger_drives_negative_accel() {
        let mut mapper = JoystickMapper::new(JoystickLayout::Desktop);

        // Main trigger teaches [0, 255]
        mapper.process_event(&make_axis_event(AbsoluteAxisType::ABS_Z, 0));
        mapper.process_event(&make_axis_event(AbsoluteAxisType::ABS_Z, 255));

        // Second trigger fully pressed lands at -255 on the same axis
        assert!(mapper.process_event(&make_axis_event(AbsoluteAxisType::ABS_RZ, 255)));

        let range = mapper.accel_range().unwrap();
        assert_eq!((range.min(), range.max()), (-255, 255));
        assert!((mapper.axes().get("ABS_Z").unwrap() - 1.0).abs() < 0.0001);
        assert_eq!(mapper.axes().get("ABS_RZ"), None);
    }

    #[test]
    fn test_flipped_channel_onboard() {
        let mut mapper = JoystickMapper::new(JoystickLayout::Onboard);
        assert!(mapper.process_event(&make_axis_event(AbsoluteAxisType::ABS_RY, 10)));
        assert_eq!(mapper.accel_range(), Some(CalibrationRange::new(-10)));
    }

    #[test]
    fn test_untracked_axis_ignored() {
        let mut mapper = JoystickMapper::new(JoystickLayout::Desktop);
        assert!(!mapper.process_event(&make_axis_event(AbsoluteAxisType::ABS_X, 200)));
        assert!(!mapper.process_event(&make_axis_event(AbsoluteAxisType::ABS_HAT0Y, -1)));
        assert_eq!(mapper.axes().values(), vec![0.0, 0.0]);
        assert!(mapper.accel_range().is_none());
        assert!(mapper.steer_range().is_none());
    }

    #[test]
    fn test_sync_event_ignored() {
        let mut mapper = JoystickMapper::new(JoystickLayout::Desktop);
        let sync = InputEvent::new(EventType::SYNCHRONIZATION, 0, 0);
        assert!(!mapper.process_event(&sync));
    }

    // ==================== Cancel Button Tests ====================

    #[test]
    fn test_cancel_button_edges() {
        let mut mapper = JoystickMapper::new(JoystickLayout::Desktop);

        assert!(mapper.process_event(&make_key_event(Key::BTN_NORTH, 1)));
        assert!(mapper.cancel());

        // Autorepeat keeps the held state
        assert!(mapper.process_event(&make_key_event(Key::BTN_NORTH, 2)));
        assert!(mapper.cancel());

        assert!(mapper.process_event(&make_key_event(Key::BTN_NORTH, 0)));
        assert!(!mapper.cancel());
    }

    #[test]
    fn test_other_buttons_ignored() {
        let mut mapper = JoystickMapper::new(JoystickLayout::Desktop);
        assert!(!mapper.process_event(&make_key_event(Key::BTN_SOUTH, 1)));
        assert!(!mapper.cancel());
    }

    // ==================== Reset Tests ====================

    #[test]
    fn test_reset_keeps_ranges() {
        let mut mapper = JoystickMapper::new(JoystickLayout::Desktop);
        mapper.process_event(&make_axis_event(AbsoluteAxisType::ABS_Z, 0));
        mapper.process_event(&make_axis_event(AbsoluteAxisType::ABS_Z, 255));
        mapper.process_event(&make_key_event(Key::BTN_NORTH, 1));

        mapper.reset();
        assert_eq!(mapper.axes().values(), vec![0.0, 0.0]);
        assert!(!mapper.cancel());

        let range = mapper.accel_range().unwrap();
        assert_eq!((range.min(), range.max()), (0, 255));
    }

    #[test]
    fn test_axis_name() {
        assert_eq!(axis_name(AbsoluteAxisType::ABS_Z), "ABS_Z");
        assert_eq!(axis_name(AbsoluteAxisType::ABS_RX), "ABS_RX");
        assert_eq!(axis_name(AbsoluteAxisType::ABS_HAT0X), "ABS_OTHER");
    }
}
