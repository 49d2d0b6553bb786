//! # Calibration Module
//!
//! Range tracking, deadzone and response shaping for raw joystick axes.
//!
//! ## Range Tracking
//!
//! Joysticks report raw integers over a device-specific range that is not
//! known up front. [`CalibrationRange`] starts at the first observed sample
//! and widens to include every later sample, so the full travel is learned
//! the first time the stick reaches each end.
//!
//! ## Deadzone
//!
//! Values with magnitude at or below the deadzone are forced to exactly 0.0,
//! suppressing sensor noise around the resting position. Values outside are
//! passed through unscaled.
//!
//! ## Response Curve
//!
//! The formula used is: `output = expo * input³ + (1 - expo) * input`
//!
//! The cubic term flattens the response around center for fine control while
//! keeping full deflection reachable at the ends.
//!
//! ## Usage
//!
//! ```
//! use joystick_control::controller::calibration::{CalibrationRange, ResponseCurve};
//!
//! let mut range = CalibrationRange::new(0);
//! range.observe(255);
//!
//! let curve = ResponseCurve::default();
//! let norm = -range.normalize(255);
//! assert!((curve.apply(norm) - (-1.0)).abs() < 0.001);
//! ```

/// Deadzone applied to normalized joystick axes.
pub const DEADZONE: f32 = 0.03;

/// Cubic blend factor of the response curve.
pub const EXPO: f32 = 0.4;

/// Applies [`DEADZONE`] and the [`EXPO`] cubic response curve to a
/// normalized input.
///
/// Input and output are in the range -1.0 to 1.0, where 0.0 is center.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResponseCurve;

impl ResponseCurve {
    /// Applies deadzone and expo curve to a normalized input.
    ///
    /// # Examples
    ///
    /// ```
    /// use joystick_control::controller::calibration::ResponseCurve;
    ///
    /// let curve = ResponseCurve::default();
    ///
    /// // Within deadzone
    /// assert_eq!(curve.apply(0.03), 0.0);
    /// assert_eq!(curve.apply(-0.02), 0.0);
    ///
    /// // Less action near center, full deflection preserved
    /// assert!(curve.apply(0.5) < 0.5);
    /// assert!((curve.apply(1.0) - 1.0).abs() < 0.001);
    /// ```
    #[must_use]
    pub fn apply(&self, input: f32) -> f32 {
        if input.abs() <= DEADZONE {
            return 0.0;
        }

        let cubic = EXPO * input * input * input;
        let linear = (1.0 - EXPO) * input;
        (cubic + linear).clamp(-1.0, 1.0)
    }
}

/// Running bounds of the raw samples seen on one axis.
///
/// The range is only ever widened, never narrowed or reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationRange {
    min: i32,
    max: i32,
}

impl CalibrationRange {
    /// Starts a range at the first observed sample.
    #[must_use]
    pub fn new(first_sample: i32) -> Self {
        Self {
            min: first_sample,
            max: first_sample,
        }
    }

    #[must_use]
    pub fn min(&self) -> i32 {
        self.min
    }

    #[must_use]
    pub fn max(&self) -> i32 {
        self.max
    }

    /// Widens the range to include `sample`.
    pub fn observe(&mut self, sample: i32) {
        self.min = self.min.min(sample);
        self.max = self.max.max(sample);
    }

    /// Maps `sample` linearly from `[min, max]` onto -1.0..=1.0.
    ///
    /// Samples outside the range clamp to the nearest end. A range that has
    /// only seen a single value maps everything to 0.0.
    ///
    /// # Examples
    ///
    /// ```
    /// use joystick_control::controller::calibration::CalibrationRange;
    ///
    /// let mut range = CalibrationRange::new(100);
    /// assert_eq!(range.normalize(100), 0.0);
    ///
    /// range.observe(200);
    /// assert_eq!(range.normalize(100), -1.0);
    /// assert_eq!(range.normalize(150), 0.0);
    /// assert_eq!(range.normalize(200), 1.0);
    /// ```
    #[must_use]
    pub fn normalize(&self, sample: i32) -> f32 {
        if self.max == self.min {
            return 0.0;
        }

        let span = f64::from(self.max) - f64::from(self.min);
        let position = (f64::from(sample) - f64::from(self.min)) / span;
        ((position * 2.0 - 1.0) as f32).clamp(-1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== ResponseCurve Tests ====================

    #[test]
    fn test_curve_constants() {
        assert_eq!(DEADZONE, 0.03);
        assert_eq!(EXPO, 0.4);
    }

    #[test]
    fn test_curve_at_known_points() {
        let curve = ResponseCurve::default();
        // 0.4 * 0.125 + 0.6 * 0.5
        assert!((curve.apply(0.5) - 0.35).abs() < 0.0001);
        assert!((curve.apply(-0.5) - (-0.35)).abs() < 0.0001);
        assert!((curve.apply(1.0) - 1.0).abs() < 0.0001);
    }

    #[test]
    fn test_deadzone_forces_exact_zero() {
        let curve = ResponseCurve::default();
        for i in 0..=300 {
            let input = i as f32 / 10_000.0; // 0.0 ..= 0.03
            assert_eq!(curve.apply(input), 0.0, "input {} should be in deadzone", input);
            assert_eq!(curve.apply(-input), 0.0, "input {} should be in deadzone", -input);
        }
    }

    #[test]
    fn test_outside_deadzone_not_rescaled() {
        let curve = ResponseCurve::default();
        let input = 0.031_f32;
        let expected = 0.4 * input * input * input + 0.6 * input;
        assert!((curve.apply(input) - expected).abs() < 1e-6);
        assert!(curve.apply(input) > 0.0);
    }

    #[test]
    fn test_curve_known_values() {
        let curve = ResponseCurve::default();
        // 0.4 * 0.125 + 0.6 * 0.5 = 0.35
        assert!((curve.apply(0.5) - 0.35).abs() < 1e-6);
        assert!((curve.apply(-0.5) - (-0.35)).abs() < 1e-6);
    }

    #[test]
    fn test_curve_preserves_endpoints() {
        let curve = ResponseCurve::default();
        assert!((curve.apply(1.0) - 1.0).abs() < 0.0001);
        assert!((curve.apply(-1.0) - (-1.0)).abs() < 0.0001);
        assert_eq!(curve.apply(0.0), 0.0);
    }

    #[test]
    fn test_curve_is_odd_symmetric() {
        let curve = ResponseCurve::default();
        for i in -100..=100 {
            let x = i as f32 / 100.0;
            assert_eq!(curve.apply(-x), -curve.apply(x), "asymmetric at {}", x);
        }
    }

    #[test]
    fn test_curve_output_bounded() {
        let curve = ResponseCurve::default();
        for i in -1000..=1000 {
            let y = curve.apply(i as f32 / 1000.0);
            assert!((-1.0..=1.0).contains(&y));
        }
    }

    #[test]
    fn test_curve_monotonic() {
        let curve = ResponseCurve::default();
        let mut previous = curve.apply(-1.0);
        for i in -99..=100 {
            let y = curve.apply(i as f32 / 100.0);
            assert!(y >= previous);
            previous = y;
        }
    }

    // ==================== CalibrationRange Tests ====================

    #[test]
    fn test_range_starts_at_first_sample() {
        let range = CalibrationRange::new(100);
        assert_eq!(range.min(), 100);
        assert_eq!(range.max(), 100);
    }

    #[test]
    fn test_range_only_widens() {
        let mut range = CalibrationRange::new(100);
        range.observe(150);
        assert_eq!((range.min(), range.max()), (100, 150));

        range.observe(120); // Inside, nothing changes
        assert_eq!((range.min(), range.max()), (100, 150));

        range.observe(20);
        assert_eq!((range.min(), range.max()), (20, 150));
    }

    #[test]
    fn test_range_contains_every_sample() {
        let samples = [512, 300, 900, 0, 1023, 700, 5];
        let mut range = CalibrationRange::new(samples[0]);
        for (n, &sample) in samples.iter().enumerate() {
            range.observe(sample);
            for &seen in &samples[..=n] {
                assert!(range.min() <= seen && seen <= range.max());
            }
        }
    }

    #[test]
    fn test_normalize_degenerate_range() {
        let range = CalibrationRange::new(42);
        assert_eq!(range.normalize(42), 0.0);
    }

    #[test]
    fn test_normalize_endpoints_and_midpoint() {
        let mut range = CalibrationRange::new(0);
        range.observe(255);
        assert_eq!(range.normalize(0), -1.0);
        assert_eq!(range.normalize(255), 1.0);
        assert!(range.normalize(128).abs() < 0.01);
    }

    #[test]
    fn test_normalize_negative_range() {
        let mut range = CalibrationRange::new(-255);
        range.observe(0);
        assert_eq!(range.normalize(-255), -1.0);
        assert_eq!(range.normalize(0), 1.0);
    }

    #[test]
    fn test_normalize_clamps_outside_samples() {
        let mut range = CalibrationRange::new(10);
        range.observe(20);
        assert_eq!(range.normalize(0), -1.0);
        assert_eq!(range.normalize(30), 1.0);
    }

    #[test]
    fn test_normalize_wide_i32_range() {
        let mut range = CalibrationRange::new(i32::MIN);
        range.observe(i32::MAX);
        assert_eq!(range.normalize(i32::MIN), -1.0);
        assert_eq!(range.normalize(i32::MAX), 1.0);
    }

    // ==================== Pipeline Tests ====================

    #[test]
    fn test_full_pipeline() {
        let curve = ResponseCurve::default();
        let mut range = CalibrationRange::new(100);
        range.observe(150);
        range.observe(200);

        assert_eq!((range.min(), range.max()), (100, 200));

        // Mid-range lands in the deadzone
        assert_eq!(curve.apply(-range.normalize(150)), 0.0);

        // Ends reach full deflection with inverted polarity
        assert!((curve.apply(-range.normalize(200)) - (-1.0)).abs() < 0.0001);
        assert!((curve.apply(-range.normalize(100)) - 1.0).abs() < 0.0001);
    }
}
