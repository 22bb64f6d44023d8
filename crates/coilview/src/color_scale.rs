//! Display range for the color mapping
//!
//! The automatic range clips singular regions (e.g. right next to a coil
//! wire) so the rest of the field stays readable. User overrides are typed
//! as arithmetic expressions and rounded to the display precision.

use serde::Serialize;
use tracing::debug;

use crate::error::{Result, ViewError};
use crate::expr::{self, ExprError};
use crate::sample::FieldSample;

/// `vmax / vmin` ratio above which the automatic range is clipped
pub const SINGULARITY_RATIO: f64 = 50.0;
/// Clipped automatic max, as a multiple of `vmin`
pub const CLIPPED_MAX_FACTOR: f64 = 5.0;
/// Digits after the decimal point in displayed bounds
pub const DISPLAY_DECIMALS: usize = 2;

/// Active display range and whether the data in the window exceeds it
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColorRange {
    pub min_val: f64,
    pub max_val: f64,
    /// Some sample lies at or below `min_val`
    pub clips_low: bool,
    /// Some sample lies at or above `max_val`
    pub clips_high: bool,
}

impl ColorRange {
    pub fn min_label(&self) -> String {
        format_sci(self.min_val)
    }

    pub fn max_label(&self) -> String {
        format_sci(self.max_val)
    }

    /// Normalized position of `value` inside the range, clamped to [0, 1]
    pub fn normalize(&self, value: f64) -> f64 {
        let span = self.max_val - self.min_val;
        if span > 0.0 {
            ((value - self.min_val) / span).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Range derived from the data itself
///
/// The flags here only report data strictly outside the range, so a range
/// that starts exactly at the data minimum does not claim to clip it.
pub fn auto_range(sample: &FieldSample) -> Result<ColorRange> {
    let (vmin, vmax) = sample.norm_extrema().ok_or(ViewError::EmptyWindow {
        rows: sample.rows(),
        cols: sample.cols(),
    })?;

    let raw_max = if vmax > SINGULARITY_RATIO * vmin {
        CLIPPED_MAX_FACTOR * vmin
    } else {
        vmax
    };
    // Store what the labels show so re-applying them is a no-op
    let min_val = round_finite(vmin);
    let max_val = round_finite(raw_max);

    let range = ColorRange {
        min_val,
        max_val,
        clips_low: vmin < min_val,
        clips_high: vmax > max_val,
    };
    debug!(vmin, vmax, max_val, "automatic color range");
    Ok(range)
}

/// Range typed by the user
///
/// Both bounds are evaluated, rounded to the display precision and checked
/// for order. On failure nothing changes for the caller.
pub fn apply_range(sample: &FieldSample, min_text: &str, max_text: &str) -> Result<ColorRange> {
    let max_val = parse_bound(max_text)?;
    let min_val = parse_bound(min_text)?;

    if max_val <= min_val {
        return Err(ViewError::InvalidRangeOrder {
            min: format_sci(min_val),
            max: format_sci(max_val),
        });
    }

    Ok(ColorRange {
        min_val,
        max_val,
        clips_low: sample.norm.iter().any(|&v| v <= min_val),
        clips_high: sample.norm.iter().any(|&v| v >= max_val),
    })
}

/// Evaluate a bound expression and round it through its display form
pub fn parse_bound(text: &str) -> Result<f64> {
    let value = expr::evaluate(text).map_err(|source| ViewError::InvalidNumericExpression {
        input: text.to_string(),
        source,
    })?;
    let rounded = round_display(value);
    if !rounded.is_finite() {
        return Err(ViewError::InvalidNumericExpression {
            input: text.to_string(),
            source: ExprError::NotFinite,
        });
    }
    Ok(rounded)
}

/// Display rounding, unless it would overflow to infinity
fn round_finite(value: f64) -> f64 {
    let rounded = round_display(value);
    if rounded.is_finite() {
        rounded
    } else {
        value
    }
}

/// Round to what [`format_sci`] shows
pub fn round_display(value: f64) -> f64 {
    format_sci(value).parse().unwrap_or(value)
}

/// Scientific notation with two decimals and a signed, two-digit exponent (`1.50e-03`)
pub fn format_sci(value: f64) -> String {
    if !value.is_finite() {
        return format!("{}", value);
    }
    let raw = format!("{:.*e}", DISPLAY_DECIMALS, value);
    match raw.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{}e{}{:02}", mantissa, sign, exp.abs())
        }
        None => raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::tests::grid;
    use pretty_assertions::assert_eq;

    fn sample_of(values: &[f64]) -> FieldSample {
        let z: Vec<f64> = (0..values.len()).map(|i| i as f64).collect();
        let norm: Vec<Vec<f64>> = values.iter().map(|&v| vec![v]).collect();
        FieldSample::from_axes(&z, &[0.0], &norm).unwrap()
    }

    #[test]
    fn test_format_sci() {
        assert_eq!(format_sci(0.001), "1.00e-03");
        assert_eq!(format_sci(5.0), "5.00e+00");
        assert_eq!(format_sci(-12340.0), "-1.23e+04");
        assert_eq!(format_sci(0.0), "0.00e+00");
        assert_eq!(format_sci(9.999), "1.00e+01");
        assert_eq!(format_sci(1.5e-120), "1.50e-120");
    }

    #[test]
    fn test_format_round_trip() {
        for x in [1.0, 0.5, 123.456, -7.77e-9, 3.14159e20, 1e-300, 0.0] {
            let once = format_sci(x);
            let again = format_sci(once.parse::<f64>().unwrap());
            assert_eq!(once, again);
            assert_eq!(round_display(x), once.parse::<f64>().unwrap());
        }
        // Rounds up past f64::MAX
        assert_eq!(format_sci(1.797e308), "1.80e+308");
        assert!(round_display(1.797e308).is_infinite());
    }

    #[test]
    fn test_auto_range_clips_singularity() {
        let range = auto_range(&sample_of(&[1.0, 2.0, 100.0])).unwrap();
        assert_eq!(range.min_val, 1.0);
        assert_eq!(range.max_val, 5.0);
        assert!(range.clips_high);
        assert!(!range.clips_low);
    }

    #[test]
    fn test_auto_range_keeps_moderate_data() {
        let range = auto_range(&sample_of(&[2.0, 3.0, 50.0])).unwrap();
        assert_eq!(range.min_val, 2.0);
        assert_eq!(range.max_val, 50.0);
        assert!(!range.clips_high);
        assert!(!range.clips_low);
    }

    #[test]
    fn test_auto_range_never_inverted() {
        let data = grid((0.0, 1.0, 5), (0.0, 1.0, 5), |z, r| 1e-3 + z * z + r);
        let range = auto_range(&data.sample).unwrap();
        assert!(range.max_val >= range.min_val);
        assert_eq!(range.max_val, round_display(5.0 * 1e-3));

        let zero = auto_range(&sample_of(&[0.0, 1.0])).unwrap();
        assert_eq!(zero.max_val, 0.0);
        assert!(zero.max_val >= zero.min_val);
    }

    #[test]
    fn test_auto_range_matches_labels() {
        let vmin = 1.234567;
        let s = sample_of(&[vmin, 2.0, 500.0]);
        let range = auto_range(&s).unwrap();
        assert_eq!(range.min_val, 1.23);
        assert_eq!(range.max_val, round_display(5.0 * vmin));
        assert_eq!(range.max_label(), "6.17e+00");
        assert!(range.clips_high);
        assert!(!range.clips_low);

        let again = apply_range(&s, &range.min_label(), &range.max_label()).unwrap();
        assert_eq!((again.min_val, again.max_val), (range.min_val, range.max_val));
    }

    #[test]
    fn test_auto_range_empty() {
        let empty = sample_of(&[1.0, 2.0]).block(1, 0, 0, 0);
        assert!(matches!(auto_range(&empty), Err(ViewError::EmptyWindow { .. })));
    }

    #[test]
    fn test_apply_range_flags() {
        let s = sample_of(&[1.0, 2.0, 100.0]);
        let r = apply_range(&s, "1", "1e-3*5e3").unwrap();
        assert_eq!((r.min_val, r.max_val), (1.0, 5.0));
        assert!(r.clips_low);
        assert!(r.clips_high);

        let r = apply_range(&s, "0.5", "200").unwrap();
        assert!(!r.clips_low);
        assert!(!r.clips_high);
    }

    #[test]
    fn test_apply_range_rounds_to_display() {
        let s = sample_of(&[1.0]);
        let r = apply_range(&s, "1/3", "2/3").unwrap();
        assert_eq!(r.min_val, 3.33e-1);
        assert_eq!(r.max_label(), "6.67e-01");
    }

    #[test]
    fn test_apply_range_idempotent() {
        let s = sample_of(&[1.0, 4.0, 9.0]);
        let a = apply_range(&s, "2", "8").unwrap();
        let b = apply_range(&s, &a.min_label(), &a.max_label()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_apply_range_rejects_inverted() {
        let s = sample_of(&[1.0, 4.0]);
        let err = apply_range(&s, "5", "3").unwrap_err();
        assert!(matches!(err, ViewError::InvalidRangeOrder { .. }));
        // Equal after rounding
        let err = apply_range(&s, "1.001", "1.002").unwrap_err();
        assert!(matches!(err, ViewError::InvalidRangeOrder { .. }));
    }

    #[test]
    fn test_apply_range_rejects_garbage() {
        let s = sample_of(&[1.0]);
        let err = apply_range(&s, "0", "max(norm)").unwrap_err();
        assert!(matches!(err, ViewError::InvalidNumericExpression { .. }));
    }

    #[test]
    fn test_apply_range_rejects_overflowing_bound() {
        let s = sample_of(&[1.0]);
        let err = apply_range(&s, "0", "1.797e308").unwrap_err();
        assert!(matches!(
            err,
            ViewError::InvalidNumericExpression { source: ExprError::NotFinite, .. }
        ));
        assert!(apply_range(&s, "0", "1.7e308").unwrap().max_val.is_finite());
    }

    #[test]
    fn test_normalize() {
        let r = ColorRange { min_val: 1.0, max_val: 3.0, clips_low: false, clips_high: false };
        assert_eq!(r.normalize(2.0), 0.5);
        assert_eq!(r.normalize(10.0), 1.0);
        assert_eq!(r.normalize(-1.0), 0.0);
        let flat = ColorRange { max_val: 1.0, ..r };
        assert_eq!(flat.normalize(5.0), 0.0);
    }
}
