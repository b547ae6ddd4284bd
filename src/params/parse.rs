//! Text-to-sequence parsing and per-axis numeric casts

use crate::{Error, Result};

/// Decimal places range values are rounded to.
const RANGE_PRECISION: f64 = 1e8;

/// Expand a compact parameter spec into ordered text tokens.
///
/// The input is split on `+`; each segment contributes, in order, either an
/// inclusive `<start>-<end>:<step>` range, a comma-separated list of trimmed
/// literals, or the trimmed segment itself. Blank input yields no tokens.
#[must_use]
pub fn parse_input(input: &str) -> Vec<String> {
    let input = input.trim();
    if input.is_empty() {
        return Vec::new();
    }

    let mut tokens = Vec::new();
    for segment in input.split('+').map(str::trim) {
        if let Some((start, end, step)) = parse_range(segment) {
            tokens.extend(frange(start, end, step).into_iter().map(format_number));
        } else if segment.contains(',') {
            tokens.extend(segment.split(',').map(|s| s.trim().to_string()));
        } else {
            tokens.push(segment.to_string());
        }
    }
    tokens
}

/// `<start>-<end>:<step>`, or `None` if the segment is not a numeric range.
fn parse_range(segment: &str) -> Option<(f64, f64, f64)> {
    let (bounds, step) = segment.split_once(':')?;
    let (start, end) = bounds.split_once('-')?;
    Some((
        start.trim().parse().ok()?,
        end.trim().parse().ok()?,
        step.trim().parse().ok()?,
    ))
}

/// Inclusive arithmetic sequence from `start` to `end`, rounded to 8 decimals.
///
/// Empty when `start > end`, or when `step` is not strictly positive.
#[must_use]
pub fn frange(start: f64, end: f64, step: f64) -> Vec<f64> {
    if step <= 0.0 || !step.is_finite() {
        tracing::warn!(start, end, step, "range step must be positive; ignoring range");
        return Vec::new();
    }

    let mut values = Vec::new();
    let mut k = 0.0_f64;
    loop {
        let value = round8(k.mul_add(step, start));
        if value > end {
            break;
        }
        values.push(value);
        k += 1.0;
    }
    values
}

fn round8(value: f64) -> f64 {
    (value * RANGE_PRECISION).round() / RANGE_PRECISION
}

/// Integral values print without a fractional part (`3`, not `3.0`).
#[allow(clippy::cast_possible_truncation)]
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Cast a token for an integer-typed axis.
///
/// Integral decimal tokens such as `"4.0"` are accepted.
///
/// # Errors
///
/// Returns `Error::InvalidNumber` if the token is not an integer
#[allow(clippy::cast_possible_truncation)]
pub fn cast_int(axis: &'static str, token: &str) -> Result<i64> {
    let token = token.trim();
    if let Ok(value) = token.parse::<i64>() {
        return Ok(value);
    }
    match token.parse::<f64>() {
        Ok(value) if value.is_finite() && value.fract() == 0.0 => Ok(value as i64),
        _ => Err(Error::InvalidNumber {
            axis,
            value: token.to_string(),
        }),
    }
}

/// Cast a token for a float-typed axis.
///
/// # Errors
///
/// Returns `Error::InvalidNumber` if the token is not a finite number
pub fn cast_float(axis: &'static str, token: &str) -> Result<f64> {
    let token = token.trim();
    match token.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(Error::InvalidNumber {
            axis,
            value: token.to_string(),
        }),
    }
}
