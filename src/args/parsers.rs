use std::time::Duration;

use crate::error::{AppError, AppResult, ValidationError};

/// Unit suffixes accepted on duration flags, with their millisecond scale.
/// `ms` is listed before `s` so it wins the suffix match.
const DURATION_UNITS_MS: [(&str, u64); 4] =
    [("ms", 1), ("s", 1_000), ("m", 60_000), ("h", 3_600_000)];

pub(super) fn parse_duration_arg(s: &str) -> AppResult<Duration> {
    parse_duration_value(s).map_err(AppError::from)
}

/// Parses `<digits>[unit]` durations. A bare number means seconds; supported
/// units are ms, s, m, and h. Zero durations are rejected.
pub(crate) fn parse_duration_value(s: &str) -> Result<Duration, ValidationError> {
    let text = s.trim();
    let (digits, scale_ms) = DURATION_UNITS_MS
        .iter()
        .find_map(|&(suffix, scale)| text.strip_suffix(suffix).map(|rest| (rest, scale)))
        .unwrap_or((text, 1_000));

    if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(ValidationError::InvalidDuration {
            value: s.to_owned(),
        });
    }
    // All-digits is checked above, so the only way parse fails is overflow.
    let amount: u64 = digits.parse().ok().ok_or(ValidationError::DurationOverflow)?;

    let millis = amount
        .checked_mul(scale_ms)
        .ok_or(ValidationError::DurationOverflow)?;
    if millis == 0 {
        return Err(ValidationError::DurationZero);
    }
    Ok(Duration::from_millis(millis))
}
