//! Human-readable durations such as `24h` or `7d`.

use crate::{Error, Result};

const HOUR: u64 = 3600;
const DAY: u64 = 24 * HOUR;

/// Inclusive range of accepted durations, in seconds.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Bounds {
    /// Smallest accepted value.
    pub min: u64,

    /// Largest accepted value.
    pub max: u64,
}

/// Accepted lifetimes for a migration setup key.
pub const SETUP_KEY_BOUNDS: Bounds = Bounds {
    min: HOUR,
    max: 365 * DAY,
};

/// Parses `<integer>[h|d]` into seconds. A bare integer is taken as seconds.
///
/// # Errors
///
/// `Error::Validation` if the unit is unknown, the value is not a positive
/// integer, or the result falls outside `bounds`.
pub fn parse(text: &str, bounds: Option<Bounds>) -> Result<u64> {
    let text = text.trim();
    let (digits, multiplier) = match text.char_indices().last() {
        None => return Err(Error::Validation("empty duration".to_string())),
        Some((idx, 'h')) => (&text[..idx], HOUR),
        Some((idx, 'd')) => (&text[..idx], DAY),
        Some((_, c)) if c.is_ascii_digit() => (text, 1),
        Some((_, c)) => {
            return Err(Error::Validation(format!(
                "unknown unit '{c}' in duration '{text}' (use h or d)"
            )));
        }
    };

    let value: i64 = digits
        .parse()
        .map_err(|_| Error::Validation(format!("invalid duration '{text}'")))?;

    if value <= 0 {
        return Err(Error::Validation(format!(
            "duration must be positive, got '{text}'"
        )));
    }

    let seconds = value
        .unsigned_abs()
        .checked_mul(multiplier)
        .ok_or_else(|| Error::Validation(format!("duration '{text}' is too large")))?;

    if let Some(Bounds { min, max }) = bounds {
        if seconds < min || seconds > max {
            return Err(Error::Validation(format!(
                "duration '{text}' must be between {} and {}",
                format(min),
                format(max)
            )));
        }
    }

    Ok(seconds)
}

/// Formats seconds using the largest unit that represents them exactly.
#[must_use]
pub fn format(seconds: u64) -> String {
    if seconds > 0 && seconds % DAY == 0 {
        format!("{}d", seconds / DAY)
    } else if seconds > 0 && seconds % HOUR == 0 {
        format!("{}h", seconds / HOUR)
    } else {
        seconds.to_string()
    }
}
