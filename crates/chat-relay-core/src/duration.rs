//! Duration expressions typed by chat users.
//!
//! A duration is one or more `<number><unit>` terms, e.g. `10s`, `5m`,
//! `1h30m` or `1.5h`. Valid units are `ns`, `us` (or `µs`/`μs`), `ms`, `s`,
//! `m` and `h`. A bare `0` is the only unit-less value accepted.
//!
//! [`format_duration`] renders the canonical short form used in replies, so
//! `parse_duration("90s")` is shown back to the user as `1m30s`.

use std::time::Duration;

const NANOS_PER_MICRO: u64 = 1_000;
const NANOS_PER_MILLI: u64 = 1_000_000;
const NANOS_PER_SECOND: u64 = 1_000_000_000;
const NANOS_PER_MINUTE: u64 = 60 * NANOS_PER_SECOND;
const NANOS_PER_HOUR: u64 = 60 * NANOS_PER_MINUTE;

/// Largest accepted total, roughly 2,562,047 hours.
const MAX_TOTAL_NANOS: u64 = i64::MAX as u64;

/// Errors produced while parsing a duration expression.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DurationParseError {
    #[error("empty duration")]
    Empty,

    #[error("invalid duration {input:?}")]
    Invalid { input: String },

    #[error("missing unit in duration {input:?}")]
    MissingUnit { input: String },

    #[error("unknown unit {unit:?} in duration {input:?}")]
    UnknownUnit { unit: String, input: String },

    #[error("negative duration {input:?}")]
    Negative { input: String },

    #[error("duration {input:?} is too large")]
    Overflow { input: String },
}

/// Parse a duration expression such as `10s` or `1h15m`.
///
/// Surrounding whitespace is ignored. A leading `+` is accepted; a leading
/// `-` is rejected because a delay cannot run backwards.
pub fn parse_duration(input: &str) -> Result<Duration, DurationParseError> {
    let original = input.trim();
    let invalid = || DurationParseError::Invalid {
        input: original.to_string(),
    };

    let mut rest = original;
    if rest.is_empty() {
        return Err(DurationParseError::Empty);
    }

    if let Some(stripped) = rest.strip_prefix('-') {
        if stripped.is_empty() {
            return Err(invalid());
        }
        return Err(DurationParseError::Negative {
            input: original.to_string(),
        });
    }
    if let Some(stripped) = rest.strip_prefix('+') {
        rest = stripped;
    }

    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(invalid());
    }

    let overflow = || DurationParseError::Overflow {
        input: original.to_string(),
    };

    let mut total: u64 = 0;
    while !rest.is_empty() {
        if !rest.starts_with(|c: char| c == '.' || c.is_ascii_digit()) {
            return Err(invalid());
        }

        // Integer part
        let int_len = leading_digits(rest);
        let (int_digits, tail) = rest.split_at(int_len);
        rest = tail;
        let whole = if int_digits.is_empty() {
            0
        } else {
            int_digits.parse::<u64>().map_err(|_| overflow())?
        };

        // Fractional part
        let mut fraction: u128 = 0;
        let mut scale: u128 = 1;
        let mut has_fraction = false;
        if let Some(after_dot) = rest.strip_prefix('.') {
            let frac_len = leading_digits(after_dot);
            let (frac_digits, tail) = after_dot.split_at(frac_len);
            rest = tail;
            has_fraction = frac_len > 0;
            // Digits beyond nanosecond precision of the largest unit are dropped
            for digit in frac_digits.bytes().take(20) {
                fraction = fraction * 10 + u128::from(digit - b'0');
                scale *= 10;
            }
        }

        if int_digits.is_empty() && !has_fraction {
            return Err(invalid());
        }

        // Unit
        let unit_len = rest
            .find(|c: char| c == '.' || c.is_ascii_digit())
            .unwrap_or(rest.len());
        if unit_len == 0 {
            return Err(DurationParseError::MissingUnit {
                input: original.to_string(),
            });
        }
        let (unit, tail) = rest.split_at(unit_len);
        rest = tail;
        let unit_nanos = unit_in_nanos(unit).ok_or_else(|| DurationParseError::UnknownUnit {
            unit: unit.to_string(),
            input: original.to_string(),
        })?;

        let term = whole.checked_mul(unit_nanos).ok_or_else(overflow)?;
        let fraction_nanos = u64::try_from(fraction * u128::from(unit_nanos) / scale)
            .map_err(|_| overflow())?;
        let term = term.checked_add(fraction_nanos).ok_or_else(overflow)?;
        total = total.checked_add(term).ok_or_else(overflow)?;
        if total > MAX_TOTAL_NANOS {
            return Err(overflow());
        }
    }

    Ok(Duration::from_nanos(total))
}

/// Render a duration in its canonical short form.
///
/// Durations of a second or more use `h`, `m` and `s` terms (`1h0m0s`,
/// `1m30s`, `2.5s`); shorter ones use the largest fitting sub-second unit
/// (`300ms`, `1.5µs`, `12ns`).
pub fn format_duration(duration: Duration) -> String {
    let nanos = duration.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }

    if nanos < u128::from(NANOS_PER_SECOND) {
        let (unit, suffix) = if nanos < u128::from(NANOS_PER_MICRO) {
            (1, "ns")
        } else if nanos < u128::from(NANOS_PER_MILLI) {
            (u128::from(NANOS_PER_MICRO), "µs")
        } else {
            (u128::from(NANOS_PER_MILLI), "ms")
        };
        return format!("{}{}", decimal(nanos, unit), suffix);
    }

    let second = u128::from(NANOS_PER_SECOND);
    let total_seconds = nanos / second;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds / 60) % 60;
    let seconds = decimal((total_seconds % 60) * second + nanos % second, second);

    if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{seconds}s")
    }
}

fn leading_digits(s: &str) -> usize {
    s.bytes().take_while(u8::is_ascii_digit).count()
}

fn unit_in_nanos(unit: &str) -> Option<u64> {
    match unit {
        "ns" => Some(1),
        "us" | "µs" | "μs" => Some(NANOS_PER_MICRO),
        "ms" => Some(NANOS_PER_MILLI),
        "s" => Some(NANOS_PER_SECOND),
        "m" => Some(NANOS_PER_MINUTE),
        "h" => Some(NANOS_PER_HOUR),
        _ => None,
    }
}

/// `value / unit` as a decimal string without trailing fractional zeros.
/// `unit` must be a power of ten.
fn decimal(value: u128, unit: u128) -> String {
    let whole = value / unit;
    let remainder = value % unit;
    if remainder == 0 {
        return whole.to_string();
    }

    let width = unit.to_string().len() - 1;
    let fraction = format!("{remainder:0width$}");
    format!("{whole}.{}", fraction.trim_end_matches('0'))
}

#[cfg(test)]
#[path = "duration_tests.rs"]
mod tests;
