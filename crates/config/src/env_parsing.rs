use anyhow::{anyhow, Result};
use std::time::Duration;

pub(crate) fn parse_env_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parses human-readable durations of the form `300ms`, `10s`, `5m`, `1.5h`.
/// A bare number is rejected so that misconfigured millisecond/second values
/// fail loudly instead of silently picking a unit.
pub(crate) fn parse_duration(value: &str) -> Result<Duration> {
    let value = value.trim();
    if value.is_empty() {
        return Err(anyhow!("empty duration"));
    }

    let (number, unit) = match value.find(|c: char| c.is_ascii_alphabetic()) {
        Some(idx) => value.split_at(idx),
        None => return Err(anyhow!("duration {:?} is missing a unit (ms, s, m, h)", value)),
    };

    let quantity: f64 = number
        .trim()
        .parse()
        .map_err(|_| anyhow!("invalid duration value {:?}", value))?;
    if !quantity.is_finite() || quantity < 0.0 {
        return Err(anyhow!("invalid duration value {:?}", value));
    }

    let millis = match unit.trim() {
        "ms" => quantity,
        "s" => quantity * 1_000.0,
        "m" => quantity * 60_000.0,
        "h" => quantity * 3_600_000.0,
        other => return Err(anyhow!("unknown duration unit {:?} in {:?}", other, value)),
    };

    Ok(Duration::from_millis(millis.round() as u64))
}
