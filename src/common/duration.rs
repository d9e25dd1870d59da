use std::time::Duration;

use crate::common::error::BoardError;

/// Parses the compact timer format accepted by the server: digits followed by
/// `m` and/or `s`, minutes first (`5m`, `30s`, `5m30s`).
pub fn parse_timer_duration(input: &str) -> Result<Duration, BoardError> {
    let invalid = || BoardError::InvalidDuration(input.to_string());
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(invalid());
    }

    let mut minutes: Option<u64> = None;
    let mut seconds: Option<u64> = None;
    let mut digits = String::new();

    for ch in trimmed.chars() {
        match ch {
            '0'..='9' => digits.push(ch),
            'm' => {
                // minutes must come first and only once
                if digits.is_empty() || minutes.is_some() || seconds.is_some() {
                    return Err(invalid());
                }
                minutes = Some(digits.parse().map_err(|_| invalid())?);
                digits.clear();
            }
            's' => {
                if digits.is_empty() || seconds.is_some() {
                    return Err(invalid());
                }
                seconds = Some(digits.parse().map_err(|_| invalid())?);
                digits.clear();
            }
            _ => return Err(invalid()),
        }
    }

    // trailing digits without a unit
    if !digits.is_empty() {
        return Err(invalid());
    }

    let total = minutes
        .unwrap_or(0)
        .checked_mul(60)
        .and_then(|m| m.checked_add(seconds.unwrap_or(0)))
        .ok_or_else(invalid)?;
    if total == 0 {
        return Err(invalid());
    }
    Ok(Duration::from_secs(total))
}
