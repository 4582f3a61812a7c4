use std::time::{Duration, Instant};

use crate::error::{Error, Result};

/// Turn a timeout in whole seconds into an absolute deadline.
///
/// `0` means wait forever (`None`). Negative timeouts are rejected before
/// any blocking state exists.
pub fn deadline_from_secs(secs: i64, now: Instant) -> Result<Option<Instant>> {
    if secs < 0 {
        return Err(Error::NegativeTimeout);
    }
    if secs == 0 {
        return Ok(None);
    }
    now.checked_add(Duration::from_secs(secs as u64))
        .map(Some)
        .ok_or(Error::InvalidTimeout)
}

/// Parse a raw timeout argument (decimal seconds) into a deadline.
pub fn parse_timeout(arg: &[u8], now: Instant) -> Result<Option<Instant>> {
    let secs = std::str::from_utf8(arg)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or(Error::InvalidTimeout)?;
    deadline_from_secs(secs, now)
}
