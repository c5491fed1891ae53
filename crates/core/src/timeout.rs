//! Per-job timeout resolution and poll-budget arithmetic.
//!
//! The resolved timeout bounds both the adapter's HTTP client timeout and
//! the total wall-clock budget of the poll loop.

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Fallback timeout when settings are missing or below the floor.
pub const DEFAULT_TIMEOUT_SECS: i64 = 600;

/// Configured timeouts below this floor are treated as corrupt and replaced
/// by [`DEFAULT_TIMEOUT_SECS`].
pub const MIN_TIMEOUT_SECS: i64 = 30;

/// Seconds slept between poll attempts.
pub const POLL_INTERVAL_SECS: i64 = 2;

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Resolve the effective timeout from a configured value.
///
/// `None` or anything below [`MIN_TIMEOUT_SECS`] falls back to the default.
pub fn effective_timeout_secs(configured: Option<i64>) -> i64 {
    match configured {
        Some(secs) if secs >= MIN_TIMEOUT_SECS => secs,
        _ => DEFAULT_TIMEOUT_SECS,
    }
}

/// Number of poll attempts that fit in `timeout_secs`.
///
/// `ceil(timeout / poll interval)`, never less than 1.
pub fn max_poll_attempts(timeout_secs: i64) -> i64 {
    let mut attempts = timeout_secs / POLL_INTERVAL_SECS;
    if timeout_secs % POLL_INTERVAL_SECS != 0 {
        attempts += 1;
    }
    attempts.max(1)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_value_above_floor_is_kept() {
        assert_eq!(effective_timeout_secs(Some(300)), 300);
        assert_eq!(effective_timeout_secs(Some(MIN_TIMEOUT_SECS)), MIN_TIMEOUT_SECS);
    }

    #[test]
    fn below_floor_falls_back_to_default() {
        assert_eq!(effective_timeout_secs(Some(29)), DEFAULT_TIMEOUT_SECS);
        assert_eq!(effective_timeout_secs(Some(0)), DEFAULT_TIMEOUT_SECS);
        assert_eq!(effective_timeout_secs(Some(-5)), DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn missing_value_falls_back_to_default() {
        assert_eq!(effective_timeout_secs(None), DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn attempts_round_up_on_odd_timeout() {
        assert_eq!(max_poll_attempts(601), 301);
    }

    #[test]
    fn attempts_exact_division() {
        assert_eq!(max_poll_attempts(30), 15);
        assert_eq!(max_poll_attempts(DEFAULT_TIMEOUT_SECS), 300);
    }

    #[test]
    fn attempts_never_below_one() {
        assert_eq!(max_poll_attempts(0), 1);
        assert_eq!(max_poll_attempts(1), 1);
    }
}
