use std::time::{SystemTime, UNIX_EPOCH};

/// Current unix time in milliseconds. Clocks before the epoch read as 0.
pub fn unix_time_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_time_ms_advances() {
        let a = unix_time_ms();
        let b = unix_time_ms();
        assert!(b >= a);
        // Sanity: later than 2020-01-01.
        assert!(a > 1_577_836_800_000);
    }
}
