//! Small numeric helpers shared across nutri_core.

/// Number of milliseconds in one second.
pub const MILLIS_PER_SEC: u64 = 1_000;

/// Sampling period in milliseconds for a rate in Hz.
/// - Clamps `hz` to at least 1.
/// - Result is at least 1 ms.
#[inline]
pub fn period_ms(hz: u32) -> u64 {
    (MILLIS_PER_SEC / u64::from(hz.max(1))).max(1)
}

/// Round half away from zero to one decimal place.
#[inline]
pub fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_clamps_zero_hz() {
        assert_eq!(period_ms(0), 1000);
        assert_eq!(period_ms(10), 100);
        assert_eq!(period_ms(5000), 1);
    }

    #[test]
    fn round1_matches_display_rounding() {
        assert_eq!(round1(0.3 * 1.5), 0.5);
        assert_eq!(round1(14.0 * 1.5), 21.0);
        assert_eq!(round1(0.2 * 1.5), 0.3);
        assert_eq!(round1(-0.25), -0.3);
    }
}
