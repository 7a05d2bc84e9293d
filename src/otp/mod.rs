use chrono::{DateTime, Duration, Utc};
use rand::Rng;

/// How long an issued confirmation code stays valid.
pub fn code_validity() -> Duration {
    Duration::minutes(5)
}

/// Generate a 4-digit confirmation code. Uniform over the full 0000–9999
/// range with leading zeros preserved, so all 10 000 values are possible.
pub fn generate(rng: &mut impl Rng) -> String {
    format!("{:04}", rng.gen_range(0..10_000))
}

/// Expiry instant for a code issued at `now`.
pub fn expiry_from(now: DateTime<Utc>) -> DateTime<Utc> {
    now + code_validity()
}

/// The expiry instant itself is already outside the window: a code presented
/// exactly at its expiry is dead.
pub fn is_expired(expiry: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now >= expiry
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn codes_are_four_zero_padded_digits() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1_000 {
            let code = generate(&mut rng);
            assert_eq!(code.len(), 4);
            assert!(code.chars().all(|c| c.is_ascii_digit()), "bad code {}", code);
        }
    }

    #[test]
    fn leading_zero_codes_occur() {
        // Over a few thousand draws a uniform generator must produce values
        // below 1000; a [1000, 9999] generator never would.
        let mut rng = StdRng::seed_from_u64(42);
        let low = (0..5_000)
            .map(|_| generate(&mut rng))
            .filter(|c| c.starts_with('0'))
            .count();
        assert!(low > 0, "no leading-zero code in 5000 draws");
    }

    #[test]
    fn expiry_boundary_is_exclusive() {
        let now = Utc::now();
        let expiry = expiry_from(now);
        assert!(!is_expired(expiry, now));
        assert!(!is_expired(expiry, expiry - Duration::seconds(1)));
        assert!(is_expired(expiry, expiry));
        assert!(is_expired(expiry, expiry + Duration::seconds(1)));
    }

    #[test]
    fn validity_window_is_five_minutes() {
        let now = Utc::now();
        assert_eq!(expiry_from(now) - now, Duration::minutes(5));
    }
}
