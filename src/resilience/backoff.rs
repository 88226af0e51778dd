//! Exponential backoff with jitter.

use std::time::Duration;

use rand::Rng;

/// Calculate exponential backoff delay with jitter.
///
/// `attempt` is the number of attempts already made; the first retry waits
/// roughly `base_ms`, each following one doubles up to `max_ms`.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let capped_delay = base_ms.saturating_mul(exponential_base).min(max_ms);

    // Jitter: 0 to 10% of the delay
    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_grows_and_caps() {
        let first = calculate_backoff(1, 100, 2000);
        assert!((100..110).contains(&first.as_millis()));

        let second = calculate_backoff(2, 100, 2000);
        assert!((200..220).contains(&second.as_millis()));

        let capped = calculate_backoff(10, 100, 1000);
        assert!((1000..1100).contains(&capped.as_millis()));
    }

    #[test]
    fn test_no_delay_before_first_attempt() {
        assert_eq!(calculate_backoff(0, 100, 2000), Duration::ZERO);
    }
}
