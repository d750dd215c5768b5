use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;

/// Injectable suspension point. The readiness gates poll without bound, so
/// tests swap in [`NoopDelay`] to walk through many retries instantly.
#[async_trait]
pub trait DelaySource: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioDelay;

#[async_trait]
impl DelaySource for TokioDelay {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Default)]
pub struct NoopDelay;

#[async_trait]
impl DelaySource for NoopDelay {
    async fn sleep(&self, _duration: Duration) {}
}

/// Random stagger applied before selected commands. Even iterations run back
/// to back; odd ones get a uniform delay in `[0, ceiling)` to shake out
/// timing-sensitive backend behavior. Fuzz input, not a correctness knob.
pub fn stagger_delay(iteration: u64, ceiling: Duration) -> Duration {
    if iteration % 2 == 0 {
        return Duration::ZERO;
    }
    // The ceiling truncates to whole milliseconds, so anything below 1 ms
    // leaves no range to draw from.
    let ceiling_millis = ceiling.as_millis() as u64;
    if ceiling_millis == 0 {
        return Duration::ZERO;
    }
    let millis = rand::thread_rng().gen_range(0..ceiling_millis);
    Duration::from_millis(millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn even_iterations_never_stagger() {
        let ceiling = Duration::from_secs(10);
        for iteration in [0, 2, 4, 100, 2_000] {
            assert_eq!(stagger_delay(iteration, ceiling), Duration::ZERO);
        }
    }

    #[test]
    fn odd_iterations_stay_under_ceiling() {
        let ceiling = Duration::from_secs(10);
        for _ in 0..200 {
            let delay = stagger_delay(1, ceiling);
            assert!(delay < ceiling);
        }
    }

    #[test]
    fn zero_ceiling_is_safe() {
        assert_eq!(stagger_delay(1, Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn sub_millisecond_ceiling_is_safe() {
        assert_eq!(
            stagger_delay(1, Duration::from_micros(500)),
            Duration::ZERO
        );
    }
}
