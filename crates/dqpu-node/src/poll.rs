//! Poll window and jittered sleeping shared by both node loops.

use std::time::Duration;

use rand::Rng;

/// Number of latest jobs fetched per cycle: wide on the first cycle to
/// catch up with the backlog, narrow afterwards.
#[derive(Debug, Clone)]
pub struct PollWindow {
    initial: usize,
    steady: usize,
    first: bool,
}

impl PollWindow {
    /// Create a window.
    pub fn new(initial: usize, steady: usize) -> Self {
        Self {
            initial,
            steady,
            first: true,
        }
    }

    /// Check if no cycle has run yet.
    pub fn is_first(&self) -> bool {
        self.first
    }

    /// Window size for the next cycle.
    pub fn next_limit(&mut self) -> usize {
        if std::mem::take(&mut self.first) {
            self.initial
        } else {
            self.steady
        }
    }
}

/// A whole number of seconds drawn uniformly from `0..=max_secs`.
pub fn jitter<R: Rng + ?Sized>(max_secs: u64, rng: &mut R) -> Duration {
    Duration::from_secs(rng.gen_range(0..=max_secs))
}

/// Sleep for a jittered duration. A zero pause still yields to the
/// runtime.
pub async fn jitter_sleep<R: Rng + ?Sized>(max_secs: u64, rng: &mut R) {
    let pause = jitter(max_secs, rng);
    if pause.is_zero() {
        tokio::task::yield_now().await;
    } else {
        tokio::time::sleep(pause).await;
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn test_window_narrows_after_first_cycle() {
        let mut window = PollWindow::new(256, 48);
        assert!(window.is_first());
        assert_eq!(window.next_limit(), 256);
        assert!(!window.is_first());
        assert_eq!(window.next_limit(), 48);
        assert_eq!(window.next_limit(), 48);
    }

    #[test]
    fn test_jitter_bounds() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            assert!(jitter(5, &mut rng) <= Duration::from_secs(5));
        }
        assert_eq!(jitter(0, &mut rng), Duration::ZERO);
    }
}
