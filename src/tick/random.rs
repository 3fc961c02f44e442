use std::{
    sync::{Mutex, PoisonError},
    time::Duration,
};

use rand::{Rng, SeedableRng, rngs::StdRng};

/// Source of every random draw the scheduler and decision policy make.
pub trait RandomSource: Send + Sync {
    /// Uniform in `[0, 1)`.
    fn unit(&self) -> f64;

    /// Uniform in `[0, len)`. `len` is never zero.
    fn index(&self, len: usize) -> usize;

    /// Uniform in `[0, max)`; zero when `max` is zero.
    fn jitter(&self, max: Duration) -> Duration;
}

pub struct StdRandomSource {
    rng: Mutex<StdRng>,
}

impl StdRandomSource {
    pub fn from_seed(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            rng: Mutex::new(rng),
        }
    }

    fn with_rng<T>(&self, draw: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut guard = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        draw(&mut guard)
    }
}

impl RandomSource for StdRandomSource {
    fn unit(&self) -> f64 {
        self.with_rng(|rng| rng.random::<f64>())
    }

    fn index(&self, len: usize) -> usize {
        self.with_rng(|rng| rng.random_range(0..len.max(1)))
    }

    fn jitter(&self, max: Duration) -> Duration {
        let max_ms = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(self.with_rng(|rng| rng.random_range(0..max_ms)))
    }
}
