//! Virtual clock environment.
//!
//! `SimEnv` implements [`Environment`] with a [`Duration`] since the start of
//! the simulation as its instant. Time only moves when a test calls
//! [`SimEnv::advance`] or something sleeps, so typing deadlines fire
//! deterministically.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use taskdeck_core::Environment;

/// Deterministic environment backed by a shared virtual clock.
///
/// Clones share the clock, so the copy held by the client and the copy held
/// by the driver always agree on the time.
#[derive(Clone, Default)]
pub struct SimEnv {
    now: Arc<Mutex<Duration>>,
}

impl SimEnv {
    /// Create a clock at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward by `by` and return the new time.
    pub fn advance(&self, by: Duration) -> Duration {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
        *now
    }

    /// Current virtual time.
    pub fn elapsed(&self) -> Duration {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Environment for SimEnv {
    type Instant = Duration;

    fn now(&self) -> Duration {
        self.elapsed()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        self.advance(duration);
        std::future::ready(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_clock() {
        let env = SimEnv::new();
        let other = env.clone();
        env.advance(Duration::from_millis(1500));
        assert_eq!(other.now(), Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn sleep_advances_virtual_time() {
        let env = SimEnv::new();
        env.sleep(Duration::from_secs(3)).await;
        assert_eq!(env.now(), Duration::from_secs(3));
    }
}
