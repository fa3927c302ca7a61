//! Production environment.
//!
//! Real monotonic time and Tokio sleeps. The typing and presence deadlines
//! of the session run against this clock.

use std::time::Duration;

use taskdeck_core::Environment;

/// Production environment using system time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = std::time::Instant;

    #[allow(clippy::disallowed_methods)]
    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn time_moves_forward() {
        let env = SystemEnv::new();
        let start = env.now();
        env.sleep(Duration::from_millis(5)).await;
        assert!(env.now() - start >= Duration::from_millis(5));
    }
}
