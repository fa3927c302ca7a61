//! Environment abstraction for deterministic testing.
//!
//! Decouples chat logic from the system clock. Production uses
//! `std::time::Instant`; the simulation harness supplies a virtual clock that
//! tests advance by hand.

use std::{ops::Sub, time::Duration};

/// Abstract environment providing time and async sleep.
///
/// # Invariants
///
/// - `now()` never goes backwards within one execution context.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Instant type used by this environment.
    type Instant: Copy + Ord + Send + Sync + Sub<Output = Duration>;

    /// Current monotonic time.
    fn now(&self) -> Self::Instant;

    /// Sleeps for the specified duration.
    ///
    /// Only driver code calls this. State machines never wait.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;
}
