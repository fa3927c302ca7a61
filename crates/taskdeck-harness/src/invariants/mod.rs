//! Properties checked against every simulated step.
//!
//! A scenario test pins one interleaving; an invariant states what must hold
//! after any of them. The simulation driver captures a [`SystemSnapshot`] of
//! each client after every transport event and tick, and an
//! [`InvariantRegistry`] runs its checks over it.
//!
//! ```ignore
//! let registry = InvariantRegistry::standard();
//! let snapshot = SystemSnapshot::single(ClientSnapshot::from_app(&app));
//! registry.check_all(&snapshot)?;
//! ```

mod checks;
mod snapshot;

use std::fmt;

pub use checks::{
    ActiveConversationListed, AppendOnlyLog, LogMatchesConversation,
    PresenceUnknownWhenDisconnected, ReadMonotonicity, UniqueMessageIds, ViewMatchesSession,
};
pub use snapshot::{ClientSnapshot, SessionSnapshot, SystemSnapshot};

/// Outcome of a single check.
pub type InvariantResult = Result<(), Violation>;

/// A broken invariant and what was observed.
#[derive(Debug, Clone)]
pub struct Violation {
    /// Which invariant failed.
    pub invariant: &'static str,
    /// Observed state that broke it.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.invariant, self.message)
    }
}

impl std::error::Error for Violation {}

/// A property of client state that holds no matter how events interleave.
pub trait Invariant: Send + Sync {
    /// Stable identifier used in violation reports.
    fn name(&self) -> &'static str;

    /// Inspect `state`.
    ///
    /// # Errors
    ///
    /// Returns a [`Violation`] naming the offending state.
    fn check(&self, state: &SystemSnapshot) -> InvariantResult;
}

/// Ordered set of invariants run together.
#[derive(Default)]
pub struct InvariantRegistry {
    checks: Vec<Box<dyn Invariant>>,
}

impl InvariantRegistry {
    /// Registry with no checks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every invariant the harness knows about:
    ///
    /// - [`ActiveConversationListed`]
    /// - [`AppendOnlyLog`]
    /// - [`ReadMonotonicity`]
    /// - [`LogMatchesConversation`]
    /// - [`PresenceUnknownWhenDisconnected`]
    /// - [`UniqueMessageIds`]
    /// - [`ViewMatchesSession`]
    pub fn standard() -> Self {
        Self::new()
            .with(ActiveConversationListed)
            .with(AppendOnlyLog)
            .with(ReadMonotonicity)
            .with(LogMatchesConversation)
            .with(PresenceUnknownWhenDisconnected)
            .with(UniqueMessageIds)
            .with(ViewMatchesSession)
    }

    /// Builder form of [`InvariantRegistry::add`].
    #[must_use]
    pub fn with<I: Invariant + 'static>(mut self, invariant: I) -> Self {
        self.add(invariant);
        self
    }

    /// Register another check. Checks run in insertion order.
    pub fn add<I: Invariant + 'static>(&mut self, invariant: I) {
        self.checks.push(Box::new(invariant));
    }

    /// Names of the registered checks, in run order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.checks.iter().map(|check| check.name())
    }

    /// Run every check.
    ///
    /// # Errors
    ///
    /// Returns every violation found, not just the first.
    pub fn check_all(&self, state: &SystemSnapshot) -> Result<(), Vec<Violation>> {
        let violations: Vec<Violation> =
            self.checks.iter().filter_map(|check| check.check(state).err()).collect();
        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Run every check and panic with all violations if any fail.
    ///
    /// `context` says where in the run the snapshot was taken.
    #[allow(clippy::panic, reason = "test assertion helper")]
    pub fn assert_all(&self, state: &SystemSnapshot, context: &str) {
        let Err(violations) = self.check_all(state) else {
            return;
        };
        let report: String = violations.iter().map(|v| format!("\n  {v}")).collect();
        panic!("invariants broken {context}:{report}");
    }

    /// Number of registered checks.
    pub fn len(&self) -> usize {
        self.checks.len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_registry_runs_every_check() {
        let registry = InvariantRegistry::standard();
        assert_eq!(registry.len(), 7);

        let names: Vec<_> = registry.names().collect();
        assert!(names.contains(&"append_only_log"));
        assert!(names.contains(&"read_monotonicity"));
    }

    #[test]
    fn empty_snapshot_passes_invariants() {
        let registry = InvariantRegistry::standard();
        assert!(registry.check_all(&SystemSnapshot::empty()).is_ok());
    }

    #[test]
    fn new_registry_is_empty() {
        assert!(InvariantRegistry::new().is_empty());
    }
}
