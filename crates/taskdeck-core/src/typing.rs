//! Outbound typing indicator with idle debounce.
//!
//! One notification per burst: the first keystroke emits "typing", later
//! keystrokes only push the idle deadline back, and "stopped" is emitted
//! exactly once when the burst ends. A burst ends when the idle timeout
//! elapses, a message is sent or the user leaves the conversation.
//!
//! ```text
//!           keystroke / emit typing(true)
//!   ┌──────┐ ───────────────────────────> ┌────────┐ ──┐ keystroke
//!   │ Idle │                              │ Active │   │ (re-arm only)
//!   └──────┘ <─────────────────────────── └────────┘ <─┘
//!           idle timeout, send or switch / emit typing(false)
//! ```

use std::{
    ops::Sub,
    time::{Duration, Instant},
};

use taskdeck_proto::UserId;
use tracing::debug;

/// Idle time after the last keystroke before "stopped" is emitted.
pub const DEFAULT_TYPING_IDLE: Duration = Duration::from_millis(2000);

/// Typing notification to emit to a peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypingSignal {
    /// Peer being typed to.
    pub peer: UserId,
    /// New typing state.
    pub is_typing: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Burst<I> {
    Idle,
    Active { peer: UserId, last_keystroke: I },
}

/// Debounced typing state machine for the active conversation.
///
/// # Invariants
///
/// - Every emitted `is_typing: true` is followed by exactly one
///   `is_typing: false` for the same peer before the next `true`.
/// - `Idle` never has a pending deadline.
#[derive(Debug, Clone)]
pub struct TypingIndicator<I = Instant>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    burst: Burst<I>,
    idle_timeout: Duration,
}

impl<I> Default for TypingIndicator<I>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    fn default() -> Self {
        Self::new(DEFAULT_TYPING_IDLE)
    }
}

impl<I> TypingIndicator<I>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    /// Idle indicator with the given debounce window.
    #[must_use]
    pub fn new(idle_timeout: Duration) -> Self {
        Self { burst: Burst::Idle, idle_timeout }
    }

    /// A key was pressed in the composer for `peer`.
    ///
    /// A keystroke for a different peer than the active burst starts a new
    /// burst; the caller is expected to have called [`Self::switch_away`]
    /// first, otherwise the old peer's indicator is left to expire remotely.
    pub fn keystroke(&mut self, peer: &UserId, now: I) -> Option<TypingSignal> {
        if let Burst::Active { peer: active, last_keystroke } = &mut self.burst {
            if active == peer {
                *last_keystroke = now;
                return None;
            }
            debug!(from = %active, to = %peer, "keystroke for a new peer without switch");
        }

        self.burst = Burst::Active { peer: peer.clone(), last_keystroke: now };
        Some(TypingSignal { peer: peer.clone(), is_typing: true })
    }

    /// A message was sent; ends the burst immediately.
    pub fn message_sent(&mut self) -> Option<TypingSignal> {
        self.finish()
    }

    /// The user is leaving the conversation; ends the burst immediately.
    pub fn switch_away(&mut self) -> Option<TypingSignal> {
        self.finish()
    }

    /// Emit "stopped" once the idle timeout has elapsed since the last
    /// keystroke.
    pub fn poll(&mut self, now: I) -> Option<TypingSignal> {
        let idle = matches!(
            self.burst,
            Burst::Active { last_keystroke, .. } if now - last_keystroke >= self.idle_timeout
        );
        if idle { self.finish() } else { None }
    }

    /// Drop any burst without notifying anyone.
    ///
    /// Used on teardown when the channel is already gone.
    pub fn reset(&mut self) {
        self.burst = Burst::Idle;
    }

    /// Peer of the burst in progress.
    #[must_use]
    pub fn active_peer(&self) -> Option<&UserId> {
        match &self.burst {
            Burst::Active { peer, .. } => Some(peer),
            Burst::Idle => None,
        }
    }

    /// Whether a burst is in progress.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self.burst, Burst::Active { .. })
    }

    fn finish(&mut self) -> Option<TypingSignal> {
        match std::mem::replace(&mut self.burst, Burst::Idle) {
            Burst::Active { peer, .. } => Some(TypingSignal { peer, is_typing: false }),
            Burst::Idle => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn start(peer: &str) -> Option<TypingSignal> {
        Some(TypingSignal { peer: peer.into(), is_typing: true })
    }

    fn stop(peer: &str) -> Option<TypingSignal> {
        Some(TypingSignal { peer: peer.into(), is_typing: false })
    }

    #[test]
    fn burst_emits_once_then_stops_after_idle() {
        let mut typing = TypingIndicator::default();
        let peer = UserId::from("u7");

        assert_eq!(typing.keystroke(&peer, ms(0)), start("u7"));
        for t in [300, 600, 900] {
            assert_eq!(typing.keystroke(&peer, ms(t)), None);
        }

        assert_eq!(typing.poll(ms(2899)), None);
        assert_eq!(typing.poll(ms(2900)), stop("u7"));
        assert_eq!(typing.poll(ms(5000)), None);
        assert!(!typing.is_active());
    }

    #[test]
    fn send_ends_burst_without_waiting() {
        let mut typing = TypingIndicator::default();
        let peer = UserId::from("u7");

        typing.keystroke(&peer, ms(0));
        assert_eq!(typing.message_sent(), stop("u7"));
        assert_eq!(typing.poll(ms(10_000)), None);
    }

    #[test]
    fn send_while_idle_is_silent() {
        let mut typing = TypingIndicator::<Duration>::default();
        assert_eq!(typing.message_sent(), None);
        assert_eq!(typing.switch_away(), None);
    }

    #[test]
    fn switch_away_notifies_previous_peer() {
        let mut typing = TypingIndicator::default();
        typing.keystroke(&UserId::from("a"), ms(0));

        assert_eq!(typing.switch_away(), stop("a"));
        assert_eq!(typing.keystroke(&UserId::from("b"), ms(10)), start("b"));
        assert_eq!(typing.active_peer(), Some(&UserId::from("b")));
    }

    #[test]
    fn keystroke_after_stop_starts_new_burst() {
        let mut typing = TypingIndicator::default();
        let peer = UserId::from("u7");

        typing.keystroke(&peer, ms(0));
        typing.poll(ms(2000));
        assert_eq!(typing.keystroke(&peer, ms(2100)), start("u7"));
    }

    #[test]
    fn reset_is_silent() {
        let mut typing = TypingIndicator::default();
        typing.keystroke(&UserId::from("u7"), ms(0));
        typing.reset();

        assert_eq!(typing.poll(ms(5000)), None);
        assert_eq!(typing.message_sent(), None);
    }
}
