//! Peer presence: online status and inbound typing indicators.
//!
//! Online status is whatever the server last said. Typing indicators are
//! armed by `userTyping` events and expire on their own if the matching
//! "stopped" event never arrives, so a peer who closes their tab mid-word
//! does not stay "typing..." forever.
//!
//! The tracker is a pure state machine: the caller passes the current instant
//! to [`PresenceTracker::on_typing`] and polls [`PresenceTracker::expire`]
//! from its tick loop.

use std::{
    collections::BTreeMap,
    ops::Sub,
    time::{Duration, Instant},
};

use taskdeck_proto::UserId;
use tracing::trace;

/// How long a typing indicator survives without a refresh.
pub const DEFAULT_TYPING_EXPIRY: Duration = Duration::from_millis(3000);

/// Observable presence change, reported only when the value actually flips.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceChange {
    /// Peer went online or offline.
    Online {
        /// Affected peer.
        peer: UserId,
        /// New status.
        online: bool,
    },
    /// Peer started or stopped typing to us.
    Typing {
        /// Affected peer.
        peer: UserId,
        /// New typing state.
        typing: bool,
    },
}

/// Online and typing state for every peer the server has mentioned.
///
/// # Invariants
///
/// - A peer is typing iff it has an armed expiry; clearing the flag always
///   disarms it.
/// - At most one expiry per peer. Re-arming replaces the previous one.
#[derive(Debug, Clone)]
pub struct PresenceTracker<I = Instant>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    online: BTreeMap<UserId, bool>,
    /// Peer to the instant its indicator was last armed.
    typing: BTreeMap<UserId, I>,
    expiry: Duration,
}

impl<I> Default for PresenceTracker<I>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    fn default() -> Self {
        Self::new(DEFAULT_TYPING_EXPIRY)
    }
}

impl<I> PresenceTracker<I>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    /// Empty tracker with the given typing expiry.
    #[must_use]
    pub fn new(expiry: Duration) -> Self {
        Self { online: BTreeMap::new(), typing: BTreeMap::new(), expiry }
    }

    /// Record a `userStatus` event. Overwrites unconditionally.
    pub fn on_status(&mut self, peer: UserId, online: bool) -> Option<PresenceChange> {
        let previous = self.online.insert(peer.clone(), online);
        (previous != Some(online)).then_some(PresenceChange::Online { peer, online })
    }

    /// Record a `userTyping` event.
    ///
    /// `true` arms (or re-arms) the expiry from `now`; `false` clears the flag
    /// and disarms it.
    pub fn on_typing(&mut self, peer: UserId, is_typing: bool, now: I) -> Option<PresenceChange> {
        if is_typing {
            let was_typing = self.typing.insert(peer.clone(), now).is_some();
            (!was_typing).then_some(PresenceChange::Typing { peer, typing: true })
        } else {
            let was_typing = self.typing.remove(&peer).is_some();
            was_typing.then_some(PresenceChange::Typing { peer, typing: false })
        }
    }

    /// Clear every typing indicator that has gone `expiry` without a refresh.
    pub fn expire(&mut self, now: I) -> Vec<PresenceChange> {
        let expiry = self.expiry;
        let expired: Vec<UserId> = self
            .typing
            .iter()
            .filter(|&(_, &armed_at)| now - armed_at >= expiry)
            .map(|(peer, _)| peer.clone())
            .collect();

        expired
            .into_iter()
            .map(|peer| {
                trace!(%peer, "typing indicator expired");
                self.typing.remove(&peer);
                PresenceChange::Typing { peer, typing: false }
            })
            .collect()
    }

    /// Forget everything, including online status.
    pub fn clear(&mut self) {
        self.online.clear();
        self.typing.clear();
    }

    /// Last status the server reported. Unknown peers are offline.
    #[must_use]
    pub fn is_online(&self, peer: &UserId) -> bool {
        self.online.get(peer).copied().unwrap_or(false)
    }

    /// Whether `peer` currently has an armed typing indicator.
    #[must_use]
    pub fn is_typing(&self, peer: &UserId) -> bool {
        self.typing.contains_key(peer)
    }

    /// Peers currently typing, in id order.
    pub fn typing_peers(&self) -> impl Iterator<Item = &UserId> {
        self.typing.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn status_overwrites_and_reports_flips() {
        let mut tracker = PresenceTracker::<Duration>::default();
        let peer = UserId::from("u1");

        assert_eq!(
            tracker.on_status(peer.clone(), true),
            Some(PresenceChange::Online { peer: peer.clone(), online: true })
        );
        assert!(tracker.on_status(peer.clone(), true).is_none());
        assert!(tracker.is_online(&peer));

        tracker.on_status(peer.clone(), false);
        assert!(!tracker.is_online(&peer));
        assert!(!tracker.is_online(&UserId::from("never-seen")));
    }

    #[test]
    fn typing_expires_after_three_seconds() {
        let mut tracker = PresenceTracker::default();
        let peer = UserId::from("u1");

        tracker.on_typing(peer.clone(), true, ms(0));
        assert!(tracker.expire(ms(2999)).is_empty());
        assert!(tracker.is_typing(&peer));

        let changes = tracker.expire(ms(3000));
        assert_eq!(changes, vec![PresenceChange::Typing { peer: peer.clone(), typing: false }]);
        assert!(!tracker.is_typing(&peer));
    }

    #[test]
    fn refresh_restarts_window() {
        let mut tracker = PresenceTracker::default();
        let peer = UserId::from("u1");

        tracker.on_typing(peer.clone(), true, ms(0));
        assert!(tracker.on_typing(peer.clone(), true, ms(2000)).is_none());

        assert!(tracker.expire(ms(4999)).is_empty());
        assert_eq!(tracker.expire(ms(5000)).len(), 1);
    }

    #[test]
    fn explicit_stop_disarms_expiry() {
        let mut tracker = PresenceTracker::default();
        let peer = UserId::from("u1");

        tracker.on_typing(peer.clone(), true, ms(0));
        let change = tracker.on_typing(peer.clone(), false, ms(100));
        assert_eq!(change, Some(PresenceChange::Typing { peer: peer.clone(), typing: false }));

        assert!(tracker.expire(ms(10_000)).is_empty());
    }

    #[test]
    fn stop_for_idle_peer_is_silent() {
        let mut tracker = PresenceTracker::default();
        assert!(tracker.on_typing(UserId::from("u1"), false, ms(0)).is_none());
    }

    #[test]
    fn peers_expire_independently() {
        let mut tracker = PresenceTracker::default();
        tracker.on_typing(UserId::from("a"), true, ms(0));
        tracker.on_typing(UserId::from("b"), true, ms(1000));

        assert_eq!(tracker.expire(ms(3000)).len(), 1);
        assert!(tracker.is_typing(&UserId::from("b")));
        assert_eq!(tracker.expire(ms(4000)).len(), 1);
    }

    #[test]
    fn clear_forgets_status_and_typing() {
        let mut tracker = PresenceTracker::default();
        tracker.on_typing(UserId::from("a"), true, ms(0));
        tracker.on_status(UserId::from("a"), true);

        tracker.clear();
        assert_eq!(tracker.typing_peers().count(), 0);
        assert!(!tracker.is_online(&UserId::from("a")));
        assert!(tracker.expire(ms(5000)).is_empty());
    }
}
