//! Client timing configuration.

use std::time::Duration;

use taskdeck_core::{presence::DEFAULT_TYPING_EXPIRY, typing::DEFAULT_TYPING_IDLE};

/// Timing knobs for a [`crate::Client`].
///
/// The expiry must stay above the idle window, otherwise a peer's indicator
/// can flicker off before their real "stopped" signal arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConfig {
    /// Keystroke silence before we tell the peer we stopped typing.
    pub typing_idle: Duration,
    /// Lifetime of a peer's typing indicator without a refresh.
    pub typing_expiry: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self { typing_idle: DEFAULT_TYPING_IDLE, typing_expiry: DEFAULT_TYPING_EXPIRY }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_outlasts_idle() {
        let config = ClientConfig::default();
        assert_eq!(config.typing_idle, Duration::from_millis(2000));
        assert_eq!(config.typing_expiry, Duration::from_millis(3000));
        assert!(config.typing_expiry > config.typing_idle);
    }
}
