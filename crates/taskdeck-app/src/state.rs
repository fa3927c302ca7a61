//! Observable presence state.

/// What the UI shows for a peer's availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Last status from the server was online.
    Online,
    /// Last status from the server was offline, or none was received.
    Offline,
    /// No live channel, so the server cannot be vouching for anyone.
    Unknown,
}

impl Presence {
    /// Short label for status lines.
    pub fn label(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
            Self::Unknown => "unknown",
        }
    }
}
