//! Taskdeck core state machines.
//!
//! Pure, I/O-free logic for a chat client: connection lifecycle, peer
//! presence, the active conversation's message log and the outbound typing
//! debounce. Every timed behaviour takes the current instant as a parameter,
//! so the same code runs under a real clock and under the simulation harness.
//!
//! Drivers own the sockets and timers; these types only decide what should
//! happen next and return it as data.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod connection;
pub mod conversation;
pub mod env;
pub mod error;
pub mod presence;
pub mod typing;

pub use connection::{Connection, ConnectionAction, ConnectionState};
pub use conversation::{ConversationStore, HistoryOutcome, HistoryRequest, IncomingMessage};
pub use env::Environment;
pub use error::CommandError;
pub use presence::{PresenceChange, PresenceTracker};
pub use typing::{TypingIndicator, TypingSignal};
