//! Deterministic simulation harness for Taskdeck chat sessions.
//!
//! Simulated implementations of the environment, the chat backend and the
//! application driver, so whole sessions run through the real
//! [`taskdeck_app::Runtime`] with virtual time and no network.
//!
//! # Invariant Testing
//!
//! The `invariants` module provides behavioral testing through invariant
//! checks. Invariants verify WHAT must be true across all execution paths, not
//! specific scenarios. Use [`InvariantRegistry::standard()`] for the common
//! App/session invariants.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod sim_driver;
pub mod sim_env;
pub mod sim_server;

pub use invariants::{
    ActiveConversationListed, AppendOnlyLog, ClientSnapshot, Invariant, InvariantRegistry,
    InvariantResult, LogMatchesConversation, PresenceUnknownWhenDisconnected, ReadMonotonicity,
    SessionSnapshot, SystemSnapshot, UniqueMessageIds, ViewMatchesSession, Violation,
};
pub use sim_driver::{SimDriver, SimDriverError};
pub use sim_env::SimEnv;
pub use sim_server::{SharedSimServer, SimServer, create_shared_server};
