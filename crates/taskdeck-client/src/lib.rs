//! Client
//!
//! Action-based chat session for Taskdeck. Composes the core state machines
//! (connection, presence, conversation store, typing debounce) into one
//! session-scoped provider.
//!
//! # Architecture
//!
//! The client follows the same Sans-IO pattern as [`taskdeck_core`]. It
//! receives events ([`ClientEvent`]), processes them through pure state machine
//! logic, and returns actions ([`ClientAction`]) for the caller to execute.
//! A [`Client`] is created for one authenticated [`Session`]; dropping it
//! discards every piece of chat state.
//!
//! # Transport (optional)
//!
//! With the `transport` feature enabled, this crate also provides:
//! - [`transport::connect`]: Socket.IO over WebSocket, driven by channels
//! - [`transport::HistoryClient`]: bearer-authenticated message history fetch

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod client;
mod config;
mod error;
mod event;
mod session;

#[cfg(feature = "transport")]
pub mod transport;

pub use client::Client;
pub use config::ClientConfig;
pub use error::{ClientError, SessionError};
pub use event::{ClientAction, ClientEvent, ErrorKind, TransportEvent};
pub use session::{CurrentUser, Session};
pub use taskdeck_core::{ConnectionState, Environment, HistoryRequest};
