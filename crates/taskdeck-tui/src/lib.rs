//! Terminal UI for Taskdeck chat
//!
//! A thin shell over [`taskdeck_app::Driver`] that provides terminal-specific
//! I/O. All orchestration logic lives in the generic [`taskdeck_app::Runtime`]
//!
//! This crate only handles terminal input, rendering and wiring the real
//! transports.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod system_env;
pub mod terminal;
pub mod ui;

pub use system_env::SystemEnv;
pub use taskdeck_app::{App, AppAction, AppEvent, Bridge, Driver, KeyInput, Runtime};
pub use terminal::{TerminalDriver, TerminalError};
