//! Driver trait for abstracting I/O operations.
//!
//! The [`Driver`] trait decouples the application runtime from specific I/O
//! implementations. Each frontend implements the trait to provide
//! platform-specific I/O, while the generic [`crate::Runtime`] handles all
//! orchestration.

use std::{future::Future, ops::Sub, time::Duration};

use taskdeck_client::{HistoryRequest, TransportEvent};
use taskdeck_proto::ClientCommand;

use crate::{App, AppEvent};

/// Abstracts I/O operations for the application runtime.
///
/// Implementations provide platform-specific I/O while the generic
/// [`Runtime`](crate::Runtime) handles orchestration logic. This ensures
/// the same orchestration code runs in production TUI and simulation.
///
/// Transport operations never fail at this level: a driver that cannot open,
/// send or fetch reports it later through [`Driver::recv_event`] as a
/// `Failed`, `Closed` or failed `HistoryFetched` event, so the session can
/// show it and recover.
///
/// # Implementations
///
/// - **TUI**: crossterm for terminal events, WebSocket and HTTP transports
/// - **Simulation**: scripted input and an in-memory chat server
pub trait Driver: Send {
    /// Platform-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Time instant type. Enables virtual time in simulation.
    type Instant: Copy + Ord + Send + Sync + Sub<Output = Duration>;

    /// Poll for the next input event (key, resize or tick).
    ///
    /// Returns `None` if no events are ready.
    fn poll_event(&mut self) -> impl Future<Output = Result<Option<AppEvent>, Self::Error>> + Send;

    /// Open the realtime channel authenticated with `token`.
    fn open_transport(&mut self, token: &str) -> impl Future<Output = ()> + Send;

    /// Close the realtime channel. Safe to call when none is open.
    fn close_transport(&mut self);

    /// Emit a command on the realtime channel.
    fn send_command(&mut self, command: ClientCommand) -> impl Future<Output = ()> + Send;

    /// Start a history fetch. The result arrives through
    /// [`Driver::recv_event`].
    fn fetch_history(&mut self, request: HistoryRequest);

    /// Next pending transport notification.
    ///
    /// Returns `None` when nothing is ready. Never waits for the network.
    fn recv_event(&mut self) -> impl Future<Output = Option<TransportEvent>> + Send;

    /// Current time instant.
    fn now(&self) -> Self::Instant;

    /// Render the application state.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    fn render(&mut self, app: &App) -> Result<(), Self::Error>;

    /// Stop all I/O and clean up resources.
    fn stop(&mut self);
}
