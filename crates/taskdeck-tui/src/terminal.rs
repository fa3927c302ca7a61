//! [`Driver`] backed by a real terminal and a real chat server.
//!
//! Keys come from the crossterm event stream and frames go out through
//! ratatui. The realtime channel is the
//! Socket.IO WebSocket transport; history comes over HTTP.

use std::{
    collections::VecDeque,
    io::{self, Stdout, stdout},
    time::{Duration, Instant},
};

use crossterm::{
    ExecutableCommand,
    event::{Event, EventStream, KeyCode, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend};
use taskdeck_app::{App, AppEvent, Driver, KeyInput};
use taskdeck_client::{
    HistoryRequest, TransportEvent,
    transport::{self, ConnectedClient, HistoryClient},
};
use taskdeck_proto::ClientCommand;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::ui;

/// Interval of idle ticks when no key arrives. Bounds deadline latency.
const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Buffer size of the history result channel.
const HISTORY_CHANNEL_CAPACITY: usize = 16;

/// Failure talking to the local terminal.
#[derive(Debug, Error)]
pub enum TerminalError {
    /// Raw mode, the alternate screen, drawing or key input failed.
    #[error("terminal I/O: {0}")]
    Io(#[from] io::Error),
}

/// Owns the terminal, the realtime connection and in-flight history fetches.
///
/// Dropping it restores the terminal.
pub struct TerminalDriver {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    event_stream: EventStream,
    server_addr: String,
    connection: Option<ConnectedClient>,
    history: HistoryClient,
    history_tx: mpsc::Sender<TransportEvent>,
    history_rx: mpsc::Receiver<TransportEvent>,
    /// Failures detected before a transport task existed.
    local: VecDeque<TransportEvent>,
}

impl TerminalDriver {
    /// Take over the terminal.
    ///
    /// # Errors
    ///
    /// Returns an error if raw mode or the alternate screen cannot be
    /// entered.
    pub fn new(server_addr: String, history: HistoryClient) -> Result<Self, TerminalError> {
        enable_raw_mode()?;
        stdout().execute(EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout());
        let terminal = Terminal::new(backend)?;
        let event_stream = EventStream::new();
        let (history_tx, history_rx) = mpsc::channel(HISTORY_CHANNEL_CAPACITY);

        Ok(Self {
            terminal,
            event_stream,
            server_addr,
            connection: None,
            history,
            history_tx,
            history_rx,
            local: VecDeque::new(),
        })
    }

    /// Map a crossterm key to the keys the App understands. Anything else is
    /// ignored.
    pub fn convert_key(code: KeyCode) -> Option<KeyInput> {
        match code {
            KeyCode::Char(c) => Some(KeyInput::Char(c)),
            KeyCode::Enter => Some(KeyInput::Enter),
            KeyCode::Backspace => Some(KeyInput::Backspace),
            KeyCode::Delete => Some(KeyInput::Delete),
            KeyCode::Tab => Some(KeyInput::Tab),
            KeyCode::Esc => Some(KeyInput::Esc),
            KeyCode::Left => Some(KeyInput::Left),
            KeyCode::Right => Some(KeyInput::Right),
            KeyCode::Up => Some(KeyInput::Up),
            KeyCode::Down => Some(KeyInput::Down),
            KeyCode::Home => Some(KeyInput::Home),
            KeyCode::End => Some(KeyInput::End),
            _ => None,
        }
    }
}

impl Driver for TerminalDriver {
    type Error = TerminalError;
    type Instant = Instant;

    async fn poll_event(&mut self) -> Result<Option<AppEvent>, Self::Error> {
        tokio::select! {
            biased;

            // Terminal events
            maybe_event = self.event_stream.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key_event))) if key_event.kind == KeyEventKind::Press => {
                        Ok(Self::convert_key(key_event.code).map(AppEvent::Key))
                    },
                    Some(Ok(Event::Resize(cols, rows))) => Ok(Some(AppEvent::Resize(cols, rows))),
                    Some(Err(e)) => Err(TerminalError::Io(e)),
                    _ => Ok(None),
                }
            }

            // Tick timeout
            () = tokio::time::sleep(TICK_INTERVAL) => Ok(Some(AppEvent::Tick)),
        }
    }

    async fn open_transport(&mut self, token: &str) {
        self.close_transport();
        match transport::connect(&self.server_addr, token) {
            Ok(client) => self.connection = Some(client),
            Err(e) => {
                warn!(error = %e, "cannot open transport");
                self.local.push_back(TransportEvent::Failed { message: e.to_string() });
            },
        }
    }

    fn close_transport(&mut self) {
        // Dropping the command sender lets the session say goodbye.
        if self.connection.take().is_some() {
            debug!("transport closed");
        }
    }

    async fn send_command(&mut self, command: ClientCommand) {
        let Some(conn) = &self.connection else {
            debug!(event = command.name(), "no transport, command dropped");
            return;
        };
        if conn.to_server.send(command).await.is_err() {
            debug!("transport task gone, command dropped");
        }
    }

    fn fetch_history(&mut self, request: HistoryRequest) {
        self.history.spawn_fetch(request, self.history_tx.clone());
    }

    async fn recv_event(&mut self) -> Option<TransportEvent> {
        if let Some(event) = self.local.pop_front() {
            return Some(event);
        }
        let delivered = self.connection.as_mut().and_then(|conn| conn.from_server.try_recv().ok());
        if delivered.is_some() {
            return delivered;
        }
        self.history_rx.try_recv().ok()
    }

    #[allow(clippy::disallowed_methods)]
    fn now(&self) -> Self::Instant {
        Instant::now()
    }

    fn render(&mut self, app: &App) -> Result<(), Self::Error> {
        self.terminal.draw(|frame| ui::render(frame, app))?;
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(conn) = self.connection.take() {
            conn.stop();
        }
    }
}

impl Drop for TerminalDriver {
    fn drop(&mut self) {
        self.stop();
        let _ = disable_raw_mode();
        let _ = stdout().execute(LeaveAlternateScreen);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn editing_keys_convert() {
        assert_eq!(TerminalDriver::convert_key(KeyCode::Char('x')), Some(KeyInput::Char('x')));
        assert_eq!(TerminalDriver::convert_key(KeyCode::Enter), Some(KeyInput::Enter));
        assert_eq!(TerminalDriver::convert_key(KeyCode::Tab), Some(KeyInput::Tab));
        assert_eq!(TerminalDriver::convert_key(KeyCode::Up), Some(KeyInput::Up));
    }

    #[test]
    fn function_keys_are_ignored() {
        assert_eq!(TerminalDriver::convert_key(KeyCode::F(1)), None);
        assert_eq!(TerminalDriver::convert_key(KeyCode::PageUp), None);
    }
}
