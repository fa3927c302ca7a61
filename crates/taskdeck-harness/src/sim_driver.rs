//! Simulation driver implementing the Driver trait.
//!
//! `SimDriver` provides the same interface as the terminal driver but for
//! deterministic testing. It implements [`Driver`] so the same
//! [`taskdeck_app::Runtime`] orchestration code runs in both production and
//! simulation. The realtime channel and the history API are both served by
//! an in-memory [`SimServer`](crate::SimServer).

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use taskdeck_app::{App, AppEvent, Driver, KeyInput};
use taskdeck_client::{Client, Environment, HistoryRequest, TransportEvent};
use taskdeck_proto::{ClientCommand, Message, UserId};
use tracing::{debug, trace};

use crate::{
    SharedSimServer, SimEnv,
    invariants::{ClientSnapshot, InvariantRegistry, SessionSnapshot, SystemSnapshot},
};

/// Error type for simulation driver.
#[derive(Debug, Clone)]
pub struct SimDriverError(pub String);

impl std::fmt::Display for SimDriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SimDriverError: {}", self.0)
    }
}

impl std::error::Error for SimDriverError {}

/// Shared state for event injection.
///
/// This allows injection from outside async contexts.
#[derive(Default)]
struct SharedState {
    pending_events: VecDeque<AppEvent>,
    incoming: VecDeque<TransportEvent>,
    hold_history: bool,
    held_fetches: Vec<(HistoryRequest, Result<Vec<Message>, String>)>,
    sent: Vec<ClientCommand>,
    renders: usize,
    fail_render: bool,
    // Log and peer at the last invariant check, and whether history was
    // delivered since.
    last_log: Option<(Option<UserId>, Vec<Message>)>,
    history_delivered: bool,
}

/// Simulation driver for deterministic testing.
///
/// History fetches are answered from the server at the moment they are
/// requested. With [`SimDriver::hold_history`] enabled the answers are kept
/// back until the test releases them, in any order, which is how slow and
/// out-of-order responses are simulated.
pub struct SimDriver {
    server: SharedSimServer,
    env: SimEnv,
    token: String,
    user: Option<UserId>,
    state: Arc<Mutex<SharedState>>,
    invariants: Option<InvariantRegistry>,
}

impl SimDriver {
    /// Create a driver for the account behind `token`.
    pub fn new(server: SharedSimServer, env: SimEnv, token: impl Into<String>) -> Self {
        Self {
            server,
            env,
            token: token.into(),
            user: None,
            state: Arc::new(Mutex::new(SharedState::default())),
            invariants: None,
        }
    }

    /// Enable invariant checking.
    #[must_use]
    pub fn with_invariants(mut self, registry: InvariantRegistry) -> Self {
        self.invariants = Some(registry);
        self
    }

    /// Inject an `AppEvent` for processing.
    pub fn inject_event(&self, event: AppEvent) {
        self.lock().pending_events.push_back(event);
    }

    /// Inject a key press for each character of `text`.
    pub fn type_text(&self, text: &str) {
        let mut state = self.lock();
        state.pending_events.extend(text.chars().map(|c| AppEvent::Key(KeyInput::Char(c))));
    }

    /// Move the virtual clock forward.
    pub fn advance(&self, by: Duration) {
        self.env.advance(by);
    }

    /// Keep history answers back until released.
    pub fn hold_history(&self, hold: bool) {
        self.lock().hold_history = hold;
    }

    /// Number of history answers being held back.
    pub fn held_history(&self) -> usize {
        self.lock().held_fetches.len()
    }

    /// Deliver held history answers in request order.
    pub fn release_history(&self) {
        let mut state = self.lock();
        let held = std::mem::take(&mut state.held_fetches);
        state.incoming.extend(
            held.into_iter()
                .map(|(request, result)| TransportEvent::HistoryFetched { request, result }),
        );
    }

    /// Deliver held history answers newest first.
    pub fn release_history_reversed(&self) {
        let mut state = self.lock();
        let held = std::mem::take(&mut state.held_fetches);
        state.incoming.extend(
            held.into_iter()
                .rev()
                .map(|(request, result)| TransportEvent::HistoryFetched { request, result }),
        );
    }

    /// Make the next renders fail.
    pub fn fail_render(&self, fail: bool) {
        self.lock().fail_render = fail;
    }

    /// Take all commands emitted on the realtime channel.
    pub fn take_sent(&self) -> Vec<ClientCommand> {
        std::mem::take(&mut self.lock().sent)
    }

    /// Number of completed renders.
    pub fn render_count(&self) -> usize {
        self.lock().renders
    }

    /// Check if there are pending events to process.
    pub fn has_pending(&self) -> bool {
        let state = self.lock();
        !state.pending_events.is_empty() || !state.incoming.is_empty()
    }

    /// User the server authenticated on the last open.
    pub fn user(&self) -> Option<&UserId> {
        self.user.as_ref()
    }

    /// Check invariants against App and session state.
    ///
    /// The log seen at the previous check is compared against the current
    /// one unless history was delivered or the open conversation changed in
    /// between.
    pub fn check_invariants<E: Environment>(&self, app: &App, client: &Client<E>, context: &str) {
        let Some(ref registry) = self.invariants else {
            return;
        };

        let peer = app.active_peer().cloned();
        let previous = {
            let mut state = self.lock();
            let previous = state.last_log.take().filter(|(before, _)| *before == peer);
            let replaced = std::mem::take(&mut state.history_delivered);
            state.last_log = Some((peer, app.messages().to_vec()));
            previous.filter(|_| !replaced).map(|(_, log)| log)
        };

        let mut snapshot =
            ClientSnapshot::from_app(app).with_session(SessionSnapshot::from_client(client));
        if let Some(log) = previous {
            snapshot = snapshot.with_previous_log(log);
        }
        registry.assert_all(&SystemSnapshot::single(snapshot), context);
    }

    fn lock(&self) -> MutexGuard<'_, SharedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn server(&self) -> MutexGuard<'_, crate::SimServer> {
        self.server.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Driver for SimDriver {
    type Error = SimDriverError;
    type Instant = Duration;

    async fn poll_event(&mut self) -> Result<Option<AppEvent>, Self::Error> {
        Ok(self.lock().pending_events.pop_front())
    }

    async fn open_transport(&mut self, token: &str) {
        let result = self.server().connect(token);
        match result {
            Ok(user) => {
                debug!(%user, "sim transport opened");
                self.user = Some(user);
            },
            Err(message) => self.lock().incoming.push_back(TransportEvent::Failed { message }),
        }
    }

    fn close_transport(&mut self) {
        if let Some(user) = self.user.take() {
            self.server().disconnect(&user);
        }
    }

    async fn send_command(&mut self, command: ClientCommand) {
        self.lock().sent.push(command.clone());
        match &self.user {
            Some(user) => self.server().handle_command(user, command),
            None => trace!(?command, "dropping command without channel"),
        }
    }

    fn fetch_history(&mut self, request: HistoryRequest) {
        let result = {
            let server = self.server();
            match server.authenticate(&self.token) {
                Some(me) => server.history(&me, &request.peer_id),
                None => Err("HTTP status client error (401 Unauthorized)".to_string()),
            }
        };

        let mut state = self.lock();
        if state.hold_history {
            state.held_fetches.push((request, result));
        } else {
            state.incoming.push_back(TransportEvent::HistoryFetched { request, result });
        }
    }

    async fn recv_event(&mut self) -> Option<TransportEvent> {
        // Server deliveries were queued before any locally produced answer,
        // so they go first.
        let delivered = self.user.as_ref().and_then(|user| self.server().pop_event(user));
        if let Some(event) = delivered {
            if let TransportEvent::Closed { .. } = event {
                self.user = None;
            }
            return Some(event);
        }
        let mut state = self.lock();
        let event = state.incoming.pop_front();
        if let Some(TransportEvent::HistoryFetched { .. }) = event {
            state.history_delivered = true;
        }
        event
    }

    fn now(&self) -> Self::Instant {
        self.env.now()
    }

    fn render(&mut self, _app: &App) -> Result<(), Self::Error> {
        let mut state = self.lock();
        if state.fail_render {
            return Err(SimDriverError("render failed".into()));
        }
        state.renders += 1;
        Ok(())
    }

    fn stop(&mut self) {
        self.close_transport();
    }
}
