//! The event loop shared by every frontend.
//!
//! [`Runtime`] feeds driver input into the [`App`], routes session work
//! through the [`Bridge`] and hands the resulting transport requests back to
//! the [`Driver`]. The terminal client and the simulation run this same loop.

use taskdeck_client::{ClientConfig, Environment, Session};
use tracing::info;

use crate::{App, AppAction, AppEvent, Bridge, Driver, TransportRequest};

/// Event loop over a driver `D` and a clock `E`.
///
/// The driver's instant type must match the environment's so ticks from the
/// driver can be compared against deadlines the client computed.
pub struct Runtime<D, E>
where
    D: Driver,
    E: Environment,
{
    driver: D,
    app: App,
    bridge: Bridge<E>,
}

impl<D, E> Runtime<D, E>
where
    D: Driver<Instant = E::Instant>,
    E: Environment,
{
    /// Create a new runtime for `session` with default timing.
    pub fn new(driver: D, env: E, session: Session) -> Self {
        Self::with_config(driver, env, session, ClientConfig::default())
    }

    /// Create a new runtime with explicit client timing.
    pub fn with_config(driver: D, env: E, session: Session, config: ClientConfig) -> Self {
        let app = App::new(session.user.id.clone());
        let bridge = Bridge::with_config(env, session, config);
        Self { driver, app, bridge }
    }

    /// Run the main event loop until the user quits or logs out.
    ///
    /// Connects on start. Each cycle:
    /// 1. Polls for an input event from the driver
    /// 2. Drains transport notifications into the Bridge
    /// 3. Ticks the Bridge so deadlines fire
    /// 4. Executes resulting transport requests through the driver
    ///
    /// # Errors
    ///
    /// Returns an error if the driver encounters a terminal I/O error.
    pub async fn run(mut self) -> Result<(), D::Error> {
        self.start().await?;

        loop {
            if self.step().await? {
                break;
            }
        }

        self.finish().await;
        Ok(())
    }

    /// Render and connect. Called once by [`Runtime::run`].
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub async fn start(&mut self) -> Result<(), D::Error> {
        self.driver.render(&self.app)?;
        let actions = self.app.connect();
        self.process_actions(actions).await?;
        Ok(())
    }

    /// One pass: at most one input event, every ready transport notification,
    /// then a tick.
    ///
    /// Returns `true` once the user has quit or logged out.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails to poll input or render.
    pub async fn step(&mut self) -> Result<bool, D::Error> {
        if let Some(event) = self.driver.poll_event().await? {
            let actions = self.app.handle(event);
            if self.process_actions(actions).await? {
                return Ok(true);
            }
        }

        while let Some(event) = self.driver.recv_event().await {
            let events = self.bridge.handle_transport(event);
            self.flush_outgoing().await;
            if self.process_bridge_events(events).await? {
                return Ok(true);
            }
        }

        let now = self.driver.now();
        let events = self.bridge.handle_tick(now);
        self.flush_outgoing().await;
        self.process_bridge_events(events).await
    }

    /// Shut the session down and stop the driver.
    pub async fn finish(&mut self) {
        info!(user = %self.app.me(), "ending session");
        let events = self.bridge.shutdown();
        for event in events {
            self.app.handle(event);
        }
        self.flush_outgoing().await;
        self.driver.stop();
    }

    /// Run App actions, including any the App emits while reacting to session
    /// events they caused. `true` means quit.
    async fn process_actions(&mut self, actions: Vec<AppAction>) -> Result<bool, D::Error> {
        let mut queue = actions;

        while !queue.is_empty() {
            for action in std::mem::take(&mut queue) {
                match action {
                    AppAction::Render => self.driver.render(&self.app)?,
                    AppAction::Quit => return Ok(true),
                    AppAction::Logout => {
                        self.bridge.process_app_action(action);
                        self.flush_outgoing().await;
                        return Ok(true);
                    },

                    // Session operations go through the bridge
                    AppAction::Connect
                    | AppAction::Disconnect
                    | AppAction::SwitchConversation(_)
                    | AppAction::SendMessage { .. }
                    | AppAction::Keystroke
                    | AppAction::MarkAsRead { .. } => {
                        let events = self.bridge.process_app_action(action);
                        for event in events {
                            queue.extend(self.app.handle(event));
                        }
                        self.flush_outgoing().await;
                    },
                }
            }
        }
        Ok(false)
    }

    /// Hand session events to the App and run whatever it asks for.
    async fn process_bridge_events(&mut self, events: Vec<AppEvent>) -> Result<bool, D::Error> {
        for event in events {
            let reaction = self.app.handle(event);
            if self.process_actions(reaction).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Execute all pending transport requests.
    async fn flush_outgoing(&mut self) {
        for request in self.bridge.take_outgoing() {
            match request {
                TransportRequest::Open { token } => self.driver.open_transport(&token).await,
                TransportRequest::Close => self.driver.close_transport(),
                TransportRequest::Send(command) => self.driver.send_command(command).await,
                TransportRequest::FetchHistory(request) => self.driver.fetch_history(request),
            }
        }
    }

    /// UI state.
    pub fn app(&self) -> &App {
        &self.app
    }

    /// Session bridge, for inspecting the client.
    pub fn bridge(&self) -> &Bridge<E> {
        &self.bridge
    }

    /// Driver, mutably. Simulations use this to script input.
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Feed an event straight into the App, as if the driver produced it.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub async fn inject(&mut self, event: AppEvent) -> Result<bool, D::Error> {
        let actions = self.app.handle(event);
        self.process_actions(actions).await
    }
}
