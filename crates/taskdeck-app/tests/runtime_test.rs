//! Runtime orchestration against a scripted driver.

use std::{collections::VecDeque, future::Future, time::Duration};

use taskdeck_app::{App, AppEvent, Driver, KeyInput, Runtime};
use taskdeck_client::{CurrentUser, Environment, HistoryRequest, Session, TransportEvent};
use taskdeck_proto::{ClientCommand, UserId};

#[derive(Clone)]
struct FixedClock;

impl Environment for FixedClock {
    type Instant = Duration;

    fn now(&self) -> Duration {
        Duration::ZERO
    }

    fn sleep(&self, _duration: Duration) -> impl Future<Output = ()> + Send {
        std::future::ready(())
    }
}

#[derive(Debug)]
struct RenderError;

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("render failed")
    }
}

impl std::error::Error for RenderError {}

/// Driver that replays queued input and records every I/O request.
#[derive(Default)]
struct ScriptedDriver {
    input: VecDeque<AppEvent>,
    transport: VecDeque<TransportEvent>,
    opened: Vec<String>,
    closed: usize,
    sent: Vec<ClientCommand>,
    fetches: Vec<HistoryRequest>,
    renders: usize,
    fail_render: bool,
    stopped: bool,
}

impl Driver for ScriptedDriver {
    type Error = RenderError;
    type Instant = Duration;

    async fn poll_event(&mut self) -> Result<Option<AppEvent>, Self::Error> {
        Ok(self.input.pop_front())
    }

    async fn open_transport(&mut self, token: &str) {
        self.opened.push(token.to_string());
        self.transport.push_back(TransportEvent::Opened);
    }

    fn close_transport(&mut self) {
        self.closed += 1;
    }

    async fn send_command(&mut self, command: ClientCommand) {
        self.sent.push(command);
    }

    fn fetch_history(&mut self, request: HistoryRequest) {
        self.fetches.push(request);
    }

    async fn recv_event(&mut self) -> Option<TransportEvent> {
        self.transport.pop_front()
    }

    fn now(&self) -> Duration {
        Duration::ZERO
    }

    fn render(&mut self, _app: &App) -> Result<(), Self::Error> {
        if self.fail_render {
            return Err(RenderError);
        }
        self.renders += 1;
        Ok(())
    }

    fn stop(&mut self) {
        self.stopped = true;
    }
}

fn session() -> Session {
    Session::new("tok", CurrentUser { id: UserId::from("me"), name: "Me".into(), email: None })
}

fn keys(text: &str) -> impl Iterator<Item = AppEvent> + '_ {
    text.chars().map(|c| AppEvent::Key(KeyInput::Char(c)))
}

#[tokio::test]
async fn run_connects_and_quits_on_esc() {
    let mut driver = ScriptedDriver::default();
    driver.input.push_back(AppEvent::Tick);
    driver.input.push_back(AppEvent::Key(KeyInput::Esc));

    let mut runtime = Runtime::new(driver, FixedClock, session());
    runtime.start().await.unwrap();
    assert_eq!(runtime.driver().opened, ["tok"]);

    while !runtime.step().await.unwrap() {}
    assert!(runtime.app().is_connected());
    assert_eq!(runtime.driver().sent, [ClientCommand::GetConversations]);

    runtime.finish().await;
    assert!(runtime.driver().stopped);
    assert_eq!(runtime.driver().closed, 1);
}

#[tokio::test]
async fn quit_command_ends_run() {
    let mut driver = ScriptedDriver::default();
    driver.input.extend(keys("/quit"));
    driver.input.push_back(AppEvent::Key(KeyInput::Enter));

    let runtime = Runtime::new(driver, FixedClock, session());
    runtime.run().await.unwrap();
}

#[tokio::test]
async fn render_failure_is_fatal() {
    let driver = ScriptedDriver { fail_render: true, ..ScriptedDriver::default() };
    let runtime = Runtime::new(driver, FixedClock, session());
    assert!(runtime.run().await.is_err());
}

#[tokio::test]
async fn disconnect_command_closes_channel() {
    let mut driver = ScriptedDriver::default();
    driver.input.extend(keys("/disconnect"));
    driver.input.push_back(AppEvent::Key(KeyInput::Enter));

    let mut runtime = Runtime::new(driver, FixedClock, session());
    runtime.start().await.unwrap();
    for _ in 0..12 {
        assert!(!runtime.step().await.unwrap());
    }

    assert!(!runtime.app().is_connected());
    assert_eq!(runtime.driver().closed, 1);
    assert!(runtime.driver().renders > 0);
}

#[tokio::test]
async fn injected_events_reach_the_app() {
    let mut runtime = Runtime::new(ScriptedDriver::default(), FixedClock, session());
    let quit = runtime.inject(AppEvent::Resize(120, 40)).await.unwrap();

    assert!(!quit);
    assert_eq!(runtime.app().terminal_size(), (120, 40));
    assert!(runtime.driver().fetches.is_empty());
}
