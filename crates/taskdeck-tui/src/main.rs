//! Taskdeck TUI entry point.
//!
//! # Usage
//!
//! ```bash
//! # Session record written by the web login flow
//! taskdeck-tui --server http://localhost:5000 --api http://localhost:5000/api
//!
//! # Verbose client logging
//! RUST_LOG=taskdeck_client=debug taskdeck-tui --session ~/.taskdeck/session.json
//! ```

use std::{
    fs::OpenOptions,
    path::{Path, PathBuf},
    sync::Mutex,
};

use clap::Parser;
use taskdeck_client::{Session, transport::HistoryClient};
use taskdeck_tui::{Runtime, SystemEnv, TerminalDriver};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Taskdeck terminal chat client
#[derive(Parser, Debug)]
#[command(name = "taskdeck-tui")]
#[command(about = "Terminal chat client for Taskdeck")]
#[command(version)]
struct Args {
    /// Socket.IO endpoint of the chat server
    #[arg(short, long, env = "TASKDECK_SERVER", default_value = "http://localhost:5000")]
    server: String,

    /// REST base for message history (`{api}/messages/{peer}`)
    #[arg(short, long, env = "TASKDECK_API", default_value = "http://localhost:5000/api")]
    api: String,

    /// Session record holding the bearer token and signed-in user
    #[arg(long, env = "TASKDECK_SESSION", default_value = "session.json")]
    session: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log file. The terminal belongs to the UI.
    #[arg(long, default_value = "taskdeck-tui.log")]
    log_file: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(&args.log_level, &args.log_file)?;

    let session = Session::load(&args.session)?;
    tracing::info!(user = %session.user.id, server = %args.server, "starting");

    let history = HistoryClient::new(&args.api, session.token.clone())?;
    let driver = TerminalDriver::new(args.server, history)?;
    let runtime = Runtime::new(driver, SystemEnv::new(), session);

    runtime.run().await?;
    tracing::info!("exited");
    Ok(())
}

fn init_logging(level: &str, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .with(filter)
        .init();
    Ok(())
}
