//! Terminal rendering.
//!
//! Pure functions from [`App`] state to ratatui widgets. Nothing here touches
//! the terminal directly; the driver hands in the frame.

mod chat;
mod conversations;
mod input;
mod status;

use ratatui::{
    Frame,
    layout::{Constraint, Layout},
};

use crate::App;

/// Width of the conversation list.
const SIDEBAR_WIDTH: u16 = 18;

/// Draw one full frame: conversation list and chat on top, then the composer
/// and a single status row.
pub fn render(frame: &mut Frame, app: &App) {
    let [body, composer, status_row] =
        Layout::vertical([Constraint::Min(3), Constraint::Length(3), Constraint::Length(1)])
            .areas(frame.area());
    let [sidebar, chat_pane] =
        Layout::horizontal([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(20)]).areas(body);

    conversations::render(frame, app, sidebar);
    chat::render(frame, app, chat_pane);
    input::render(frame, app.input(), composer);
    status::render(frame, app, status_row);
}
