//! Status bar
//!
//! Displays connection status, the open conversation and the last notice.

use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};
use taskdeck_core::ConnectionState;

use crate::App;

/// Render the status bar.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let conversation = app.active_conversation().map_or_else(String::new, |conversation| {
        let presence = app.presence(&conversation.peer_id).label();
        format!(" | {} ({presence})", conversation.name)
    });
    let notice = app.status_message().map_or_else(String::new, |message| format!(" | {message}"));

    let line = Line::from(vec![
        Span::raw(" "),
        connection_badge(app.connection_state()),
        Span::styled(conversation, Style::default().fg(Color::Gray)),
        Span::styled(notice, Style::default().fg(Color::Yellow)),
    ]);
    let bar = Style::default().bg(Color::DarkGray).fg(Color::White);
    frame.render_widget(Paragraph::new(line).style(bar), area);
}

fn connection_badge(state: &ConnectionState) -> Span<'static> {
    let (label, color) = match state {
        ConnectionState::Disconnected => ("Disconnected", Color::Red),
        ConnectionState::Connecting => ("Connecting...", Color::Yellow),
        ConnectionState::Connected => ("Connected", Color::Green),
        ConnectionState::Errored { .. } => ("Connection error", Color::Red),
    };
    let style = Style::default().fg(color);
    if matches!(state, ConnectionState::Connected) {
        Span::styled(label, style.add_modifier(Modifier::BOLD))
    } else {
        Span::styled(label, style)
    }
}
