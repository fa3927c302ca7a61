//! Conversation sidebar
//!
//! Lists conversations in server order with presence and unread markers.

use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
};
use taskdeck_app::{App, Presence};
use taskdeck_proto::Conversation;

const ACTIVE_PREFIX: &str = ">";
const INACTIVE_PREFIX: &str = " ";

enum ConversationDisplayState {
    Active,
    Unread,
    Normal,
}

/// Render the conversation sidebar.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .conversations()
        .iter()
        .enumerate()
        .map(|(index, conversation)| item(app, conversation, index == app.selected()))
        .collect();

    let block = Block::default().borders(Borders::ALL).title(" Conversations ");
    let list = List::new(items).block(block);

    frame.render_widget(list, area);
}

fn item<'a>(app: &App, conversation: &'a Conversation, selected: bool) -> ListItem<'a> {
    let state = if app.active_peer() == Some(&conversation.peer_id) {
        ConversationDisplayState::Active
    } else if conversation.unread_count > 0 {
        ConversationDisplayState::Unread
    } else {
        ConversationDisplayState::Normal
    };

    let (prefix, suffix, mut style) = match state {
        ConversationDisplayState::Active => (
            ACTIVE_PREFIX,
            String::new(),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ),
        ConversationDisplayState::Unread => (
            INACTIVE_PREFIX,
            format!(" ({})", conversation.unread_count),
            Style::default().fg(Color::Cyan),
        ),
        ConversationDisplayState::Normal => (INACTIVE_PREFIX, String::new(), Style::default()),
    };
    if selected {
        style = style.add_modifier(Modifier::REVERSED);
    }

    let name = if conversation.name.is_empty() {
        conversation.peer_id.as_str()
    } else {
        conversation.name.as_str()
    };

    ListItem::new(Line::from(vec![
        Span::raw(prefix),
        presence_marker(app.presence(&conversation.peer_id)),
        Span::styled(name, style),
        Span::styled(suffix, Style::default().fg(Color::Red)),
    ]))
}

fn presence_marker(presence: Presence) -> Span<'static> {
    match presence {
        Presence::Online => Span::styled("+ ", Style::default().fg(Color::Green)),
        Presence::Offline => Span::styled("- ", Style::default().fg(Color::DarkGray)),
        Presence::Unknown => Span::styled("? ", Style::default().fg(Color::DarkGray)),
    }
}
