//! Chat area
//!
//! Displays the log of the open conversation, newest at the bottom.

use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
};
use taskdeck_app::App;
use taskdeck_proto::Message;

const BORDER_SIZE: u16 = 2;
const READ_MARKER: &str = " [read]";

/// Render the chat area.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let hint = Style::default().fg(Color::DarkGray);

    let Some(conversation) = app.active_conversation() else {
        let block = Block::default().borders(Borders::ALL).title(" No conversation ");
        let items = vec![ListItem::new(Span::styled("Press Tab to open a chat", hint))];
        frame.render_widget(List::new(items).block(block), area);
        return;
    };

    let peer_name = if conversation.name.is_empty() {
        conversation.peer_id.as_str()
    } else {
        conversation.name.as_str()
    };
    let block = Block::default().borders(Borders::ALL).title(format!(" {peer_name} "));

    let mut items: Vec<ListItem> =
        app.messages().iter().map(|message| message_item(app, peer_name, message)).collect();

    if items.is_empty() && app.is_loading() {
        items.push(ListItem::new(Span::styled("Loading...", hint)));
    }
    if app.is_typing(&conversation.peer_id) {
        items.push(ListItem::new(Span::styled(
            format!("{peer_name} is typing..."),
            hint.add_modifier(Modifier::ITALIC),
        )));
    }

    let visible_height = area.height.saturating_sub(BORDER_SIZE) as usize;
    let skip = items.len().saturating_sub(visible_height);
    let visible_items: Vec<_> = items.into_iter().skip(skip).collect();

    frame.render_widget(List::new(visible_items).block(block), area);
}

fn message_item<'a>(app: &App, peer_name: &'a str, message: &'a Message) -> ListItem<'a> {
    let mine = message.sender_id == *app.me();
    let (sender, color) = if mine { ("you", Color::Blue) } else { (peer_name, Color::Green) };

    let mut spans = vec![
        Span::styled(format!("<{sender}>"), Style::default().fg(color).add_modifier(Modifier::BOLD)),
        Span::raw(" "),
        Span::raw(message.text.as_str()),
    ];
    if mine && message.is_read {
        spans.push(Span::styled(READ_MARKER, Style::default().fg(Color::DarkGray)));
    }

    ListItem::new(Line::from(spans))
}
