//! Composer line.
//!
//! Long drafts scroll horizontally so the cursor cell is always on screen.

use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use taskdeck_app::InputState;

const PROMPT: &str = "> ";

/// Left border plus the prompt.
const TEXT_COLUMN: u16 = 3;

/// Render the composer and place the terminal cursor inside it.
pub fn render(frame: &mut Frame, input: &InputState, area: Rect) {
    // Cells between the prompt and the right border.
    let room = usize::from(area.width.saturating_sub(TEXT_COLUMN + 1));
    let first_visible = input.cursor().saturating_sub(room.saturating_sub(1));
    let visible: String = input.buffer().chars().skip(first_visible).take(room).collect();

    let text_style = if input.is_command() {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::White)
    };
    let line = Line::from(vec![Span::raw(PROMPT), Span::styled(visible, text_style)]);
    frame.render_widget(Paragraph::new(line).block(Block::default().borders(Borders::ALL)), area);

    let column = u16::try_from(input.cursor() - first_visible).unwrap_or(u16::MAX);
    let x = area.x.saturating_add(TEXT_COLUMN).saturating_add(column);
    frame.set_cursor_position((x.min(area.right().saturating_sub(1)), area.y.saturating_add(1)));
}
