//! Renderer - ViewState to text frame
//!
//! `render` is pure: same state, same frame. `to_text` only adds color to the
//! spinner glyph for the terminal.

use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span, Text};

use super::state::ViewState;

const IN_PROGRESS_LABEL: &str = "Update in progress";
const COMPLETE_LABEL: &str = "Update complete";
const SPINNER_COLOR: Color = Color::Indexed(205);

/// Render the frame as plain text
pub fn render(state: &ViewState) -> String {
    let mut lists = String::new();
    if state.has_resources() {
        lists.push_str(&format!(
            "\n\n{}: [{}]",
            IN_PROGRESS_LABEL,
            state.in_progress_kinds().join(", ")
        ));
        lists.push_str(&format!(
            "\n\n{}: [{}]",
            COMPLETE_LABEL,
            state.completed_kinds().join(", ")
        ));
    }

    let mut frame = format!(
        "\n{}Current step: {}{}\n",
        state.spinner_text(),
        state.current_message,
        lists
    );
    if state.quitting {
        frame.push('\n');
    }
    frame
}

/// Render the frame as styled ratatui text
pub fn to_text(state: &ViewState) -> Text<'static> {
    let spinner = state.spinner_text();
    let lines: Vec<Line<'static>> = render(state)
        .lines()
        .map(|line| match line.strip_prefix(spinner) {
            Some(rest) if !spinner.is_empty() => Line::from(vec![
                Span::styled(spinner, Style::default().fg(SPINNER_COLOR)),
                Span::raw(rest.to_string()),
            ]),
            _ => Line::raw(line.to_string()),
        })
        .collect();
    Text::from(lines)
}
