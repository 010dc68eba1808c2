//! Shared styles for the setup-and-stream flow.

use ratatui::style::{Color, Modifier, Style};

pub const ACCENT: Color = Color::Indexed(63);
pub const HIGHLIGHT: Color = Color::Indexed(170);
pub const DIM: Color = Color::Indexed(241);
pub const ERROR_RED: Color = Color::Indexed(196);

/// Bold headline on waiting and list screens.
pub fn title() -> Style {
    Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
}

/// Unselected list entry.
pub fn item() -> Style {
    Style::default()
}

/// The entry under the cursor.
pub fn selected_item() -> Style {
    Style::default().fg(HIGHLIGHT)
}

/// Footer key hints.
pub fn key_hint() -> Style {
    Style::default().fg(DIM)
}

/// Error lines (pairing hints, stream errors, fatal messages).
pub fn error() -> Style {
    Style::default().fg(ERROR_RED)
}

/// Spinner styling.
pub fn spinner() -> Style {
    Style::default().fg(ACCENT)
}
