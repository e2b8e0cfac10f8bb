use ratatui::style::{Color, Modifier, Style};
use vdemo_link::LinkState;

pub const HEADER_STYLE: Style = Style::new()
    .fg(Color::Rgb(191, 219, 254))
    .add_modifier(Modifier::BOLD);
pub const MUTED_STYLE: Style = Style::new().fg(Color::Rgb(148, 163, 184));
pub const TEXT_STYLE: Style = Style::new().fg(Color::Rgb(226, 232, 240));
pub const BORDER_STYLE: Style = Style::new().fg(Color::Rgb(71, 85, 105));
pub const VERSION_STYLE: Style = Style::new()
    .fg(Color::Rgb(226, 232, 240))
    .add_modifier(Modifier::BOLD);
pub const WARNING_VERSION_STYLE: Style = Style::new()
    .fg(Color::Rgb(255, 0, 0))
    .add_modifier(Modifier::BOLD);
pub const BUTTON_STYLE: Style = Style::new()
    .bg(Color::Rgb(63, 81, 181))
    .fg(Color::White)
    .add_modifier(Modifier::BOLD);
pub const SELECTED_BUTTON_STYLE: Style = Style::new()
    .bg(Color::Rgb(76, 187, 23))
    .fg(Color::Black)
    .add_modifier(Modifier::BOLD);
pub const EDITOR_STYLE: Style = Style::new()
    .bg(Color::Rgb(17, 26, 46))
    .fg(Color::Rgb(250, 189, 47))
    .add_modifier(Modifier::BOLD);

pub fn link_state_color(state: LinkState) -> Color {
    match state {
        LinkState::Connecting => Color::Rgb(245, 158, 11),
        LinkState::Ready => Color::Rgb(34, 197, 94),
        LinkState::Closed => Color::Rgb(239, 68, 68),
    }
}
