use super::util::{rgb, set_str};
use crate::session::SessionView;
use crate::solfege::{Note, Relative};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

/// Last first-try difference per degree, one row each.
pub struct HistoryWidget<'a> {
    view: &'a SessionView,
}

impl<'a> HistoryWidget<'a> {
    pub fn new(view: &'a SessionView) -> Self {
        Self { view }
    }
}

impl Widget for HistoryWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let title_style = Style::default().fg(Color::DarkGray);
        set_str(buf, area.x, area.y, "last diff", title_style);

        // Top of the list is the top of the range.
        for (row, relative) in Relative::ALL.iter().rev().enumerate() {
            let y = area.y + 1 + row as u16;
            if y >= area.y + area.height {
                break;
            }
            let note = Note::from_relative(*relative);
            let name_style = Style::default().fg(rgb(note.solfege.color));
            set_str(buf, area.x, y, relative.name(), name_style);

            let value = self
                .view
                .last_differences
                .get(relative.name())
                .map(String::as_str)
                .unwrap_or("-");
            let x = area.x + area.width.saturating_sub(value.chars().count() as u16 + 1);
            set_str(buf, x, y, value, Style::default().fg(Color::Gray));
        }
    }
}
