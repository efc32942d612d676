use super::util::{dimmed, rgb, set_str};
use crate::session::SessionView;
use crate::solfege::Note;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::Widget,
};

/// The header of one note slot: difference readout, the hidden correct card
/// and the answer card with its optional cent readout. The wheel renders
/// separately below.
pub struct NoteColumnWidget<'a> {
    view: &'a SessionView,
    slot: usize,
}

impl<'a> NoteColumnWidget<'a> {
    pub fn new(view: &'a SessionView, slot: usize) -> Self {
        Self { view, slot }
    }
}

impl Widget for NoteColumnWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height < 5 || area.width < 5 {
            return;
        }

        let view = self.view;
        let note = Note::from_relative(view.relative_indexes[self.slot]);
        let name = note.solfege.name;
        let color = note.solfege.color;

        let center = |text: &str| -> u16 {
            area.x + (area.width.saturating_sub(text.chars().count() as u16)) / 2
        };

        // Difference line, shown once answered.
        if view.did_answer {
            let diff = view.fixed_answer_cents[self.slot] - view.correct_cents[self.slot];
            let text = if diff >= 0 {
                format!("+{diff}")
            } else {
                diff.to_string()
            };
            let fg = if diff.abs() > view.threshold {
                Color::Rgb(248, 113, 113)
            } else {
                Color::Rgb(74, 222, 128)
            };
            let style = Style::default().fg(fg).add_modifier(Modifier::BOLD);
            set_str(buf, center(&text), area.y, &text, style);
        }

        // Correct card: grayed out until the answer is committed.
        let correct_style = if view.did_answer {
            Style::default().fg(Color::Black).bg(rgb(color))
        } else {
            Style::default().fg(Color::DarkGray).bg(dimmed(color, 0.25))
        };
        let card: String = format!(" {name} ");
        set_str(buf, center(&card), area.y + 1, &card, correct_style);

        // Answer card.
        let answer_style = Style::default().fg(Color::Black).bg(rgb(color));
        set_str(buf, center(&card), area.y + 3, &card, answer_style);

        if view.did_answer && view.do_show_cent_in_answer {
            let cent = view.answer_cents[self.slot];
            let text = if cent >= 0 {
                format!("+{cent}")
            } else {
                cent.to_string()
            };
            let style = Style::default().fg(Color::Gray);
            set_str(buf, center(&text), area.y + 4, &text, style);
        }
    }
}
