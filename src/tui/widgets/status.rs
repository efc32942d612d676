use super::util::set_str;
use crate::session::SessionView;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::Widget,
};

pub struct StatusWidget<'a> {
    view: &'a SessionView,
    timbre: &'a str,
    audio_ready: bool,
    message: Option<&'a str>,
}

impl<'a> StatusWidget<'a> {
    pub fn new(view: &'a SessionView, timbre: &'a str, audio_ready: bool) -> Self {
        Self {
            view,
            timbre,
            audio_ready,
            message: None,
        }
    }

    pub fn message(mut self, msg: &'a str) -> Self {
        self.message = Some(msg);
        self
    }
}

impl Widget for StatusWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mode_style = Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD);
        let dim_style = Style::default().fg(Color::DarkGray);
        let msg_style = Style::default().fg(Color::White);

        let state = if !self.view.did_answer {
            "LISTEN"
        } else if self.view.is_cleared {
            "CLEARED"
        } else {
            "RETRY"
        };
        set_str(buf, area.x, area.y, &format!("[{state}]"), mode_style);

        let mut x = area.x + state.len() as u16 + 3;
        let difficulty = self.view.difficulty.name();
        set_str(buf, x, area.y, difficulty, dim_style);
        x += difficulty.len() as u16 + 2;

        let audio = if self.audio_ready {
            format!("♪ {}", self.timbre)
        } else {
            "♪ off".to_string()
        };
        set_str(buf, x, area.y, &audio, dim_style);
        x += audio.chars().count() as u16 + 2;

        let hints = "space answer  c cents  1-5 level  t timbre  q quit";
        if x + (hints.len() as u16) < area.x + area.width {
            set_str(buf, x, area.y, hints, dim_style);
        }

        if let Some(msg) = self.message {
            let x = area.x + area.width.saturating_sub(msg.chars().count() as u16 + 1);
            set_str(buf, x, area.y, msg, msg_style);
        }
    }
}
