use super::util::{DISABLED_COLOR, dimmed, rgb, set_str};
use crate::wheel::{self, WheelSelector};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

/// One wheel as a vertical bar column. Each terminal row is one index step;
/// higher pitch is up, the center row is the selected cent.
pub struct WheelWidget<'a> {
    wheel: &'a WheelSelector,
}

impl<'a> WheelWidget<'a> {
    pub fn new(wheel: &'a WheelSelector) -> Self {
        Self { wheel }
    }
}

impl Widget for WheelWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width < 3 || area.height == 0 {
            return;
        }

        let color = if self.wheel.disabled() {
            DISABLED_COLOR
        } else {
            self.wheel.color()
        };

        let center_row = area.height / 2;
        let bar_width = (area.width - 2) as usize;
        let bar: String = "─".repeat(bar_width);
        let selected: String = "━".repeat(bar_width);

        for row in 0..area.height {
            let y = area.y + row;
            // Rows above the center hold higher indexes.
            let offset = center_row as i32 - row as i32;
            let index = self.wheel.index() + offset;
            if !(0..wheel::ITEM_COUNT).contains(&index) {
                continue;
            }

            if row == center_row {
                let style = Style::default().fg(rgb(color));
                set_str(buf, area.x, y, "▶", style);
                set_str(buf, area.x + 1, y, &selected, style);
                set_str(buf, area.x + area.width - 1, y, "◀", style);
            } else {
                let distance = offset.unsigned_abs() as f32;
                let fade = (1.0 - distance / area.height as f32).max(0.15) * 0.45;
                let style = Style::default().fg(dimmed(color, fade));
                set_str(buf, area.x + 1, y, &bar, style);
            }
        }

        if self.wheel.is_dragging() {
            let style = Style::default().fg(Color::White);
            set_str(buf, area.x, area.y + center_row, "▶", style);
        }
    }
}
