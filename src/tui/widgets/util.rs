use ratatui::{
    buffer::Buffer,
    style::{Color, Style},
};

pub fn set_cell(buf: &mut Buffer, x: u16, y: u16, ch: char, style: Style) {
    if let Some(cell) = buf.cell_mut((x, y)) {
        cell.set_char(ch).set_style(style);
    }
}

pub fn set_str(buf: &mut Buffer, x: u16, y: u16, s: &str, style: Style) {
    for (i, ch) in s.chars().enumerate() {
        set_cell(buf, x + i as u16, y, ch, style);
    }
}

pub fn rgb(color: (u8, u8, u8)) -> Color {
    Color::Rgb(color.0, color.1, color.2)
}

pub fn dimmed(color: (u8, u8, u8), brightness: f32) -> Color {
    let scale = |c: u8| (c as f32 * brightness) as u8;
    Color::Rgb(scale(color.0), scale(color.1), scale(color.2))
}

// Disabled controls share one gray.
pub const DISABLED_COLOR: (u8, u8, u8) = (107, 114, 128);
