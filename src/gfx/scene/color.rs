//! Hex color decoding
//!
//! Entity colors are written the short way (`"f80"`, `"f808"`) or the long way
//! (`"ff8800"`, `"ff880080"`), with or without a leading `#`. Short forms scale
//! each digit by 15, long forms each pair by 255. Alpha defaults to 1.

use thiserror::Error;

/// Color used when an entity's color string can't be decoded.
pub const FALLBACK_COLOR: &str = "888";

/// Errors produced while decoding a hex color string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorError {
    #[error("hex color must have 3, 4, 6 or 8 digits, got {0}")]
    InvalidLength(usize),
    #[error("invalid hex digit '{0}' in color")]
    InvalidDigit(char),
}

/// Normalized RGBA color, every channel in `0.0..=1.0`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const WHITE: Rgba = Rgba::new(1.0, 1.0, 1.0, 1.0);
    pub const GREY: Rgba = Rgba::new(8.0 / 15.0, 8.0 / 15.0, 8.0 / 15.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Whether the color is fully opaque
    pub fn is_opaque(&self) -> bool {
        self.a >= 1.0
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl From<Rgba> for wgpu::Color {
    fn from(c: Rgba) -> Self {
        wgpu::Color {
            r: c.r as f64,
            g: c.g as f64,
            b: c.b as f64,
            a: c.a as f64,
        }
    }
}

/// Decodes an rgb / rgba / rrggbb / rrggbbaa hex string
pub fn parse_hex_color(input: &str) -> Result<Rgba, ColorError> {
    let digits = input.trim().trim_start_matches('#');

    let (step, scale) = match digits.len() {
        3 | 4 => (1, 15.0),
        6 | 8 => (2, 255.0),
        n => return Err(ColorError::InvalidLength(n)),
    };

    if let Some(bad) = digits.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(ColorError::InvalidDigit(bad));
    }

    // Length and digits are validated, so every chunk parses.
    let channels: Vec<f32> = digits
        .as_bytes()
        .chunks(step)
        .map(|chunk| {
            let text = std::str::from_utf8(chunk).unwrap_or("0");
            u8::from_str_radix(text, 16).unwrap_or(0) as f32 / scale
        })
        .collect();

    Ok(Rgba {
        r: channels[0],
        g: channels[1],
        b: channels[2],
        a: channels.get(3).copied().unwrap_or(1.0),
    })
}

/// Decodes a color, falling back to grey with a warning when it's malformed
pub fn color_or_fallback(input: &str) -> Rgba {
    match parse_hex_color(input) {
        Ok(color) => color,
        Err(err) => {
            log::warn!("Color '{}' is not usable ({}), drawing it grey", input, err);
            Rgba::GREY
        }
    }
}
