//! The small slice of CSS the render surface understands: user-agent defaults
//! per tag plus inline `style` declarations.

use crate::dom::Element;

/// Root font size of the surface document.
pub const BASE_FONT_PX: f32 = 16.0;
pub const LINE_HEIGHT: f32 = 1.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(0xff, 0xff, 0xff);
    pub const FOREGROUND: Color = Color::rgb(0x11, 0x11, 0x11);
    pub const LINK: Color = Color::rgb(0x00, 0x00, 0xee);
    pub const RULE: Color = Color::rgb(0xcc, 0xcc, 0xcc);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

impl TextAlign {
    /// Share of the free line width placed before the line.
    pub fn offset_factor(self) -> f32 {
        match self {
            TextAlign::Left => 0.0,
            TextAlign::Center => 0.5,
            TextAlign::Right => 1.0,
        }
    }
}

/// Resolved style of one element. Everything except `background` inherits.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedStyle {
    pub color: Color,
    pub background: Option<Color>,
    pub font_size: f32,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub align: TextAlign,
}

impl ComputedStyle {
    pub fn root() -> Self {
        Self {
            color: Color::FOREGROUND,
            background: None,
            font_size: BASE_FONT_PX,
            bold: false,
            italic: false,
            underline: false,
            align: TextAlign::Left,
        }
    }

    /// Style of `element` laid out inside a parent styled `self`.
    pub fn child(&self, element: &Element) -> Self {
        let mut style = Self {
            background: None,
            ..self.clone()
        };
        style.apply_tag_defaults(&element.tag, self.font_size);
        if let Some(declarations) = element.attr("style") {
            style.apply_declarations(declarations, self.font_size);
        }
        style
    }

    pub fn line_height(&self) -> f32 {
        self.font_size * LINE_HEIGHT
    }

    fn apply_tag_defaults(&mut self, tag: &str, parent_size: f32) {
        match tag {
            "h1" => self.heading(parent_size * 2.0),
            "h2" => self.heading(parent_size * 1.5),
            "h3" => self.heading(parent_size * 1.17),
            "h4" => self.heading(parent_size),
            "h5" => self.heading(parent_size * 0.83),
            "h6" => self.heading(parent_size * 0.67),
            "strong" | "b" | "th" => self.bold = true,
            "em" | "i" | "cite" | "address" => self.italic = true,
            "u" | "ins" => self.underline = true,
            "small" => self.font_size = parent_size * 0.83,
            "a" => {
                if self.color == Color::FOREGROUND {
                    self.color = Color::LINK;
                }
                self.underline = true;
            }
            "center" => self.align = TextAlign::Center,
            _ => {}
        }
    }

    fn heading(&mut self, size: f32) {
        self.font_size = size;
        self.bold = true;
    }

    fn apply_declarations(&mut self, declarations: &str, parent_size: f32) {
        for (name, value) in parse_declarations(declarations) {
            match name.as_str() {
                "color" => {
                    if let Some(Some(color)) = parse_color(&value) {
                        self.color = color;
                    }
                }
                "background-color" | "background" => {
                    let parsed = value.split_whitespace().find_map(parse_color);
                    if let Some(color) = parsed {
                        self.background = color;
                    }
                }
                "font-weight" => {
                    if let Some(bold) = parse_weight(&value) {
                        self.bold = bold;
                    }
                }
                "font-style" => self.italic = matches!(value.as_str(), "italic" | "oblique"),
                "font-size" => {
                    if let Some(size) = parse_length(&value, parent_size) {
                        self.font_size = size.max(1.0);
                    }
                }
                "text-align" => match value.as_str() {
                    "center" => self.align = TextAlign::Center,
                    "right" | "end" => self.align = TextAlign::Right,
                    "left" | "start" | "justify" => self.align = TextAlign::Left,
                    _ => {}
                },
                "text-decoration" | "text-decoration-line" => {
                    if value.contains("underline") {
                        self.underline = true;
                    } else if value == "none" {
                        self.underline = false;
                    }
                }
                _ => {}
            }
        }
    }
}

/// Splits a declaration block into lower-case names and trimmed values.
pub fn parse_declarations(block: &str) -> Vec<(String, String)> {
    block
        .split(';')
        .filter_map(|declaration| {
            let (name, value) = declaration.split_once(':')?;
            let value = value.trim();
            let value = value
                .strip_suffix("!important")
                .map(str::trim_end)
                .unwrap_or(value);
            let name = name.trim().to_ascii_lowercase();
            (!name.is_empty() && !value.is_empty()).then(|| (name, value.to_ascii_lowercase()))
        })
        .collect()
}

/// `Some(None)` is a recognised fully transparent color.
pub fn parse_color(value: &str) -> Option<Option<Color>> {
    let value = value.trim().to_ascii_lowercase();
    if let Some(hex) = value.strip_prefix('#') {
        return parse_hex(hex).map(Some);
    }
    if let Some(args) = value
        .strip_prefix("rgba(")
        .or_else(|| value.strip_prefix("rgb("))
        .and_then(|rest| rest.strip_suffix(')'))
    {
        return parse_rgb_args(args);
    }
    named_color(&value)
}

fn parse_hex(hex: &str) -> Option<Color> {
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let digit = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok();
    let pair = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        3 | 4 => Some(Color::rgb(digit(0)? * 17, digit(1)? * 17, digit(2)? * 17)),
        6 | 8 => Some(Color::rgb(pair(0)?, pair(2)?, pair(4)?)),
        _ => None,
    }
}

fn parse_rgb_args(args: &str) -> Option<Option<Color>> {
    let parts: Vec<&str> = args
        .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .collect();
    if parts.len() < 3 {
        return None;
    }
    if let Some(alpha) = parts.get(3) {
        let alpha = match alpha.strip_suffix('%') {
            Some(pct) => pct.parse::<f32>().ok()? / 100.0,
            None => alpha.parse::<f32>().ok()?,
        };
        if alpha <= 0.0 {
            return Some(None);
        }
    }
    let channel = |raw: &str| -> Option<u8> {
        let value = match raw.strip_suffix('%') {
            Some(pct) => pct.parse::<f32>().ok()? * 2.55,
            None => raw.parse::<f32>().ok()?,
        };
        Some(value.round().clamp(0.0, 255.0) as u8)
    };
    Some(Some(Color::rgb(
        channel(parts[0])?,
        channel(parts[1])?,
        channel(parts[2])?,
    )))
}

fn named_color(name: &str) -> Option<Option<Color>> {
    let color = match name {
        "transparent" => return Some(None),
        "black" => Color::rgb(0, 0, 0),
        "white" => Color::WHITE,
        "red" => Color::rgb(0xff, 0, 0),
        "green" => Color::rgb(0, 0x80, 0),
        "blue" => Color::rgb(0, 0, 0xff),
        "navy" => Color::rgb(0, 0, 0x80),
        "maroon" => Color::rgb(0x80, 0, 0),
        "purple" => Color::rgb(0x80, 0, 0x80),
        "teal" => Color::rgb(0, 0x80, 0x80),
        "orange" => Color::rgb(0xff, 0xa5, 0),
        "gray" | "grey" => Color::rgb(0x80, 0x80, 0x80),
        "silver" => Color::rgb(0xc0, 0xc0, 0xc0),
        "darkgray" | "darkgrey" => Color::rgb(0xa9, 0xa9, 0xa9),
        "lightgray" | "lightgrey" => Color::rgb(0xd3, 0xd3, 0xd3),
        _ => return None,
    };
    Some(Some(color))
}

fn parse_weight(value: &str) -> Option<bool> {
    match value {
        "bold" | "bolder" => Some(true),
        "normal" | "lighter" => Some(false),
        numeric => numeric.parse::<u16>().ok().map(|weight| weight >= 600),
    }
}

/// Resolves a font-size value against the parent size.
pub fn parse_length(value: &str, parent_size: f32) -> Option<f32> {
    let number = |suffix: &str| value.strip_suffix(suffix)?.trim().parse::<f32>().ok();
    if let Some(px) = number("px") {
        Some(px)
    } else if let Some(rem) = number("rem") {
        Some(rem * BASE_FONT_PX)
    } else if let Some(em) = number("em") {
        Some(em * parent_size)
    } else if let Some(pt) = number("pt") {
        Some(pt * 96.0 / 72.0)
    } else if let Some(pct) = number("%") {
        Some(pct * parent_size / 100.0)
    } else {
        match value {
            "small" => Some(13.0),
            "medium" => Some(BASE_FONT_PX),
            "large" => Some(18.0),
            "x-large" => Some(24.0),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_color_notations() {
        assert_eq!(parse_color("#111"), Some(Some(Color::FOREGROUND)));
        assert_eq!(parse_color("#0000EE"), Some(Some(Color::LINK)));
        assert_eq!(parse_color("rgb(17, 17, 17)"), Some(Some(Color::FOREGROUND)));
        assert_eq!(parse_color("rgba(0 0 0 / 0)"), Some(None));
        assert_eq!(parse_color("oklch(0.2 0.1 10)"), None);
    }

    #[test]
    fn inline_declarations_override_tag_defaults() {
        let mut heading = Element::new("h1");
        heading
            .attrs
            .push(("style".into(), "font-weight: 400; font-size: 20px; color: navy".into()));
        let style = ComputedStyle::root().child(&heading);
        assert!(!style.bold);
        assert_eq!(style.font_size, 20.0);
        assert_eq!(style.color, Color::rgb(0, 0, 0x80));
    }

    #[test]
    fn em_sizes_resolve_against_parent() {
        assert_eq!(parse_length("1.5em", 10.0), Some(15.0));
        assert_eq!(parse_length("12pt", 10.0), Some(16.0));
    }
}
