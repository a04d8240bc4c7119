//! Flows the surface document into positioned boxes.
//!
//! Normal flow only: block boxes stack vertically with collapsing margins,
//! inline content wraps greedily at spaces. Everything is in CSS pixels.

use std::sync::Arc;

use base64::Engine as _;
use image::RgbaImage;
use url::Url;

use crate::dom::{Element, Node};
use crate::fonts::{FaceKey, FontBook};
use crate::style::{Color, ComputedStyle};
use crate::types::PageGeometry;

/// Size given to images whose dimensions cannot be known.
const UNKNOWN_IMAGE_PX: f32 = 24.0;
const LIST_INDENT_PX: f32 = 40.0;

#[derive(Debug, Clone)]
pub enum ImageSource {
    Decoded(Arc<RgbaImage>),
    /// Served from another origin; reading it back would taint the canvas.
    CrossOrigin(String),
    /// Not loadable inside the isolated surface.
    Unsupported(String),
}

#[derive(Debug, Clone)]
pub enum DisplayItem {
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Color,
    },
    Text {
        x: f32,
        baseline: f32,
        text: String,
        face: FaceKey,
        size: f32,
        color: Color,
    },
    Image {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        source: ImageSource,
    },
}

#[derive(Debug, Clone)]
pub struct DisplayList {
    pub width: f32,
    pub height: f32,
    pub items: Vec<DisplayItem>,
}

impl DisplayList {
    /// Text of every text item, in paint order.
    pub fn texts(&self) -> Vec<&str> {
        self.items
            .iter()
            .filter_map(|item| match item {
                DisplayItem::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// Lays out the children of the page root.
pub fn layout_page(page: &Element, geometry: &PageGeometry, fonts: &dyn FontBook) -> DisplayList {
    let padding = geometry.padding_px();
    let column = Column {
        x: padding,
        width: geometry.content_width_px(),
    };
    let mut flow = Flow {
        fonts,
        items: Vec::new(),
        y: padding,
        pending_margin: 0.0,
        pending_marker: None,
        list_depth: 0,
    };
    flow.layout_children(&page.children, &ComputedStyle::root(), column);

    let content_bottom = flow.y + flow.pending_margin + padding;
    DisplayList {
        width: geometry.width_px(),
        height: content_bottom.max(geometry.min_height_px()).ceil(),
        items: flow.items,
    }
}

#[derive(Debug, Clone, Copy)]
struct Column {
    x: f32,
    width: f32,
}

impl Column {
    fn inset(self, left: f32, right: f32) -> Self {
        Self {
            x: self.x + left,
            width: (self.width - left - right).max(1.0),
        }
    }
}

struct Marker {
    text: String,
    style: ComputedStyle,
}

enum Token<'a> {
    Word { text: String, style: usize },
    Space { style: usize },
    Break,
    Image(&'a Element),
}

struct Piece {
    text: String,
    style: usize,
    width: f32,
    is_space: bool,
}

struct Flow<'f> {
    fonts: &'f dyn FontBook,
    items: Vec<DisplayItem>,
    y: f32,
    pending_margin: f32,
    pending_marker: Option<Marker>,
    list_depth: usize,
}

fn is_block(tag: &str) -> bool {
    matches!(
        tag,
        "address"
            | "article"
            | "aside"
            | "blockquote"
            | "dd"
            | "div"
            | "dl"
            | "dt"
            | "fieldset"
            | "figcaption"
            | "figure"
            | "footer"
            | "form"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "header"
            | "hr"
            | "li"
            | "main"
            | "nav"
            | "ol"
            | "p"
            | "pre"
            | "section"
            | "table"
            | "tbody"
            | "td"
            | "tfoot"
            | "th"
            | "thead"
            | "tr"
            | "ul"
    )
}

fn face_of(style: &ComputedStyle) -> FaceKey {
    FaceKey::new(style.bold, style.italic)
}

impl Flow<'_> {
    fn add_margin(&mut self, margin: f32) {
        self.pending_margin = self.pending_margin.max(margin);
    }

    fn commit_margin(&mut self) {
        self.y += self.pending_margin;
        self.pending_margin = 0.0;
    }

    fn layout_children(&mut self, children: &[Node], style: &ComputedStyle, column: Column) {
        let mut styles = vec![style.clone()];
        let mut tokens = Vec::new();
        let mut last_was_space = true;

        for child in children {
            match child {
                Node::Element(element) if is_block(&element.tag) => {
                    self.flush_inline(&tokens, &styles, style, column);
                    tokens.clear();
                    styles.truncate(1);
                    last_was_space = true;
                    self.layout_block(element, style, column);
                }
                _ => tokenize(child, style, 0, &mut styles, &mut tokens, &mut last_was_space),
            }
        }
        self.flush_inline(&tokens, &styles, style, column);
    }

    fn layout_block(&mut self, element: &Element, parent: &ComputedStyle, column: Column) {
        let style = parent.child(element);
        let em = style.font_size;
        let tag = element.tag.as_str();

        if tag == "hr" {
            self.add_margin(em * 0.5);
            self.commit_margin();
            self.items.push(DisplayItem::Rect {
                x: column.x,
                y: self.y,
                width: column.width,
                height: 1.0,
                color: Color::RULE,
            });
            self.y += 1.0;
            self.add_margin(em * 0.5);
            return;
        }

        let margin = match tag {
            "p" | "blockquote" | "figure" | "dl" | "pre" => em,
            "ul" | "ol" if self.list_depth == 0 => em,
            "h1" => em * 0.67,
            "h2" => em * 0.83,
            "h3" => em,
            "h4" => em * 1.33,
            "h5" => em * 1.67,
            "h6" => em * 2.33,
            _ => 0.0,
        };
        let inner = match tag {
            "ul" | "ol" => column.inset(LIST_INDENT_PX, 0.0),
            "blockquote" | "figure" => column.inset(LIST_INDENT_PX, LIST_INDENT_PX),
            "dd" => column.inset(LIST_INDENT_PX, 0.0),
            _ => column,
        };

        self.add_margin(margin);
        let background = style.background.map(|color| {
            self.commit_margin();
            (self.items.len(), self.y, color)
        });

        match tag {
            "ul" | "ol" => self.layout_list(element, &style, inner),
            _ => self.layout_children(&element.children, &style, inner),
        }

        if let Some((index, top, color)) = background {
            self.items.insert(
                index,
                DisplayItem::Rect {
                    x: column.x,
                    y: top,
                    width: column.width,
                    height: (self.y - top).max(0.0),
                    color,
                },
            );
        }
        self.add_margin(margin);
    }

    fn layout_list(&mut self, list: &Element, style: &ComputedStyle, column: Column) {
        let ordered = list.tag == "ol";
        let mut ordinal = list
            .attr("start")
            .and_then(|start| start.trim().parse::<i64>().ok())
            .unwrap_or(1);

        self.list_depth += 1;
        for child in &list.children {
            match child {
                Node::Element(item) if item.tag == "li" => {
                    let text = if ordered {
                        format!("{ordinal}.")
                    } else {
                        "•".to_string()
                    };
                    ordinal += 1;
                    self.pending_marker = Some(Marker {
                        text,
                        style: style.child(item),
                    });
                    self.layout_block(item, style, column);
                    self.pending_marker = None;
                }
                Node::Element(other) if is_block(&other.tag) => {
                    self.layout_block(other, style, column)
                }
                // Stray inline content inside a list flows like a paragraph.
                other => self.layout_children(std::slice::from_ref(other), style, column),
            }
        }
        self.list_depth -= 1;
    }

    fn flush_inline(
        &mut self,
        tokens: &[Token<'_>],
        styles: &[ComputedStyle],
        block: &ComputedStyle,
        column: Column,
    ) {
        let mut line: Vec<Piece> = Vec::new();
        let mut line_width = 0.0;

        for token in tokens {
            match token {
                Token::Word { text, style } => {
                    let computed = &styles[*style];
                    let width = self.fonts.measure(text, face_of(computed), computed.font_size);
                    let has_content = line.iter().any(|piece| !piece.is_space);
                    if has_content && line_width + width > column.width {
                        self.emit_line(&mut line, styles, block, column);
                        line_width = 0.0;
                    }
                    if width > column.width {
                        for chunk in self.split_to_width(text, computed, column.width) {
                            if line.iter().any(|piece| !piece.is_space) {
                                self.emit_line(&mut line, styles, block, column);
                            }
                            let width = self.fonts.measure(&chunk, face_of(computed), computed.font_size);
                            line.push(Piece {
                                text: chunk,
                                style: *style,
                                width,
                                is_space: false,
                            });
                            line_width = width;
                        }
                    } else {
                        line.push(Piece {
                            text: text.clone(),
                            style: *style,
                            width,
                            is_space: false,
                        });
                        line_width += width;
                    }
                }
                Token::Space { style } => {
                    if line.is_empty() {
                        continue;
                    }
                    let computed = &styles[*style];
                    let width = self.fonts.measure(" ", face_of(computed), computed.font_size);
                    line.push(Piece {
                        text: " ".to_string(),
                        style: *style,
                        width,
                        is_space: true,
                    });
                    line_width += width;
                }
                Token::Break => {
                    if line.is_empty() {
                        self.commit_margin();
                        self.y += block.line_height();
                    } else {
                        self.emit_line(&mut line, styles, block, column);
                    }
                    line_width = 0.0;
                }
                Token::Image(element) => {
                    self.emit_line(&mut line, styles, block, column);
                    line_width = 0.0;
                    self.place_image(element, column);
                }
            }
        }
        self.emit_line(&mut line, styles, block, column);
    }

    /// Breaks an overlong word between characters, measuring each once.
    fn split_to_width(&self, word: &str, style: &ComputedStyle, width: f32) -> Vec<String> {
        let face = face_of(style);
        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut current_width = 0.0;
        for c in word.chars() {
            let advance = self
                .fonts
                .measure(c.encode_utf8(&mut [0; 4]), face, style.font_size);
            if !current.is_empty() && current_width + advance > width {
                chunks.push(std::mem::take(&mut current));
                current_width = 0.0;
            }
            current.push(c);
            current_width += advance;
        }
        if !current.is_empty() {
            chunks.push(current);
        }
        chunks
    }

    fn emit_line(
        &mut self,
        line: &mut Vec<Piece>,
        styles: &[ComputedStyle],
        block: &ComputedStyle,
        column: Column,
    ) {
        while line.last().is_some_and(|piece| piece.is_space) {
            line.pop();
        }
        if line.is_empty() {
            return;
        }
        self.commit_margin();

        let mut line_height: f32 = 0.0;
        let mut baseline_offset: f32 = 0.0;
        for piece in line.iter() {
            let style = &styles[piece.style];
            let metrics = self.fonts.line_metrics(face_of(style), style.font_size);
            let half_leading = (style.line_height() - metrics.ascent - metrics.descent) / 2.0;
            line_height = line_height.max(style.line_height());
            baseline_offset = baseline_offset.max(half_leading + metrics.ascent);
        }
        let baseline = self.y + baseline_offset;
        let width: f32 = line.iter().map(|piece| piece.width).sum();
        let mut x = column.x + (column.width - width).max(0.0) * block.align.offset_factor();

        if let Some(marker) = self.pending_marker.take() {
            let face = face_of(&marker.style);
            let marker_width = self.fonts.measure(&marker.text, face, marker.style.font_size);
            self.items.push(DisplayItem::Text {
                x: column.x - marker_width - marker.style.font_size * 0.5,
                baseline,
                text: marker.text,
                face,
                size: marker.style.font_size,
                color: marker.style.color,
            });
        }

        for (style_index, text, segment_width) in merge_segments(line.as_slice()) {
            let style = &styles[style_index];
            self.items.push(DisplayItem::Text {
                x,
                baseline,
                text,
                face: face_of(style),
                size: style.font_size,
                color: style.color,
            });
            if style.underline {
                self.items.push(DisplayItem::Rect {
                    x,
                    y: baseline + style.font_size * 0.12,
                    width: segment_width,
                    height: (style.font_size / 16.0).max(1.0),
                    color: style.color,
                });
            }
            x += segment_width;
        }

        self.y += line_height;
        line.clear();
    }

    fn place_image(&mut self, element: &Element, column: Column) {
        let Some(src) = element.attr("src").map(str::trim).filter(|src| !src.is_empty()) else {
            return;
        };
        let source = resolve_image_source(src);
        let natural = match &source {
            ImageSource::Decoded(image) => Some((image.width() as f32, image.height() as f32)),
            _ => None,
        };
        let attr_width = element.attr("width").and_then(parse_dimension);
        let attr_height = element.attr("height").and_then(parse_dimension);

        let (mut width, mut height) = match (attr_width, attr_height, natural) {
            (Some(w), Some(h), _) => (w, h),
            (Some(w), None, Some((nw, nh))) if nw > 0.0 => (w, w * nh / nw),
            (None, Some(h), Some((nw, nh))) if nh > 0.0 => (h * nw / nh, h),
            (Some(w), None, _) => (w, w),
            (None, Some(h), _) => (h, h),
            (None, None, Some(size)) => size,
            (None, None, None) => (UNKNOWN_IMAGE_PX, UNKNOWN_IMAGE_PX),
        };
        if width > column.width {
            height *= column.width / width;
            width = column.width;
        }

        self.commit_margin();
        self.items.push(DisplayItem::Image {
            x: column.x,
            y: self.y,
            width,
            height,
            source,
        });
        self.y += height;
    }
}

/// Splits inline content into words and collapsed spaces, tracking the
/// style of each through `styles`.
fn tokenize<'a>(
    node: &'a Node,
    parent: &ComputedStyle,
    parent_index: usize,
    styles: &mut Vec<ComputedStyle>,
    tokens: &mut Vec<Token<'a>>,
    last_was_space: &mut bool,
) {
    match node {
        Node::Text(text) => {
            let mut word = String::new();
            for c in text.chars() {
                if c.is_whitespace() && c != '\u{a0}' {
                    if !word.is_empty() {
                        tokens.push(Token::Word {
                            text: std::mem::take(&mut word),
                            style: parent_index,
                        });
                    }
                    if !*last_was_space {
                        tokens.push(Token::Space {
                            style: parent_index,
                        });
                        *last_was_space = true;
                    }
                } else {
                    word.push(c);
                    *last_was_space = false;
                }
            }
            if !word.is_empty() {
                tokens.push(Token::Word {
                    text: word,
                    style: parent_index,
                });
            }
        }
        Node::Element(element) => match element.tag.as_str() {
            "br" => {
                tokens.push(Token::Break);
                *last_was_space = true;
            }
            "img" => {
                tokens.push(Token::Image(element));
                *last_was_space = true;
            }
            _ => {
                let style = parent.child(element);
                styles.push(style.clone());
                let index = styles.len() - 1;
                for child in &element.children {
                    tokenize(child, &style, index, styles, tokens, last_was_space);
                }
            }
        },
    }
}

/// Joins adjacent pieces sharing a style into one text run.
fn merge_segments(line: &[Piece]) -> Vec<(usize, String, f32)> {
    let mut segments: Vec<(usize, String, f32)> = Vec::new();
    for piece in line {
        match segments.last_mut() {
            Some((style, text, width)) if *style == piece.style => {
                text.push_str(&piece.text);
                *width += piece.width;
            }
            _ => segments.push((piece.style, piece.text.clone(), piece.width)),
        }
    }
    segments
}

fn parse_dimension(value: &str) -> Option<f32> {
    let value = value.trim();
    let number = value.strip_suffix("px").unwrap_or(value).trim();
    number.parse::<f32>().ok().filter(|n| *n > 0.0)
}

/// Classifies an image reference the way the isolated surface can load it.
pub fn resolve_image_source(src: &str) -> ImageSource {
    let is_data = src
        .get(..5)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:"));
    if is_data {
        return match decode_data_uri(&src[5..]) {
            Some(image) => ImageSource::Decoded(Arc::new(image)),
            None => ImageSource::Unsupported(abbreviate(src)),
        };
    }
    if src.starts_with("//") {
        return ImageSource::CrossOrigin(src.to_string());
    }
    match Url::parse(src) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {
            ImageSource::CrossOrigin(url.to_string())
        }
        _ => ImageSource::Unsupported(abbreviate(src)),
    }
}

fn decode_data_uri(payload: &str) -> Option<RgbaImage> {
    let (meta, data) = payload.split_once(',')?;
    if !meta.to_ascii_lowercase().ends_with(";base64") {
        return None;
    }
    let compact: String = data.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(compact)
        .ok()?;
    image::load_from_memory(&bytes)
        .ok()
        .map(|image| image.to_rgba8())
}

fn abbreviate(src: &str) -> String {
    const MAX: usize = 64;
    if src.chars().count() <= MAX {
        src.to_string()
    } else {
        let head: String = src.chars().take(MAX).collect();
        format!("{head}…")
    }
}
