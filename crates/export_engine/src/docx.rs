//! Structural DOCX export: HTML tree → paragraph accumulator → WordprocessingML.

use std::io::Cursor;

use docx_rs::{
    AbstractNumbering, Docx, Hyperlink, HyperlinkType, IndentLevel, Level, LevelJc, LevelText,
    NumberFormat, Numbering, NumberingId, Paragraph, Run, SpecialIndentType, Start, Style,
    StyleType,
};

use crate::dom::{collapse_whitespace, Element, Fragment, Node};
use crate::sanitize::{sanitize_fragment, SanitizeProfile};

const BULLET_NUMBERING_ID: usize = 1;
/// `sRGB` hex used for link runs.
pub const LINK_RUN_COLOR: &str = "0000EE";

#[derive(Debug, thiserror::Error)]
pub enum DocxError {
    #[error("failed to package docx: {0}")]
    Package(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingLevel {
    H1,
    H2,
    H3,
}

impl HeadingLevel {
    fn style_id(self) -> &'static str {
        match self {
            HeadingLevel::H1 => "Heading1",
            HeadingLevel::H2 => "Heading2",
            HeadingLevel::H3 => "Heading3",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Heading(HeadingLevel),
    Paragraph,
    Bullet { level: u8 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStyle {
    Plain,
    Bold,
    Italic,
    /// Colored and underlined; `href` is kept when the anchor had one.
    Link { href: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    pub text: String,
    pub style: RunStyle,
}

impl TextRun {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: RunStyle::Plain,
        }
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: RunStyle::Bold,
        }
    }

    pub fn italic(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: RunStyle::Italic,
        }
    }

    pub fn link(text: impl Into<String>, href: Option<&str>) -> Self {
        Self {
            text: text.into(),
            style: RunStyle::Link {
                href: href.map(str::to_string),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    pub runs: Vec<TextRun>,
}

impl Block {
    pub fn heading(level: HeadingLevel, text: impl Into<String>) -> Self {
        Self {
            kind: BlockKind::Heading(level),
            runs: vec![TextRun::bold(text)],
        }
    }

    pub fn paragraph(runs: Vec<TextRun>) -> Self {
        Self {
            kind: BlockKind::Paragraph,
            runs,
        }
    }

    pub fn bullet(text: impl Into<String>) -> Self {
        Self {
            kind: BlockKind::Bullet { level: 0 },
            runs: vec![TextRun::plain(text)],
        }
    }

    pub fn empty() -> Self {
        Self::paragraph(Vec::new())
    }

    pub fn text(&self) -> String {
        self.runs.iter().map(|run| run.text.as_str()).collect()
    }
}

/// Sanitizes `html` and reconstructs its block structure.
pub fn structural_blocks(html: &str) -> Vec<Block> {
    build_blocks(&sanitize_fragment(html, SanitizeProfile::Structure))
}

/// Walks the tree depth-first, in document order.
///
/// Never returns an empty vector: an input without content yields a single
/// empty paragraph so the package always has a body.
pub fn build_blocks(fragment: &Fragment) -> Vec<Block> {
    let mut blocks = Vec::new();
    for node in &fragment.nodes {
        walk(node, &mut blocks);
    }
    if blocks.is_empty() {
        blocks.push(Block::empty());
    }
    blocks
}

fn walk(node: &Node, blocks: &mut Vec<Block>) {
    match node {
        Node::Text(text) => {
            let clean = flatten(text);
            if !clean.is_empty() {
                blocks.push(Block::paragraph(vec![TextRun::plain(clean)]));
            }
        }
        Node::Element(element) => match element.tag.as_str() {
            "h1" => push_heading(element, HeadingLevel::H1, blocks),
            "h2" => push_heading(element, HeadingLevel::H2, blocks),
            "h3" => push_heading(element, HeadingLevel::H3, blocks),
            "p" => {
                let runs = paragraph_runs(element);
                if !runs.is_empty() {
                    blocks.push(Block::paragraph(runs));
                }
            }
            "ul" | "ol" => {
                for item in element.child_elements().filter(|child| child.tag == "li") {
                    let text = flatten(&item.text_content());
                    if !text.is_empty() {
                        blocks.push(Block::bullet(text));
                    }
                }
            }
            // Wrappers are transparent.
            _ => {
                for child in &element.children {
                    walk(child, blocks);
                }
            }
        },
    }
}

fn push_heading(element: &Element, level: HeadingLevel, blocks: &mut Vec<Block>) {
    let text = flatten(&element.text_content());
    if !text.is_empty() {
        blocks.push(Block::heading(level, text));
    }
}

fn paragraph_runs(paragraph: &Element) -> Vec<TextRun> {
    let mut builder = RunBuilder::default();
    for child in &paragraph.children {
        match child {
            Node::Text(text) => builder.push(text, RunStyle::Plain),
            Node::Element(element) => match element.tag.as_str() {
                "a" => {
                    let href = element.attr("href").map(str::trim).filter(|h| !h.is_empty());
                    let text = element.text_content();
                    if text.trim().is_empty() {
                        if let Some(href) = href {
                            builder.push(href, RunStyle::Link { href: Some(href.to_string()) });
                        }
                    } else {
                        builder.push(
                            &text,
                            RunStyle::Link {
                                href: href.map(str::to_string),
                            },
                        );
                    }
                }
                "strong" | "b" => builder.push(&element.text_content(), RunStyle::Bold),
                "em" | "i" => builder.push(&element.text_content(), RunStyle::Italic),
                _ => builder.push(&element.text_content(), RunStyle::Plain),
            },
        }
    }
    builder.finish()
}

/// Collapses whitespace per run and across run boundaries.
#[derive(Default)]
struct RunBuilder {
    runs: Vec<TextRun>,
    pending_space: bool,
}

impl RunBuilder {
    fn push(&mut self, raw: &str, style: RunStyle) {
        let collapsed = strip_control(&collapse_whitespace(raw));
        if collapsed.trim().is_empty() {
            // The run is dropped but still separates its neighbours.
            self.pending_space |= !collapsed.is_empty();
            return;
        }

        let previous_ends_with_space = self
            .runs
            .last()
            .map(|run| run.text.ends_with(' '))
            .unwrap_or(true);
        let mut text = if previous_ends_with_space {
            collapsed.trim_start().to_string()
        } else {
            collapsed
        };
        if self.pending_space && !previous_ends_with_space && !text.starts_with(' ') {
            text.insert(0, ' ');
        }
        self.pending_space = false;
        self.runs.push(TextRun { text, style });
    }

    fn finish(mut self) -> Vec<TextRun> {
        if let Some(last) = self.runs.last_mut() {
            let trimmed = last.text.trim_end().len();
            last.text.truncate(trimmed);
        }
        self.runs
    }
}

fn flatten(text: &str) -> String {
    strip_control(collapse_whitespace(text).trim())
}

/// XML 1.0 cannot carry C0 control characters.
fn strip_control(text: &str) -> String {
    text.chars().filter(|c| !c.is_control()).collect()
}

/// Serializes blocks into a `.docx` package.
pub fn package_docx(blocks: &[Block]) -> Result<Vec<u8>, DocxError> {
    let mut docx = register_numbering(register_styles(Docx::new()));
    for block in blocks {
        docx = docx.add_paragraph(paragraph_for(block));
    }

    let mut buffer = Vec::new();
    docx.build()
        .pack(&mut Cursor::new(&mut buffer))
        .map_err(|e| DocxError::Package(e.to_string()))?;
    Ok(buffer)
}

fn paragraph_for(block: &Block) -> Paragraph {
    let mut paragraph = match block.kind {
        BlockKind::Heading(level) => Paragraph::new().style(level.style_id()),
        BlockKind::Paragraph => Paragraph::new(),
        BlockKind::Bullet { level } => Paragraph::new().numbering(
            NumberingId::new(BULLET_NUMBERING_ID),
            IndentLevel::new(usize::from(level)),
        ),
    };

    for run in &block.runs {
        let base = Run::new().add_text(&run.text);
        paragraph = match &run.style {
            RunStyle::Plain => paragraph.add_run(base),
            RunStyle::Bold => paragraph.add_run(base.bold()),
            RunStyle::Italic => paragraph.add_run(base.italic()),
            RunStyle::Link { href } => {
                let styled = base.color(LINK_RUN_COLOR).underline("single");
                match href {
                    Some(href) => paragraph
                        .add_hyperlink(Hyperlink::new(href, HyperlinkType::External).add_run(styled)),
                    None => paragraph.add_run(styled),
                }
            }
        };
    }
    paragraph
}

fn register_styles(docx: Docx) -> Docx {
    let heading = |id: &str, name: &str, size: usize| {
        Style::new(id, StyleType::Paragraph)
            .name(name)
            .size(size)
            .bold()
    };
    docx.add_style(heading("Heading1", "Heading 1", 32))
        .add_style(heading("Heading2", "Heading 2", 28))
        .add_style(heading("Heading3", "Heading 3", 26))
}

fn register_numbering(docx: Docx) -> Docx {
    let bullet = Level::new(
        0,
        Start::new(1),
        NumberFormat::new("bullet"),
        LevelText::new("•"),
        LevelJc::new("left"),
    )
    .indent(Some(720), Some(SpecialIndentType::Hanging(360)), None, None);

    docx.add_abstract_numbering(AbstractNumbering::new(BULLET_NUMBERING_ID).add_level(bullet))
        .add_numbering(Numbering::new(BULLET_NUMBERING_ID, BULLET_NUMBERING_ID))
}
