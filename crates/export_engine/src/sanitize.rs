use std::borrow::Cow;
use std::sync::LazyLock;

use ego_tree::iter::Edge;
use ego_tree::NodeRef;
use regex::{Captures, Regex};
use scraper::{Html, Selector};

use crate::dom::{Element, Fragment, Node};

/// Fallback for color functions in generic foreground contexts.
pub const FOREGROUND_COLOR: &str = "#111111";
/// Fallback for color functions inside an anchor start tag.
pub const LINK_COLOR: &str = "#0000ee";

/// OK-space color functions the rasterizer cannot resolve. Plain `lab()`/`lch()`
/// are left alone: prose like "Chemistry Lab(2020)" would match them.
/// One level of nested parentheses is matched directly; deeper relative-color
/// syntax is peeled from the inside out by repeated replacement.
static COLOR_FUNCTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bok(?:lch|lab)\((?:[^()]|\([^()]*\))*\)").expect("color function pattern")
});

static ANCHOR_START_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<a\b[^>]*>").expect("anchor tag pattern"));

static DOCUMENT_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<(?:html|body)[\s>/]").expect("document marker pattern"));

/// Elements nested deeper than this are unwrapped; their text is kept.
pub const MAX_NESTING_DEPTH: usize = 128;

/// Which consumer the sanitized fragment is prepared for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanitizeProfile {
    /// Visual rendering: `class` attributes are stripped as well.
    Raster,
    /// Semantic walking: `class` attributes are kept.
    Structure,
}

/// Sanitizes for the raster path and serializes the result.
pub fn sanitize(raw: &str) -> String {
    sanitize_with(raw, SanitizeProfile::Raster)
}

pub fn sanitize_with(raw: &str, profile: SanitizeProfile) -> String {
    sanitize_fragment(raw, profile).to_html()
}

/// Sanitizes `raw` and returns the parsed tree.
///
/// Never fails: the html5ever parser recovers from any malformed input.
pub fn sanitize_fragment(raw: &str, profile: SanitizeProfile) -> Fragment {
    // Must run before parsing: the functions also hide inside `style` attributes.
    let recolored = replace_color_functions(raw);
    let mut nodes = Vec::new();

    if DOCUMENT_MARKER.is_match(&recolored) {
        // A leading doctype keeps the parser out of quirks mode, so the body
        // builds the same tree a fragment re-parse of the output would.
        let document = Html::parse_document(&format!("<!doctype html>{recolored}"));
        let body = Selector::parse("body")
            .ok()
            .and_then(|sel| document.select(&sel).next());
        match body {
            Some(body) => convert_children(*body, profile, 0, &mut nodes),
            None => convert_children(*document.root_element(), profile, 0, &mut nodes),
        }
    } else {
        let fragment = Html::parse_fragment(&recolored);
        convert_children(*fragment.root_element(), profile, 0, &mut nodes);
    }

    Fragment { nodes }
}

/// Rewrites unsupported color functions to the fixed palette.
pub fn replace_color_functions(raw: &str) -> Cow<'_, str> {
    if !COLOR_FUNCTION.is_match(raw) {
        return Cow::Borrowed(raw);
    }
    let linked = ANCHOR_START_TAG.replace_all(raw, |caps: &Captures| {
        replace_until_stable(&caps[0], LINK_COLOR)
    });
    Cow::Owned(replace_until_stable(&linked, FOREGROUND_COLOR))
}

fn replace_until_stable(text: &str, color: &str) -> String {
    let mut current = text.to_string();
    while COLOR_FUNCTION.is_match(&current) {
        current = COLOR_FUNCTION.replace_all(&current, color).into_owned();
    }
    current
}

fn is_removed(tag: &str) -> bool {
    tag.eq_ignore_ascii_case("style") || tag.eq_ignore_ascii_case("script")
}

/// Removed siblings can leave adjacent text; merge it like a re-parse would.
fn push_text(out: &mut Vec<Node>, raw: &str) {
    let text = replace_color_functions(raw);
    if let Some(Node::Text(previous)) = out.last_mut() {
        previous.push_str(&text);
    } else {
        out.push(Node::Text(text.into_owned()));
    }
}

/// `depth` counts the converted elements enclosing `out`.
fn convert_children(
    parent: NodeRef<'_, scraper::Node>,
    profile: SanitizeProfile,
    depth: usize,
    out: &mut Vec<Node>,
) {
    for child in parent.children() {
        match child.value() {
            scraper::Node::Text(text) => push_text(out, text),
            scraper::Node::Element(element) => {
                let tag = element.name().to_ascii_lowercase();
                if is_removed(&tag) {
                    continue;
                }
                let attrs = element
                    .attrs()
                    .filter(|(name, _)| {
                        !(profile == SanitizeProfile::Raster && name.eq_ignore_ascii_case("class"))
                    })
                    .map(|(name, value)| {
                        (
                            name.to_ascii_lowercase(),
                            replace_color_functions(value).into_owned(),
                        )
                    })
                    .collect();
                let mut converted = Element {
                    tag,
                    attrs,
                    children: Vec::new(),
                };
                if depth + 1 >= MAX_NESTING_DEPTH {
                    flatten_text(child, &mut converted.children);
                } else {
                    convert_children(child, profile, depth + 1, &mut converted.children);
                }
                out.push(Node::Element(converted));
            }
            scraper::Node::Document | scraper::Node::Fragment => {
                convert_children(child, profile, depth, out);
            }
            // comments, doctypes and processing instructions are dropped
            _ => {}
        }
    }
}

/// Collects the text below `node` in document order, iteratively.
fn flatten_text(node: NodeRef<'_, scraper::Node>, out: &mut Vec<Node>) {
    let mut removed_depth = 0usize;
    for edge in node.traverse() {
        match edge {
            Edge::Open(open) => match open.value() {
                scraper::Node::Element(element) if is_removed(element.name()) => {
                    removed_depth += 1;
                }
                scraper::Node::Text(text) if removed_depth == 0 => push_text(out, text),
                _ => {}
            },
            Edge::Close(close) => {
                if let scraper::Node::Element(element) = close.value() {
                    if is_removed(element.name()) {
                        removed_depth -= 1;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_function_inside_anchor_gets_link_color() {
        let raw = r#"<p style="color: oklch(0.2 0 0)"><a style="color:oklch(0.5 0.2 250)">x</a></p>"#;
        let replaced = replace_color_functions(raw);
        assert_eq!(
            replaced,
            r##"<p style="color: #111111"><a style="color:#0000ee">x</a></p>"##
        );
    }

    #[test]
    fn input_without_color_functions_is_borrowed() {
        assert!(matches!(
            replace_color_functions("<p>plain</p>"),
            Cow::Borrowed(_)
        ));
    }

    #[test]
    fn prose_lookalikes_are_not_colors() {
        let raw = "<p>Chemistry Lab(2020), bookkeeping(oklch)</p>";
        assert_eq!(replace_color_functions(raw), raw);
    }

    #[test]
    fn full_document_keeps_only_body_content() {
        let raw = "<html><head><title>T</title></head><body><p>Body</p></body></html>";
        assert_eq!(sanitize(raw), "<p>Body</p>");
    }

    #[test]
    fn adjacent_text_is_merged_after_script_removal() {
        let fragment = sanitize_fragment("a<script>x()</script>b", SanitizeProfile::Structure);
        assert_eq!(fragment.nodes, vec![Node::Text("ab".into())]);
    }

    fn depth(nodes: &[Node]) -> usize {
        let mut deepest = 0;
        let mut stack: Vec<(&Node, usize)> = nodes.iter().map(|node| (node, 1)).collect();
        while let Some((node, level)) = stack.pop() {
            if let Node::Element(element) = node {
                deepest = deepest.max(level);
                stack.extend(element.children.iter().map(|child| (child, level + 1)));
            }
        }
        deepest
    }

    #[test]
    fn relative_color_syntax_is_replaced_whole() {
        assert_eq!(
            replace_color_functions("color: oklch(from oklch(0.5 0 0) l c h);"),
            "color: #111111;"
        );
        assert_eq!(
            replace_color_functions("oklab(from oklch(from oklab(0.1 0 0) l c h) l a b)"),
            "#111111"
        );
    }

    #[test]
    fn nesting_beyond_the_limit_is_unwrapped_to_text() {
        let raw = format!(
            "{}deep<script>x()</script> text{}",
            "<span>".repeat(500),
            "</span>".repeat(500)
        );
        let fragment = sanitize_fragment(&raw, SanitizeProfile::Raster);
        assert_eq!(depth(&fragment.nodes), MAX_NESTING_DEPTH);
        assert_eq!(fragment.text_content(), "deep text");
    }
}
