//! Owned, read-only node tree built from a parsed HTML fragment.
//!
//! Exporters walk this tree instead of the parser's arena so dispatch happens
//! over a closed set of node kinds.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Lower-case local name.
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Concatenated text of every descendant, like the DOM `textContent`.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        }
    }

    pub fn text_content(&self) -> String {
        match self {
            Node::Element(element) => element.text_content(),
            Node::Text(text) => text.clone(),
        }
    }
}

fn collect_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Element(element) => collect_text(&element.children, out),
        }
    }
}

/// Ordered top-level nodes of a sanitized document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Fragment {
    pub nodes: Vec<Node>,
}

impl Fragment {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.nodes, &mut out);
        out
    }

    /// Serializes the fragment back to HTML.
    ///
    /// The output re-parses to the same tree, which keeps sanitization
    /// idempotent.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            write_node(node, false, &mut out);
        }
        out
    }
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &[
    "style", "script", "xmp", "iframe", "noembed", "noframes", "plaintext", "noscript",
];

fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

fn write_node(node: &Node, raw_text: bool, out: &mut String) {
    match node {
        Node::Text(text) if raw_text => out.push_str(text),
        Node::Text(text) => escape_text(text, out),
        Node::Element(element) => {
            out.push('<');
            out.push_str(&element.tag);
            for (name, value) in &element.attrs {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                escape_attr(value, out);
                out.push('"');
            }
            out.push('>');
            if is_void(&element.tag) {
                return;
            }
            let raw = RAW_TEXT_ELEMENTS.contains(&element.tag.as_str());
            for child in &element.children {
                write_node(child, raw, out);
            }
            out.push_str("</");
            out.push_str(&element.tag);
            out.push('>');
        }
    }
}

fn escape_text(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}

fn escape_attr(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}

/// Collapses every run of whitespace into a single space.
pub fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(ch);
            in_space = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(tag: &str, children: Vec<Node>) -> Node {
        Node::Element(Element {
            tag: tag.to_string(),
            attrs: Vec::new(),
            children,
        })
    }

    #[test]
    fn text_content_flattens_nested_children() {
        let node = element(
            "li",
            vec![
                Node::Text("Lead ".into()),
                element("ul", vec![element("li", vec![Node::Text("nested".into())])]),
            ],
        );
        assert_eq!(node.text_content(), "Lead nested");
    }

    #[test]
    fn serializer_escapes_text_and_attributes() {
        let fragment = Fragment {
            nodes: vec![Node::Element(Element {
                tag: "a".into(),
                attrs: vec![("href".into(), "/q?a=1&b=\"2\"".into())],
                children: vec![Node::Text("1 < 2 & 3".into())],
            })],
        };
        assert_eq!(
            fragment.to_html(),
            "<a href=\"/q?a=1&amp;b=&quot;2&quot;\">1 &lt; 2 &amp; 3</a>"
        );
    }

    #[test]
    fn void_elements_have_no_end_tag() {
        let fragment = Fragment {
            nodes: vec![element("p", vec![Node::Text("a".into()), element("br", vec![])])],
        };
        assert_eq!(fragment.to_html(), "<p>a<br></p>");
    }

    #[test]
    fn collapse_whitespace_keeps_single_edges() {
        assert_eq!(collapse_whitespace("  a \n\t b  "), " a b ");
    }
}
