use export_engine::{
    package_docx, structural_blocks, Block, BlockKind, HeadingLevel, TextRun,
};
use pretty_assertions::assert_eq;

#[test]
fn headings_paragraphs_and_bullets_keep_document_order() {
    let html = "<h1>Jane Doe</h1><p>Hello <strong>World</strong></p><ul><li>A</li><li>B</li></ul>";
    assert_eq!(
        structural_blocks(html),
        vec![
            Block::heading(HeadingLevel::H1, "Jane Doe"),
            Block::paragraph(vec![TextRun::plain("Hello "), TextRun::bold("World")]),
            Block::bullet("A"),
            Block::bullet("B"),
        ]
    );
}

#[test]
fn wrappers_are_transparent() {
    let html = r#"<div class="resume"><section><h2>Experience</h2><div><h3>Acme</h3><p>Built things</p></div></section></div>"#;
    let kinds: Vec<BlockKind> = structural_blocks(html).iter().map(|b| b.kind).collect();
    assert_eq!(
        kinds,
        vec![
            BlockKind::Heading(HeadingLevel::H2),
            BlockKind::Heading(HeadingLevel::H3),
            BlockKind::Paragraph,
        ]
    );
}

#[test]
fn anchors_become_link_runs() {
    let html = r#"<p>Portfolio: <a href="https://jane.dev">jane.dev</a> and <em>more</em></p>"#;
    assert_eq!(
        structural_blocks(html),
        vec![Block::paragraph(vec![
            TextRun::plain("Portfolio: "),
            TextRun::link("jane.dev", Some("https://jane.dev")),
            TextRun::plain(" and "),
            TextRun::italic("more"),
        ])]
    );
}

#[test]
fn list_items_flatten_nested_markup() {
    let html = "<ol><li>Led <b>team</b> of 5</li><li>   </li></ol>";
    assert_eq!(structural_blocks(html), vec![Block::bullet("Led team of 5")]);
}

#[test]
fn empty_input_yields_single_empty_paragraph() {
    assert_eq!(structural_blocks(""), vec![Block::empty()]);
    assert_eq!(structural_blocks("<p>   </p><h1></h1>"), vec![Block::empty()]);
}

#[test]
fn color_functions_never_reach_the_document() {
    let blocks = structural_blocks(r#"<p style="color: oklch(0.2 0.1 20)">oklch(0.2 0.1 20)</p>"#);
    assert_eq!(blocks, vec![Block::paragraph(vec![TextRun::plain("#111111")])]);
}

#[test]
fn package_is_a_zip_with_a_main_document() {
    let bytes = package_docx(&structural_blocks("<h1>Jane</h1><ul><li>Rust</li></ul>")).unwrap();
    assert_eq!(&bytes[..2], b"PK");
    let needle = b"word/document.xml";
    assert!(bytes.windows(needle.len()).any(|w| w == needle));
}

#[test]
fn link_run_is_split_from_leading_text() {
    assert_eq!(
        structural_blocks(r#"<p>See <a href="https://x.test">my site</a></p>"#),
        vec![Block::paragraph(vec![
            TextRun::plain("See "),
            TextRun::link("my site", Some("https://x.test")),
        ])]
    );
}

#[test]
fn paragraph_whitespace_collapses_and_trims() {
    assert_eq!(
        structural_blocks("<p>  multiple   spaces  </p>"),
        vec![Block::paragraph(vec![TextRun::plain("multiple spaces")])]
    );
}

#[test]
fn empty_anchor_falls_back_to_href() {
    assert_eq!(
        structural_blocks(r#"<p><a href="mailto:jane@x.test"></a></p>"#),
        vec![Block::paragraph(vec![TextRun::link(
            "mailto:jane@x.test",
            Some("mailto:jane@x.test")
        )])]
    );
}

#[test]
fn deeply_nested_markup_still_yields_its_text() {
    let spans = format!("{}x{}", "<span>".repeat(20_000), "</span>".repeat(20_000));
    assert_eq!(
        structural_blocks(&spans),
        vec![Block::paragraph(vec![TextRun::plain("x")])]
    );

    let divs = format!("{}<p>Deep</p>{}", "<div>".repeat(5_000), "</div>".repeat(5_000));
    let blocks = structural_blocks(&divs);
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].text(), "Deep");
    assert!(package_docx(&blocks).is_ok());
}
