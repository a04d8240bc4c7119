use export_engine::decode_document;
use pretty_assertions::assert_eq;

#[test]
fn declared_label_is_honoured() {
    let decoded = decode_document(b"caf\xe9", Some("ISO-8859-1")).unwrap();
    assert_eq!(decoded.html, "café");
    assert_eq!(decoded.encoding_label, "windows-1252");
}

#[test]
fn utf8_bom_wins() {
    let decoded = decode_document(b"\xEF\xBB\xBF<p>hi</p>", Some("windows-1252")).unwrap();
    assert_eq!(decoded.html, "<p>hi</p>");
    assert_eq!(decoded.encoding_label, "UTF-8");
}

#[test]
fn plain_utf8_is_detected() {
    let decoded = decode_document("<p>Zoë Straße</p>".as_bytes(), None).unwrap();
    assert_eq!(decoded.html, "<p>Zoë Straße</p>");
}
