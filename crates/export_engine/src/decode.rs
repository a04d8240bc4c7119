use std::sync::LazyLock;

use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use regex::bytes::Regex;

/// How far into a document a `<meta charset>` declaration is honoured.
const META_PRESCAN_BYTES: usize = 1024;

static META_CHARSET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]+charset\s*=\s*["']?\s*([A-Za-z0-9_\-:.]+)"#)
        .expect("valid meta charset regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedDocument {
    pub html: String,
    pub encoding_label: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unknown character encoding {0:?}")]
    UnknownEncoding(String),
    #[error("input is not valid {encoding}")]
    Malformed { encoding: String },
}

/// Decodes a resume document read from disk.
///
/// Order: byte order mark, the caller's declared label, a `<meta charset>` in
/// the first kilobyte, then statistical detection.
pub fn decode_document(
    bytes: &[u8],
    declared: Option<&str>,
) -> Result<DecodedDocument, DecodeError> {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return decode_with(bytes, encoding);
    }

    if let Some(label) = declared.map(str::trim).filter(|l| !l.is_empty()) {
        let encoding = Encoding::for_label(label.as_bytes())
            .ok_or_else(|| DecodeError::UnknownEncoding(label.to_string()))?;
        return decode_with(bytes, encoding);
    }

    if let Some(encoding) = meta_charset(bytes) {
        return decode_with(bytes, encoding);
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    decode_with(bytes, detector.guess(None, true))
}

fn meta_charset(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = &bytes[..bytes.len().min(META_PRESCAN_BYTES)];
    let label = META_CHARSET.captures(head)?.get(1)?;
    Encoding::for_label(label.as_bytes())
}

fn decode_with(bytes: &[u8], encoding: &'static Encoding) -> Result<DecodedDocument, DecodeError> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        return Err(DecodeError::Malformed {
            encoding: encoding.name().to_string(),
        });
    }
    Ok(DecodedDocument {
        html: text.into_owned(),
        encoding_label: encoding.name().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_charset_wins_over_detection() {
        let mut bytes = b"<html><head><meta charset=\"windows-1252\"></head><body>".to_vec();
        bytes.push(0xE9);
        bytes.extend_from_slice(b"</body></html>");
        let decoded = decode_document(&bytes, None).unwrap();
        assert_eq!(decoded.encoding_label, "windows-1252");
        assert!(decoded.html.contains('é'));
    }

    #[test]
    fn unknown_declared_label_is_rejected() {
        assert_eq!(
            decode_document(b"x", Some("klingon")),
            Err(DecodeError::UnknownEncoding("klingon".into()))
        );
    }
}
