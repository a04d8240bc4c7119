use crate::types::ExportFormat;

/// Used when the caller supplies no usable name.
pub const DEFAULT_BASE_NAME: &str = "resume";
const MAX_STEM_CHARS: usize = 80;

/// Windows-safe download name carrying exactly one extension for `format`.
///
/// A name that already ends in the extension (any case) keeps a single copy.
pub fn export_filename(requested: &str, format: ExportFormat) -> String {
    let extension = format.extension();
    let trimmed = requested.trim();
    let stem = strip_extension(trimmed, extension).unwrap_or(trimmed);
    format!("{}.{extension}", sanitize_stem(stem))
}

fn strip_extension<'a>(name: &'a str, extension: &str) -> Option<&'a str> {
    let dot = name.len().checked_sub(extension.len() + 1)?;
    if !name.is_char_boundary(dot) {
        return None;
    }
    let (stem, suffix) = name.split_at(dot);
    (suffix.as_bytes()[0] == b'.' && suffix[1..].eq_ignore_ascii_case(extension)).then_some(stem)
}

fn sanitize_stem(input: &str) -> String {
    let replaced: String = input
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();

    let mut compacted = String::with_capacity(replaced.len());
    let mut prev_underscore = false;
    for c in replaced.trim_matches(&['_', ' ', '.'][..]).chars() {
        if c == '_' && prev_underscore {
            continue;
        }
        prev_underscore = c == '_';
        compacted.push(c);
    }

    let mut stem: String = compacted.chars().take(MAX_STEM_CHARS).collect();
    let kept = stem.trim_end_matches(&['_', ' ', '.'][..]).len();
    stem.truncate(kept);

    if stem.is_empty() {
        return DEFAULT_BASE_NAME.to_string();
    }
    if is_reserved_windows_name(&stem) {
        stem.push('_');
    }
    stem
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_extension_requires_dot() {
        assert_eq!(strip_extension("notpdf", "pdf"), None);
        assert_eq!(strip_extension("cv.PDF", "pdf"), Some("cv"));
        assert_eq!(strip_extension("pdf", "pdf"), None);
    }

    #[test]
    fn long_multibyte_names_truncate_on_char_boundary() {
        let name = "é".repeat(200);
        let file = export_filename(&name, ExportFormat::Pdf);
        assert_eq!(file.chars().count(), MAX_STEM_CHARS + ".pdf".len());
    }
}
