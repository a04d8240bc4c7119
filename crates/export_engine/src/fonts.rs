//! Font metrics and glyph outlines for layout and rasterization.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use export_logging::{export_info, export_warn};
use tiny_skia::{Path, PathBuilder, Rect};
use tokio::sync::OnceCell;

/// Family stack of the surface document, most preferred first.
const FAMILY_STACK: &[&str] = &[
    "Inter",
    "Segoe UI",
    "Roboto",
    "Helvetica Neue",
    "Arial",
    "DejaVu Sans",
    "Liberation Sans",
    "Noto Sans",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FaceKey {
    pub bold: bool,
    pub italic: bool,
}

impl FaceKey {
    pub fn new(bold: bool, italic: bool) -> Self {
        Self { bold, italic }
    }

    fn all() -> [FaceKey; 4] {
        [
            FaceKey::new(false, false),
            FaceKey::new(true, false),
            FaceKey::new(false, true),
            FaceKey::new(true, true),
        ]
    }
}

/// Vertical metrics in CSS pixels; `descent` is positive below the baseline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineMetrics {
    pub ascent: f32,
    pub descent: f32,
}

pub trait FontBook: Send + Sync {
    fn line_metrics(&self, face: FaceKey, size: f32) -> LineMetrics;

    /// Horizontal advance of `text` in CSS pixels.
    fn measure(&self, text: &str, face: FaceKey, size: f32) -> f32;

    /// Outline of `text` with the pen at `(x, baseline)`, y growing downwards.
    fn outline(&self, text: &str, face: FaceKey, size: f32, x: f32, baseline: f32) -> Option<Path>;
}

/// Fixed-pitch metrics with box glyphs. Deterministic, needs no system fonts.
#[derive(Debug, Default, Clone, Copy)]
pub struct FallbackFontBook;

impl FallbackFontBook {
    fn advance(c: char, face: FaceKey) -> f32 {
        let base = if c.is_whitespace() { 0.28 } else { 0.55 };
        if face.bold {
            base + 0.03
        } else {
            base
        }
    }
}

impl FontBook for FallbackFontBook {
    fn line_metrics(&self, _face: FaceKey, size: f32) -> LineMetrics {
        LineMetrics {
            ascent: size * 0.8,
            descent: size * 0.2,
        }
    }

    fn measure(&self, text: &str, face: FaceKey, size: f32) -> f32 {
        text.chars().map(|c| Self::advance(c, face) * size).sum()
    }

    fn outline(&self, text: &str, face: FaceKey, size: f32, x: f32, baseline: f32) -> Option<Path> {
        let mut builder = PathBuilder::new();
        let mut pen = x;
        for c in text.chars() {
            let advance = Self::advance(c, face) * size;
            if !c.is_whitespace() {
                let height = if c.is_uppercase() || c.is_ascii_digit() {
                    0.7
                } else {
                    0.52
                };
                if let Some(rect) = Rect::from_xywh(
                    pen + size * 0.06,
                    baseline - size * height,
                    advance - size * 0.12,
                    size * height,
                ) {
                    builder.push_rect(rect);
                }
            }
            pen += advance;
        }
        builder.finish()
    }
}

/// A face file kept in memory with the numbers layout asks for most.
struct LoadedFace {
    data: Vec<u8>,
    index: u32,
    units_per_em: f32,
    ascender: f32,
    /// Positive below the baseline.
    descender: f32,
    /// Horizontal advances in font units, filled as characters are first seen.
    advances: RwLock<HashMap<char, f32>>,
}

impl LoadedFace {
    fn new(data: Vec<u8>, index: u32) -> Option<Self> {
        let (units_per_em, ascender, descender) = {
            let face = ttf_parser::Face::parse(&data, index).ok()?;
            (
                f32::from(face.units_per_em()),
                f32::from(face.ascender()),
                -f32::from(face.descender()),
            )
        };
        Some(Self {
            data,
            index,
            units_per_em,
            ascender,
            descender,
            advances: RwLock::new(HashMap::new()),
        })
    }

    fn parse(&self) -> Option<ttf_parser::Face<'_>> {
        ttf_parser::Face::parse(&self.data, self.index).ok()
    }

    fn scale(&self, size: f32) -> f32 {
        size / self.units_per_em
    }

    /// Sum of advances in font units. The face is parsed only for unseen characters.
    fn advance_units(&self, text: &str) -> f32 {
        let mut total = 0.0;
        let mut unseen = Vec::new();
        match self.advances.read() {
            Ok(cache) => {
                for c in text.chars() {
                    match cache.get(&c) {
                        Some(advance) => total += advance,
                        None => unseen.push(c),
                    }
                }
            }
            Err(_) => unseen.extend(text.chars()),
        }
        if unseen.is_empty() {
            return total;
        }

        let Some(face) = self.parse() else {
            return total + unseen.len() as f32 * self.units_per_em / 2.0;
        };
        let mut cache = self.advances.write().ok();
        for c in unseen {
            let advance = glyph_advance(&face, c);
            if let Some(cache) = cache.as_mut() {
                cache.insert(c, advance);
            }
            total += advance;
        }
        total
    }
}

/// Faces resolved from the fonts installed on the machine.
pub struct SystemFontBook {
    faces: HashMap<FaceKey, Arc<LoadedFace>>,
}

impl SystemFontBook {
    /// Scans system fonts. `None` when no usable face is installed.
    pub fn load() -> Option<Self> {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        let regular = Arc::new(query_face(&db, FaceKey::default())?);

        let mut faces = HashMap::new();
        for key in FaceKey::all() {
            let face = if key == FaceKey::default() {
                Arc::clone(&regular)
            } else {
                query_face(&db, key)
                    .map(Arc::new)
                    .unwrap_or_else(|| Arc::clone(&regular))
            };
            faces.insert(key, face);
        }
        export_info!("loaded {} system font faces", db.len());
        Some(Self { faces })
    }

    fn loaded(&self, key: FaceKey) -> Option<&LoadedFace> {
        self.faces
            .get(&key)
            .or_else(|| self.faces.get(&FaceKey::default()))
            .map(|face| &**face)
    }
}

fn query_face(db: &fontdb::Database, key: FaceKey) -> Option<LoadedFace> {
    let mut families: Vec<fontdb::Family<'_>> =
        FAMILY_STACK.iter().map(|name| fontdb::Family::Name(*name)).collect();
    families.push(fontdb::Family::SansSerif);

    let query = fontdb::Query {
        families: &families,
        weight: if key.bold {
            fontdb::Weight::BOLD
        } else {
            fontdb::Weight::NORMAL
        },
        stretch: fontdb::Stretch::Normal,
        style: if key.italic {
            fontdb::Style::Italic
        } else {
            fontdb::Style::Normal
        },
    };
    let id = db
        .query(&query)
        .or_else(|| db.faces().next().map(|info| info.id))?;
    db.with_face_data(id, |data, index| LoadedFace::new(data.to_vec(), index))
        .flatten()
}

fn glyph_advance(face: &ttf_parser::Face<'_>, c: char) -> f32 {
    let glyph = face.glyph_index(c).unwrap_or(ttf_parser::GlyphId(0));
    face.glyph_hor_advance(glyph)
        .map(f32::from)
        .unwrap_or_else(|| f32::from(face.units_per_em()) / 2.0)
}

impl FontBook for SystemFontBook {
    fn line_metrics(&self, face: FaceKey, size: f32) -> LineMetrics {
        match self.loaded(face) {
            Some(loaded) => LineMetrics {
                ascent: loaded.ascender * loaded.scale(size),
                descent: loaded.descender * loaded.scale(size),
            },
            None => FallbackFontBook.line_metrics(face, size),
        }
    }

    fn measure(&self, text: &str, face: FaceKey, size: f32) -> f32 {
        match self.loaded(face) {
            Some(loaded) => loaded.advance_units(text) * loaded.scale(size),
            None => FallbackFontBook.measure(text, face, size),
        }
    }

    fn outline(&self, text: &str, face: FaceKey, size: f32, x: f32, baseline: f32) -> Option<Path> {
        let Some((loaded, parsed)) = self.loaded(face).and_then(|l| Some((l, l.parse()?))) else {
            return FallbackFontBook.outline(text, face, size, x, baseline);
        };
        let scale = loaded.scale(size);
        let mut builder = PathBuilder::new();
        let mut pen = x;
        for c in text.chars() {
            if let Some(glyph) = parsed.glyph_index(c) {
                let mut sink = OutlineSink {
                    builder: &mut builder,
                    origin_x: pen,
                    origin_y: baseline,
                    scale,
                };
                parsed.outline_glyph(glyph, &mut sink);
            }
            pen += glyph_advance(&parsed, c) * scale;
        }
        builder.finish()
    }
}

/// Maps font units (y up) onto surface pixels (y down).
struct OutlineSink<'a> {
    builder: &'a mut PathBuilder,
    origin_x: f32,
    origin_y: f32,
    scale: f32,
}

impl OutlineSink<'_> {
    fn point(&self, x: f32, y: f32) -> (f32, f32) {
        (self.origin_x + x * self.scale, self.origin_y - y * self.scale)
    }
}

impl ttf_parser::OutlineBuilder for OutlineSink<'_> {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.point(x, y);
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.point(x, y);
        self.builder.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x1, y1) = self.point(x1, y1);
        let (x, y) = self.point(x, y);
        self.builder.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (x1, y1) = self.point(x1, y1);
        let (x2, y2) = self.point(x2, y2);
        let (x, y) = self.point(x, y);
        self.builder.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}

static SHARED: OnceCell<Arc<dyn FontBook>> = OnceCell::const_new();

/// Process-wide font book, loaded on first use and reused afterwards.
pub async fn shared_font_book() -> Arc<dyn FontBook> {
    SHARED
        .get_or_init(|| async {
            match tokio::task::spawn_blocking(SystemFontBook::load).await {
                Ok(Some(book)) => Arc::new(book) as Arc<dyn FontBook>,
                Ok(None) => {
                    export_warn!("no system fonts found; using box glyphs");
                    Arc::new(FallbackFontBook)
                }
                Err(err) => {
                    export_warn!("font scan failed: {err}; using box glyphs");
                    Arc::new(FallbackFontBook)
                }
            }
        })
        .await
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_measure_scales_with_size() {
        let book = FallbackFontBook;
        let small = book.measure("Resume", FaceKey::default(), 10.0);
        let large = book.measure("Resume", FaceKey::default(), 20.0);
        assert!((large - 2.0 * small).abs() < 1e-3);
    }

    #[test]
    fn fallback_outline_skips_whitespace() {
        let book = FallbackFontBook;
        assert!(book.outline("   ", FaceKey::default(), 16.0, 0.0, 16.0).is_none());
        assert!(book.outline("a b", FaceKey::default(), 16.0, 0.0, 16.0).is_some());
    }

    #[test]
    fn system_advances_are_measured_once_per_character() {
        let Some(book) = SystemFontBook::load() else {
            return;
        };
        let face = FaceKey::default();
        let pair = book.measure("ab", face, 16.0);
        let split = book.measure("a", face, 16.0) + book.measure("b", face, 16.0);
        assert!((pair - split).abs() < 1e-3);

        let cached = book
            .loaded(face)
            .and_then(|loaded| loaded.advances.read().ok().map(|cache| cache.len()));
        assert_eq!(cached, Some(2));
    }
}
