//! Raster PDF assembly: one full-width image per page.

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};

use crate::types::{ExportSettings, ImageEncoding, Pagination, PT_PER_MM};

const IMAGE_NAME: &str = "Im0";

#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    #[error("canvas has no pixels")]
    EmptyCanvas,
    #[error("image encoding failed: {0}")]
    Encode(String),
    #[error("PDF serialization failed: {0}")]
    Serialize(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Page height that keeps the bitmap's aspect ratio at `page_width`.
///
/// Units follow `page_width`.
pub fn page_height_for(bitmap_width: u32, bitmap_height: u32, page_width: f32) -> f32 {
    bitmap_height as f32 * page_width / bitmap_width as f32
}

/// Size and image placement of one assembled page, in points.
#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    pub width_pt: f32,
    pub height_pt: f32,
    /// Rows of the bitmap shown on this page.
    pub rows: std::ops::Range<u32>,
    pub image_height_pt: f32,
}

/// Splits the bitmap into pages according to `settings.pagination`.
pub fn plan_pages(bitmap_width: u32, bitmap_height: u32, settings: &ExportSettings) -> Vec<PageLayout> {
    let width_pt = settings.page.width_mm * PT_PER_MM;
    let full_height_pt = page_height_for(bitmap_width, bitmap_height, width_pt);

    match settings.pagination {
        Pagination::Single => vec![PageLayout {
            width_pt,
            height_pt: full_height_pt,
            rows: 0..bitmap_height,
            image_height_pt: full_height_pt,
        }],
        Pagination::Sliced => {
            let page_height_pt = settings.page.height_mm * PT_PER_MM;
            let rows_per_page = ((page_height_pt / width_pt) * bitmap_width as f32)
                .floor()
                .max(1.0) as u32;
            (0..bitmap_height)
                .step_by(rows_per_page as usize)
                .map(|start| {
                    let end = (start + rows_per_page).min(bitmap_height);
                    PageLayout {
                        width_pt,
                        height_pt: page_height_pt,
                        rows: start..end,
                        image_height_pt: page_height_for(bitmap_width, end - start, width_pt),
                    }
                })
                .collect()
        }
    }
}

/// Encodes `canvas` into a complete PDF document.
pub fn assemble_pdf(
    canvas: &RgbImage,
    settings: &ExportSettings,
    title: Option<&str>,
) -> Result<Vec<u8>, PdfError> {
    let (width, height) = canvas.dimensions();
    if width == 0 || height == 0 {
        return Err(PdfError::EmptyCanvas);
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let pages = plan_pages(width, height, settings);

    let mut kids = Vec::with_capacity(pages.len());
    for layout in &pages {
        let slice = image::imageops::crop_imm(
            canvas,
            0,
            layout.rows.start,
            width,
            layout.rows.end - layout.rows.start,
        )
        .to_image();
        let (filter, data) = encode_image(&slice, settings.image_encoding)?;
        let image_id = doc.add_object(
            Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => Object::Integer(i64::from(slice.width())),
                    "Height" => Object::Integer(i64::from(slice.height())),
                    "ColorSpace" => "DeviceRGB",
                    "BitsPerComponent" => Object::Integer(8),
                    "Filter" => filter,
                },
                data,
            )
            .with_compression(false),
        );

        let content_id = doc.add_object(Stream::new(dictionary! {}, page_content(layout)?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::from(layout.width_pt),
                Object::from(layout.height_pt),
            ],
            "Resources" => dictionary! {
                "XObject" => dictionary! { IMAGE_NAME => image_id },
            },
            "Contents" => content_id,
        });
        kids.push(Object::from(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(count),
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    let info_id = document_info(&mut doc, title);
    doc.trailer.set("Info", info_id);

    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|err| PdfError::Serialize(err.to_string()))?;
    Ok(out)
}

/// Draws the page image across the full width, anchored to the page top.
fn page_content(layout: &PageLayout) -> Result<Vec<u8>, PdfError> {
    let y = layout.height_pt - layout.image_height_pt;
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::from(layout.width_pt),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::from(layout.image_height_pt),
                    Object::Integer(0),
                    Object::from(y),
                ],
            ),
            Operation::new("Do", vec![Object::Name(IMAGE_NAME.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    content
        .encode()
        .map_err(|err| PdfError::Serialize(err.to_string()))
}

fn document_info(doc: &mut Document, title: Option<&str>) -> ObjectId {
    let mut info = dictionary! {
        "Producer" => Object::string_literal("resume-export"),
    };
    if let Some(title) = title.filter(|t| !t.is_empty()) {
        info.set(
            "Title",
            Object::String(utf16_text(title), StringFormat::Hexadecimal),
        );
    }
    doc.add_object(info)
}

fn encode_image(slice: &RgbImage, encoding: ImageEncoding) -> Result<(&'static str, Vec<u8>), PdfError> {
    match encoding {
        ImageEncoding::Flate => {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(slice.as_raw())?;
            Ok(("FlateDecode", encoder.finish()?))
        }
        ImageEncoding::Jpeg { quality } => {
            let mut out = Vec::new();
            JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100))
                .encode_image(slice)
                .map_err(|e| PdfError::Encode(e.to_string()))?;
            Ok(("DCTDecode", out))
        }
    }
}

/// PDF text string bytes: UTF-16BE with byte order mark.
fn utf16_text(text: &str) -> Vec<u8> {
    let mut out = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        out.extend_from_slice(&unit.to_be_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn sliced_pages_cover_every_row() {
        let settings = ExportSettings {
            pagination: Pagination::Sliced,
            ..ExportSettings::default()
        };
        let pages = plan_pages(1000, 3000, &settings);
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].rows.start, 0);
        assert_eq!(pages.last().map(|p| p.rows.end), Some(3000));
        assert!(pages.windows(2).all(|w| w[0].rows.end == w[1].rows.start));
    }

    #[test]
    fn title_is_utf16_with_bom() {
        assert_eq!(utf16_text("Aé"), vec![0xFE, 0xFF, 0x00, 0x41, 0x00, 0xE9]);
    }
}
