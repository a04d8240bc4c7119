use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// CSS reference pixels per millimetre (96 dpi).
pub const PX_PER_MM: f32 = 96.0 / 25.4;
/// PDF points per millimetre (72 dpi).
pub const PT_PER_MM: f32 = 72.0 / 25.4;

pub const A4_WIDTH_MM: f32 = 210.0;
pub const A4_HEIGHT_MM: f32 = 297.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Pdf,
    Docx,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Docx => "docx",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Pdf => write!(f, "PDF"),
            ExportFormat::Docx => write!(f, "Word"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStage {
    LoadingResources,
    Sanitizing,
    Rendering,
    Settling,
    Rasterizing,
    Assembling,
    Packaging,
    Delivering,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportProgress {
    pub call_id: u64,
    pub format: ExportFormat,
    pub stage: ExportStage,
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, progress: ExportProgress);
}

/// Discards every progress event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn emit(&self, _progress: ExportProgress) {}
}

/// How a bitmap taller than one physical page is laid onto PDF pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Pagination {
    /// One page whose height is stretched to fit the whole bitmap.
    #[default]
    Single,
    /// The bitmap is cut into slices of one physical page height.
    Sliced,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum ImageEncoding {
    /// Raw RGB samples, zlib-compressed.
    #[default]
    Flate,
    /// Baseline JPEG at the given quality (1..=100).
    Jpeg { quality: u8 },
}

/// Physical page geometry of the render surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub width_mm: f32,
    pub height_mm: f32,
    pub padding_mm: f32,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self {
            width_mm: A4_WIDTH_MM,
            height_mm: A4_HEIGHT_MM,
            padding_mm: 20.0,
        }
    }
}

impl PageGeometry {
    pub fn width_px(&self) -> f32 {
        self.width_mm * PX_PER_MM
    }

    pub fn min_height_px(&self) -> f32 {
        self.height_mm * PX_PER_MM
    }

    pub fn padding_px(&self) -> f32 {
        self.padding_mm * PX_PER_MM
    }

    pub fn content_width_px(&self) -> f32 {
        (self.width_px() - 2.0 * self.padding_px()).max(1.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub page: PageGeometry,
    /// Supersampling factor applied when rasterizing the surface.
    pub scale: f32,
    /// Fixed wait before the surface is laid out and rasterized.
    #[serde(with = "millis")]
    pub settle_delay: Duration,
    pub pagination: Pagination,
    pub image_encoding: ImageEncoding,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            page: PageGeometry::default(),
            scale: 2.0,
            settle_delay: Duration::from_millis(50),
            pagination: Pagination::Single,
            image_encoding: ImageEncoding::Flate,
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
