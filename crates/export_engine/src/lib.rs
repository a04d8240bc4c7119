//! Resume export engine: sanitizing, offscreen rendering, and PDF/DOCX packaging.
mod decode;
mod docx;
mod dom;
mod download;
mod export;
mod filename;
mod fonts;
mod host;
mod layout;
mod pdf;
mod persist;
mod raster;
mod sanitize;
mod style;
mod surface;
mod types;

pub use decode::{decode_document, DecodeError, DecodedDocument};
pub use docx::{
    build_blocks, package_docx, structural_blocks, Block, BlockKind, DocxError, HeadingLevel,
    RunStyle, TextRun, LINK_RUN_COLOR,
};
pub use dom::{collapse_whitespace, Element, Fragment, Node};
pub use download::{DirectorySink, DownloadError, DownloadSink, DownloadedFile, MemorySink};
pub use export::{ExportError, Exporter};
pub use filename::{export_filename, DEFAULT_BASE_NAME};
pub use fonts::{shared_font_book, FaceKey, FallbackFontBook, FontBook, LineMetrics, SystemFontBook};
pub use host::{AttachedNode, HostPage, ObjectUrl, TempNodeKind};
pub use layout::{layout_page, resolve_image_source, DisplayItem, DisplayList, ImageSource};
pub use pdf::{assemble_pdf, page_height_for, plan_pages, PageLayout, PdfError};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use raster::{RasterError, Rasterizer, SkiaRasterizer};
pub use sanitize::{
    replace_color_functions, sanitize, sanitize_fragment, sanitize_with, SanitizeProfile,
    FOREGROUND_COLOR, LINK_COLOR, MAX_NESTING_DEPTH,
};
pub use style::{parse_color, Color, ComputedStyle, TextAlign};
pub use surface::{RenderSurface, PAGE_CLASS};
pub use types::{
    ExportFormat, ExportProgress, ExportSettings, ExportStage, ImageEncoding, NoProgress,
    PageGeometry, Pagination, ProgressSink, A4_HEIGHT_MM, A4_WIDTH_MM, PT_PER_MM, PX_PER_MM,
};
