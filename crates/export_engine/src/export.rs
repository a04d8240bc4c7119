//! Public entry points: `to_pdf` and `to_docx`.

use std::sync::Arc;

use bytes::Bytes;
use export_logging::{export_debug, export_info, export_warn, next_call_id};

use crate::docx::{package_docx, structural_blocks, DocxError};
use crate::download::{trigger_download, DownloadError, DownloadSink};
use crate::filename::export_filename;
use crate::fonts::{shared_font_book, FontBook};
use crate::host::HostPage;
use crate::pdf::{assemble_pdf, PdfError};
use crate::raster::{RasterError, Rasterizer, SkiaRasterizer};
use crate::sanitize::sanitize;
use crate::surface::RenderSurface;
use crate::types::{ExportFormat, ExportProgress, ExportSettings, ExportStage, NoProgress, ProgressSink};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("rasterization failed: {0}")]
    Raster(#[from] RasterError),
    #[error("PDF assembly failed: {0}")]
    Pdf(#[from] PdfError),
    #[error("Word packaging failed: {0}")]
    Docx(#[from] DocxError),
    #[error("download failed: {0}")]
    Download(#[from] DownloadError),
}

/// Converts resume HTML into downloadable documents.
///
/// Each call is independent; concurrent calls share nothing but the host page,
/// and every temporary artifact a call creates is released when it returns.
pub struct Exporter {
    host: Arc<HostPage>,
    sink: Arc<dyn DownloadSink>,
    settings: ExportSettings,
    rasterizer: Arc<dyn Rasterizer>,
    fonts: Option<Arc<dyn FontBook>>,
    progress: Arc<dyn ProgressSink>,
}

impl Exporter {
    pub fn new(sink: Arc<dyn DownloadSink>, settings: ExportSettings) -> Self {
        Self {
            host: HostPage::new(),
            sink,
            settings,
            rasterizer: Arc::new(SkiaRasterizer),
            fonts: None,
            progress: Arc::new(NoProgress),
        }
    }

    pub fn with_host(mut self, host: Arc<HostPage>) -> Self {
        self.host = host;
        self
    }

    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn Rasterizer>) -> Self {
        self.rasterizer = rasterizer;
        self
    }

    /// Pins the font book instead of scanning system fonts on first use.
    pub fn with_fonts(mut self, fonts: Arc<dyn FontBook>) -> Self {
        self.fonts = Some(fonts);
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn host(&self) -> &Arc<HostPage> {
        &self.host
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    /// Renders `html` as a paginated raster PDF and downloads it.
    pub async fn to_pdf(&self, html: &str, file_name: &str) -> Result<(), ExportError> {
        let call_id = next_call_id();
        let file_name = export_filename(file_name, ExportFormat::Pdf);
        export_info!("[{call_id}] PDF export to {file_name}");

        let result = self.pdf_pipeline(call_id, html, &file_name).await;
        self.finish(call_id, ExportFormat::Pdf, &result);
        result
    }

    /// Rebuilds the block structure of `html` as a Word document and downloads it.
    pub async fn to_docx(&self, html: &str, file_name: &str) -> Result<(), ExportError> {
        let call_id = next_call_id();
        let file_name = export_filename(file_name, ExportFormat::Docx);
        export_info!("[{call_id}] Word export to {file_name}");

        let result = self.docx_pipeline(call_id, html, &file_name).await;
        self.finish(call_id, ExportFormat::Docx, &result);
        result
    }

    async fn pdf_pipeline(&self, call_id: u64, html: &str, file_name: &str) -> Result<(), ExportError> {
        let format = ExportFormat::Pdf;
        self.stage(call_id, format, ExportStage::LoadingResources);
        let fonts = match &self.fonts {
            Some(fonts) => Arc::clone(fonts),
            None => shared_font_book().await,
        };

        self.stage(call_id, format, ExportStage::Sanitizing);
        let sanitized = sanitize(html);

        self.stage(call_id, format, ExportStage::Rendering);
        let surface = RenderSurface::acquire(&self.host, &sanitized, self.settings.page);

        self.stage(call_id, format, ExportStage::Settling);
        surface.settle(self.settings.settle_delay).await;
        let list = surface.layout(fonts.as_ref());

        self.stage(call_id, format, ExportStage::Rasterizing);
        let canvas = self
            .rasterizer
            .rasterize(&list, fonts.as_ref(), self.settings.scale)
            .await?;
        drop(surface);
        export_debug!(
            "[{call_id}] canvas {}x{} from {} display items",
            canvas.width(),
            canvas.height(),
            list.items.len()
        );

        self.stage(call_id, format, ExportStage::Assembling);
        let title = file_name.strip_suffix(".pdf").unwrap_or(file_name);
        let bytes = assemble_pdf(&canvas, &self.settings, Some(title))?;
        drop(canvas);

        self.deliver(call_id, format, file_name, bytes).await
    }

    async fn docx_pipeline(&self, call_id: u64, html: &str, file_name: &str) -> Result<(), ExportError> {
        let format = ExportFormat::Docx;
        self.stage(call_id, format, ExportStage::Sanitizing);
        let blocks = structural_blocks(html);
        export_debug!("[{call_id}] {} blocks", blocks.len());

        self.stage(call_id, format, ExportStage::Packaging);
        let bytes = package_docx(&blocks)?;

        self.deliver(call_id, format, file_name, bytes).await
    }

    async fn deliver(
        &self,
        call_id: u64,
        format: ExportFormat,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<(), ExportError> {
        self.stage(call_id, format, ExportStage::Delivering);
        trigger_download(
            &self.host,
            self.sink.as_ref(),
            file_name,
            format.mime_type(),
            Bytes::from(bytes),
        )
        .await?;
        Ok(())
    }

    fn finish(&self, call_id: u64, format: ExportFormat, result: &Result<(), ExportError>) {
        match result {
            Ok(()) => self.stage(call_id, format, ExportStage::Done),
            Err(err) => export_warn!("[{call_id}] {format} export failed: {err}"),
        }
    }

    fn stage(&self, call_id: u64, format: ExportFormat, stage: ExportStage) {
        export_debug!("[{call_id}] {format} {stage:?}");
        self.progress.emit(ExportProgress {
            call_id,
            format,
            stage,
        });
    }
}
