use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use export_engine::{
    DisplayList, DownloadError, DownloadSink, ExportError, ExportFormat, ExportProgress,
    ExportSettings, ExportStage, Exporter, FallbackFontBook, FontBook, HostPage, MemorySink,
    ProgressSink, RasterError, Rasterizer,
};
use image::RgbImage;
use pretty_assertions::assert_eq;

const RESUME: &str = r#"
<div class="resume">
  <h1 style="color: oklch(0.21 0.03 264)">Jane Doe</h1>
  <p>Rust engineer. <a href="https://jane.dev">jane.dev</a></p>
  <h2>Skills</h2>
  <ul><li>Async</li><li>Parsers</li></ul>
</div>
"#;

fn fast_settings() -> ExportSettings {
    ExportSettings {
        scale: 1.0,
        settle_delay: Duration::ZERO,
        ..ExportSettings::default()
    }
}

fn exporter(sink: Arc<dyn DownloadSink>) -> Exporter {
    Exporter::new(sink, fast_settings()).with_fonts(Arc::new(FallbackFontBook))
}

struct FailingRasterizer;

#[async_trait::async_trait]
impl Rasterizer for FailingRasterizer {
    async fn rasterize(
        &self,
        _list: &DisplayList,
        _fonts: &dyn FontBook,
        _scale: f32,
    ) -> Result<RgbImage, RasterError> {
        Err(RasterError::Canvas {
            width: 0,
            height: 0,
        })
    }
}

struct RejectingSink;

#[async_trait::async_trait]
impl DownloadSink for RejectingSink {
    async fn save(&self, _: &str, _: &str, _: Bytes) -> Result<(), DownloadError> {
        Err(DownloadError::Rejected("blocked by user agent".into()))
    }
}

#[derive(Default)]
struct RecordingProgress(Mutex<Vec<ExportProgress>>);

impl ProgressSink for RecordingProgress {
    fn emit(&self, progress: ExportProgress) {
        if let Ok(mut events) = self.0.lock() {
            events.push(progress);
        }
    }
}

#[tokio::test]
async fn pdf_download_uses_normalized_name_and_cleans_up() {
    let sink = MemorySink::new();
    let exporter = exporter(sink.clone());

    exporter.to_pdf(RESUME, "cv").await.unwrap();

    let files = sink.files();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].file_name, "cv.pdf");
    assert_eq!(files[0].mime_type, "application/pdf");
    assert!(files[0].bytes.starts_with(b"%PDF-"));
    assert!(exporter.host().attached_nodes().is_empty());
    assert_eq!(exporter.host().live_object_urls(), 0);
}

#[tokio::test]
async fn existing_extension_is_not_doubled() {
    let sink = MemorySink::new();
    let exporter = exporter(sink.clone());

    exporter.to_pdf(RESUME, "cv.pdf").await.unwrap();
    exporter.to_docx(RESUME, "").await.unwrap();

    let names: Vec<String> = sink.files().into_iter().map(|f| f.file_name).collect();
    assert_eq!(names, vec!["cv.pdf".to_string(), "resume.docx".to_string()]);
}

#[tokio::test]
async fn raster_failure_leaves_no_render_surface_behind() {
    let sink = MemorySink::new();
    let host = HostPage::new();
    let exporter = exporter(sink.clone())
        .with_host(host.clone())
        .with_rasterizer(Arc::new(FailingRasterizer));

    let err = exporter.to_pdf(RESUME, "cv").await.unwrap_err();

    assert!(matches!(err, ExportError::Raster(RasterError::Canvas { .. })));
    assert!(host.attached_nodes().is_empty());
    assert!(sink.files().is_empty());
}

#[tokio::test]
async fn cross_origin_image_fails_the_pdf_export() {
    let sink = MemorySink::new();
    let exporter = exporter(sink.clone());
    let html = r#"<p>Photo</p><img src="https://cdn.example.com/me.png" width="80" height="80">"#;

    let err = exporter.to_pdf(html, "cv").await.unwrap_err();

    assert!(matches!(
        err,
        ExportError::Raster(RasterError::TaintedCanvas(_))
    ));
    assert!(exporter.host().attached_nodes().is_empty());
}

#[tokio::test]
async fn rejected_download_still_releases_object_url() {
    let exporter = exporter(Arc::new(RejectingSink));

    let err = exporter.to_docx(RESUME, "cv").await.unwrap_err();

    assert!(matches!(err, ExportError::Download(DownloadError::Rejected(_))));
    assert_eq!(exporter.host().live_object_urls(), 0);
    assert!(exporter.host().attached_nodes().is_empty());
}

#[tokio::test]
async fn docx_download_is_a_word_package() {
    let sink = MemorySink::new();
    exporter(sink.clone()).to_docx(RESUME, "Jane Doe").await.unwrap();

    let files = sink.files();
    assert_eq!(files[0].file_name, "Jane Doe.docx");
    assert_eq!(files[0].mime_type, ExportFormat::Docx.mime_type());
    assert!(files[0].bytes.starts_with(b"PK"));
}

#[tokio::test]
async fn empty_content_still_produces_documents() {
    let sink = MemorySink::new();
    let exporter = exporter(sink.clone());

    exporter.to_pdf("", "empty").await.unwrap();
    exporter.to_docx("", "empty").await.unwrap();

    assert_eq!(sink.files().len(), 2);
}

#[tokio::test]
async fn concurrent_exports_are_independent() {
    let sink = MemorySink::new();
    let exporter = exporter(sink.clone());

    let (pdf, docx) = tokio::join!(
        exporter.to_pdf(RESUME, "a"),
        exporter.to_docx("<p>Other</p>", "b")
    );
    pdf.unwrap();
    docx.unwrap();

    let mut names: Vec<String> = sink.files().into_iter().map(|f| f.file_name).collect();
    names.sort();
    assert_eq!(names, vec!["a.pdf".to_string(), "b.docx".to_string()]);
    assert!(exporter.host().attached_nodes().is_empty());
}

#[tokio::test]
async fn progress_runs_through_to_done() {
    let sink = MemorySink::new();
    let progress = Arc::new(RecordingProgress::default());
    let exporter = exporter(sink).with_progress(progress.clone());

    exporter.to_pdf(RESUME, "cv").await.unwrap();

    let stages: Vec<ExportStage> = progress
        .0
        .lock()
        .unwrap()
        .iter()
        .map(|p| p.stage)
        .collect();
    assert_eq!(
        stages,
        vec![
            ExportStage::LoadingResources,
            ExportStage::Sanitizing,
            ExportStage::Rendering,
            ExportStage::Settling,
            ExportStage::Rasterizing,
            ExportStage::Assembling,
            ExportStage::Delivering,
            ExportStage::Done,
        ]
    );
}

#[tokio::test]
async fn deeply_nested_markup_exports_to_both_formats() {
    let sink = MemorySink::new();
    let exporter = exporter(sink.clone());
    let html = format!("{}x{}", "<span>".repeat(20_000), "</span>".repeat(20_000));

    exporter.to_pdf(&html, "deep").await.unwrap();
    exporter.to_docx(&html, "deep").await.unwrap();

    assert_eq!(sink.files().len(), 2);
    assert!(exporter.host().attached_nodes().is_empty());
}
