use std::sync::Arc;

use export_engine::{ExportFormat, ExportProgress, Exporter, ProgressSink};
use export_logging::{export_debug, export_info, export_warn};
use export_panel::{DownloadFormat, Effect, ExportResultKind, Msg};
use tokio::task::JoinSet;

/// Logs each pipeline stage as it is reached.
struct LogProgress;

impl ProgressSink for LogProgress {
    fn emit(&self, progress: ExportProgress) {
        export_debug!(
            "export #{} {}: {:?}",
            progress.call_id,
            progress.format,
            progress.stage
        );
    }
}

pub struct EffectRunner {
    exporter: Arc<Exporter>,
}

impl EffectRunner {
    pub fn new(exporter: Exporter) -> Self {
        Self {
            exporter: Arc::new(exporter.with_progress(Arc::new(LogProgress))),
        }
    }

    /// Runs all effects concurrently and returns the resulting messages.
    pub async fn run(&self, effects: Vec<Effect>) -> Vec<Msg> {
        let mut tasks = JoinSet::new();
        for effect in effects {
            match effect {
                Effect::Export {
                    job_id,
                    format,
                    html,
                    file_name,
                } => {
                    export_info!("Export job_id={job_id} format={} file={file_name}", format.label());
                    let exporter = Arc::clone(&self.exporter);
                    tasks.spawn(async move {
                        let result = match map_format(format) {
                            ExportFormat::Pdf => exporter.to_pdf(&html, &file_name).await,
                            ExportFormat::Docx => exporter.to_docx(&html, &file_name).await,
                        };
                        (job_id, result)
                    });
                }
            }
        }

        let mut messages = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((job_id, result)) => {
                    let result = match result {
                        Ok(()) => ExportResultKind::Saved,
                        Err(err) => {
                            export_warn!("Export {job_id} failed: {err}");
                            ExportResultKind::Failed(err.to_string())
                        }
                    };
                    messages.push(Msg::ExportFinished { job_id, result });
                }
                Err(err) => export_warn!("Export task aborted: {err}"),
            }
        }
        messages
    }
}

fn map_format(format: DownloadFormat) -> ExportFormat {
    match format {
        DownloadFormat::Pdf => ExportFormat::Pdf,
        DownloadFormat::Word => ExportFormat::Docx,
    }
}
