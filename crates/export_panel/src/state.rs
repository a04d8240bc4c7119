use crate::view_model::PanelViewModel;

pub type JobId = u64;

/// Base file name used when the profile has no name.
pub const FALLBACK_BASE_NAME: &str = "resume";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DownloadFormat {
    Pdf,
    Word,
}

impl DownloadFormat {
    pub fn label(self) -> &'static str {
        match self {
            DownloadFormat::Pdf => "PDF",
            DownloadFormat::Word => "Word",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            DownloadFormat::Pdf => "pdf",
            DownloadFormat::Word => "docx",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportResultKind {
    Saved,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RunningExport {
    job_id: JobId,
    format: DownloadFormat,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PanelState {
    content: String,
    profile_name: Option<String>,
    next_job_id: JobId,
    running: Vec<RunningExport>,
    saved: usize,
    notice: Option<String>,
    dirty: bool,
}

impl PanelState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> PanelViewModel {
        let busy: Vec<DownloadFormat> = self.running.iter().map(|r| r.format).collect();
        let has_content = self.has_content();
        PanelViewModel {
            has_content,
            pdf_enabled: has_content && !busy.contains(&DownloadFormat::Pdf),
            word_enabled: has_content && !busy.contains(&DownloadFormat::Word),
            busy,
            saved: self.saved,
            notice: self.notice.clone(),
            dirty: self.dirty,
        }
    }

    /// Returns whether the panel changed since the last call, clearing the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn has_content(&self) -> bool {
        !self.content.trim().is_empty()
    }

    pub fn is_busy(&self, format: DownloadFormat) -> bool {
        self.running.iter().any(|r| r.format == format)
    }

    /// Download name before the engine normalizes it.
    pub fn file_name(&self, format: DownloadFormat) -> String {
        let base = self
            .profile_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(FALLBACK_BASE_NAME);
        format!("{base}.{}", format.extension())
    }

    pub(crate) fn load_content(&mut self, html: String, profile_name: Option<String>) {
        self.content = html;
        self.profile_name = profile_name;
        self.mark_dirty();
    }

    /// Registers a new export and returns its job id.
    pub(crate) fn begin_export(&mut self, format: DownloadFormat) -> JobId {
        self.next_job_id += 1;
        let job_id = self.next_job_id;
        self.running.push(RunningExport { job_id, format });
        self.notice = None;
        self.mark_dirty();
        job_id
    }

    pub(crate) fn content(&self) -> &str {
        &self.content
    }

    pub(crate) fn finish_export(&mut self, job_id: JobId, result: ExportResultKind) {
        let Some(index) = self.running.iter().position(|r| r.job_id == job_id) else {
            return;
        };
        let finished = self.running.remove(index);
        match result {
            ExportResultKind::Saved => self.saved += 1,
            ExportResultKind::Failed(reason) => {
                self.notice = Some(format!(
                    "Could not export {}: {reason}",
                    finished.format.label()
                ));
            }
        }
        self.mark_dirty();
    }

    pub(crate) fn dismiss_notice(&mut self) {
        if self.notice.take().is_some() {
            self.mark_dirty();
        }
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}
