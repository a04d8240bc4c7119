use crate::DownloadFormat;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PanelViewModel {
    pub has_content: bool,
    pub pdf_enabled: bool,
    pub word_enabled: bool,
    /// Formats with an export in flight.
    pub busy: Vec<DownloadFormat>,
    /// Exports delivered so far.
    pub saved: usize,
    pub notice: Option<String>,
    pub dirty: bool,
}
