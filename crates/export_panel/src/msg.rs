#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Rendered resume markup and the profile name it belongs to.
    ContentLoaded {
        html: String,
        profile_name: Option<String>,
    },
    /// User clicked one of the download buttons.
    DownloadClicked(crate::DownloadFormat),
    /// Engine completion for an export.
    ExportFinished {
        job_id: crate::JobId,
        result: crate::ExportResultKind,
    },
    /// User closed the failure notice.
    DismissNotice,
    /// Fallback for placeholder wiring.
    NoOp,
}
