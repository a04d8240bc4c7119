#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Export {
        job_id: crate::JobId,
        format: crate::DownloadFormat,
        html: String,
        file_name: String,
    },
}
