use std::fs;
use std::path::Path;

use anyhow::Context;
use export_engine::ExportSettings;
use export_logging::export_info;

/// Reads export settings from a RON file; fields left out keep their defaults.
pub(crate) fn load_settings(path: Option<&Path>) -> anyhow::Result<ExportSettings> {
    let Some(path) = path else {
        return Ok(ExportSettings::default());
    };
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading settings from {}", path.display()))?;
    let settings = parse_settings(&content)
        .with_context(|| format!("parsing settings in {}", path.display()))?;
    export_info!("Loaded export settings from {}", path.display());
    Ok(settings)
}

fn parse_settings(content: &str) -> Result<ExportSettings, ron::error::SpannedError> {
    ron::from_str(content)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use export_engine::{ImageEncoding, Pagination};
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let settings =
            parse_settings("(scale: 3.0, pagination: Sliced, image_encoding: Jpeg(quality: 98))")
                .unwrap();
        assert_eq!(settings.scale, 3.0);
        assert_eq!(settings.pagination, Pagination::Sliced);
        assert_eq!(settings.image_encoding, ImageEncoding::Jpeg { quality: 98 });
        assert_eq!(settings.settle_delay, Duration::from_millis(50));
        assert_eq!(settings.page, ExportSettings::default().page);
    }

    #[test]
    fn settle_delay_is_in_milliseconds() {
        let settings = parse_settings("(settle_delay: 0)").unwrap();
        assert_eq!(settings.settle_delay, Duration::ZERO);
    }

    #[test]
    fn missing_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let err = load_settings(Some(&temp.path().join("nope.ron"))).unwrap_err();
        assert!(err.to_string().contains("reading settings"));
    }

    #[test]
    fn no_file_means_defaults() {
        assert_eq!(load_settings(None).unwrap(), ExportSettings::default());
    }
}
