use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use export_engine::Pagination;
use export_panel::DownloadFormat;

#[derive(Debug, Parser)]
#[command(name = "resume-export")]
#[command(version)]
#[command(about = "Export a rendered resume to PDF and Word", long_about = None)]
pub struct Cli {
    /// Rendered resume HTML
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Base name of the downloaded files (defaults to "resume")
    #[arg(long)]
    pub name: Option<String>,

    /// Which documents to produce
    #[arg(long, value_enum, default_value = "both")]
    pub format: FormatArg,

    /// Directory the files are saved into
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub out: PathBuf,

    /// RON file with export settings
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// How tall bitmaps are laid onto PDF pages
    #[arg(long, value_enum)]
    pub pages: Option<PagesArg>,

    /// Character encoding of INPUT when it declares none
    #[arg(long)]
    pub charset: Option<String>,

    /// Log debug output to the terminal and ./export.log
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Pdf,
    Docx,
    Both,
}

impl FormatArg {
    pub fn formats(self) -> Vec<DownloadFormat> {
        match self {
            FormatArg::Pdf => vec![DownloadFormat::Pdf],
            FormatArg::Docx => vec![DownloadFormat::Word],
            FormatArg::Both => vec![DownloadFormat::Pdf, DownloadFormat::Word],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PagesArg {
    Single,
    Sliced,
}

impl From<PagesArg> for Pagination {
    fn from(value: PagesArg) -> Self {
        match value {
            PagesArg::Single => Pagination::Single,
            PagesArg::Sliced => Pagination::Sliced,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_export_both_formats_into_cwd() {
        let cli = Cli::try_parse_from(["resume-export", "cv.html"]).unwrap();
        assert_eq!(cli.format.formats(), vec![DownloadFormat::Pdf, DownloadFormat::Word]);
        assert_eq!(cli.out, PathBuf::from("."));
        assert_eq!(cli.pages, None);
    }

    #[test]
    fn flags_are_parsed() {
        let cli = Cli::try_parse_from([
            "resume-export",
            "cv.html",
            "--name",
            "Jane Doe",
            "--format",
            "docx",
            "--pages",
            "sliced",
            "-v",
        ])
        .unwrap();
        assert_eq!(cli.name.as_deref(), Some("Jane Doe"));
        assert_eq!(cli.format, FormatArg::Docx);
        assert_eq!(cli.pages.map(Pagination::from), Some(Pagination::Sliced));
        assert!(cli.verbose);
    }
}
