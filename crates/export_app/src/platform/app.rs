use std::fs;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use export_engine::{decode_document, DirectorySink, ExportSettings, Exporter};
use export_logging::{export_error, export_info};
use export_panel::{update, Effect, Msg, PanelState};
use log::LevelFilter;

use super::args::Cli;
use super::effects::EffectRunner;
use super::logging::{self, LogDestination};
use super::settings::load_settings;

pub fn run_app() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    if cli.verbose {
        logging::initialize(LogDestination::Both, LevelFilter::Debug);
    } else {
        logging::initialize(LogDestination::Terminal, LevelFilter::Warn);
    }

    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(pages) = cli.pages {
        settings.pagination = pages.into();
    }

    let bytes = fs::read(&cli.input)
        .with_context(|| format!("reading {}", cli.input.display()))?;
    let decoded = decode_document(&bytes, cli.charset.as_deref())
        .with_context(|| format!("decoding {}", cli.input.display()))?;
    export_info!(
        "Decoded {} ({} bytes, {})",
        cli.input.display(),
        bytes.len(),
        decoded.encoding_label
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("starting runtime")?;
    runtime.block_on(export_all(cli, settings, decoded.html))
}

async fn export_all(cli: Cli, settings: ExportSettings, html: String) -> anyhow::Result<ExitCode> {
    let sink = Arc::new(DirectorySink::new(cli.out.clone()));
    let runner = EffectRunner::new(Exporter::new(sink, settings));

    let (mut state, _) = update(
        PanelState::new(),
        Msg::ContentLoaded {
            html,
            profile_name: cli.name.clone(),
        },
    );

    let mut effects: Vec<Effect> = Vec::new();
    for format in cli.format.formats() {
        let (next, mut emitted) = update(state, Msg::DownloadClicked(format));
        state = next;
        effects.append(&mut emitted);
    }
    if effects.is_empty() {
        export_error!("{} has no content to export", cli.input.display());
        return Ok(ExitCode::FAILURE);
    }

    let mut failed = false;
    for msg in runner.run(effects).await {
        (state, _) = update(state, msg);
        if let Some(notice) = state.view().notice {
            eprintln!("{notice}");
            failed = true;
            (state, _) = update(state, Msg::DismissNotice);
        }
    }

    let view = state.view();
    export_info!("{} file(s) saved to {}", view.saved, cli.out.display());
    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
