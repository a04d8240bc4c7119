use std::sync::Once;

use export_panel::{update, DownloadFormat, Effect, ExportResultKind, Msg, PanelState};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(export_logging::initialize_for_tests);
}

fn loaded(html: &str, name: Option<&str>) -> PanelState {
    let (state, effects) = update(
        PanelState::new(),
        Msg::ContentLoaded {
            html: html.to_string(),
            profile_name: name.map(str::to_string),
        },
    );
    assert!(effects.is_empty());
    state
}

#[test]
fn download_without_content_does_nothing() {
    init_logging();
    let state = loaded("   ", Some("Jane"));
    let view = state.view();
    assert!(!view.has_content);
    assert!(!view.pdf_enabled);

    let (_state, effects) = update(state, Msg::DownloadClicked(DownloadFormat::Pdf));
    assert!(effects.is_empty());
}

#[test]
fn download_emits_export_named_after_profile() {
    init_logging();
    let state = loaded("<h1>Jane</h1>", Some("Jane Doe"));

    let (state, effects) = update(state, Msg::DownloadClicked(DownloadFormat::Pdf));

    assert_eq!(
        effects,
        vec![Effect::Export {
            job_id: 1,
            format: DownloadFormat::Pdf,
            html: "<h1>Jane</h1>".to_string(),
            file_name: "Jane Doe.pdf".to_string(),
        }]
    );
    let view = state.view();
    assert_eq!(view.busy, vec![DownloadFormat::Pdf]);
    assert!(!view.pdf_enabled);
    assert!(view.word_enabled);
}

#[test]
fn missing_profile_name_falls_back_to_resume() {
    init_logging();
    let state = loaded("<p>x</p>", Some("  "));
    let (_state, effects) = update(state, Msg::DownloadClicked(DownloadFormat::Word));

    match effects.as_slice() {
        [Effect::Export { file_name, .. }] => assert_eq!(file_name, "resume.docx"),
        other => panic!("unexpected effects: {other:?}"),
    }
}

#[test]
fn second_click_while_busy_is_ignored_per_format() {
    init_logging();
    let state = loaded("<p>x</p>", None);
    let (state, _) = update(state, Msg::DownloadClicked(DownloadFormat::Pdf));
    let (state, again) = update(state, Msg::DownloadClicked(DownloadFormat::Pdf));
    assert!(again.is_empty());

    let (state, word) = update(state, Msg::DownloadClicked(DownloadFormat::Word));
    assert_eq!(word.len(), 1);
    assert_eq!(state.view().busy.len(), 2);
}

#[test]
fn failure_records_notice_until_dismissed() {
    init_logging();
    let state = loaded("<p>x</p>", None);
    let (state, _) = update(state, Msg::DownloadClicked(DownloadFormat::Pdf));
    let (mut state, _) = update(
        state,
        Msg::ExportFinished {
            job_id: 1,
            result: ExportResultKind::Failed("canvas tainted".into()),
        },
    );

    let view = state.view();
    assert!(view.busy.is_empty());
    assert!(view.pdf_enabled);
    assert_eq!(
        view.notice.as_deref(),
        Some("Could not export PDF: canvas tainted")
    );
    assert!(state.consume_dirty());
    assert!(!state.consume_dirty());

    let (mut state, _) = update(state, Msg::DismissNotice);
    assert_eq!(state.view().notice, None);
    assert!(state.consume_dirty());
}

#[test]
fn success_counts_saved_and_unknown_jobs_are_ignored() {
    init_logging();
    let state = loaded("<p>x</p>", None);
    let (state, _) = update(state, Msg::DownloadClicked(DownloadFormat::Word));
    let (state, _) = update(
        state,
        Msg::ExportFinished {
            job_id: 99,
            result: ExportResultKind::Saved,
        },
    );
    assert_eq!(state.view().busy, vec![DownloadFormat::Word]);

    let (state, _) = update(
        state,
        Msg::ExportFinished {
            job_id: 1,
            result: ExportResultKind::Saved,
        },
    );
    let view = state.view();
    assert_eq!(view.saved, 1);
    assert_eq!(view.notice, None);
    assert!(view.busy.is_empty());
}
