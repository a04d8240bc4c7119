use crate::{Effect, Msg, PanelState};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: PanelState, msg: Msg) -> (PanelState, Vec<Effect>) {
    let effects = match msg {
        Msg::ContentLoaded { html, profile_name } => {
            state.load_content(html, profile_name);
            Vec::new()
        }
        Msg::DownloadClicked(format) => {
            // Empty content and a second click on a running format are both ignored.
            if !state.has_content() || state.is_busy(format) {
                return (state, Vec::new());
            }
            let file_name = state.file_name(format);
            let html = state.content().to_string();
            let job_id = state.begin_export(format);
            vec![Effect::Export {
                job_id,
                format,
                html,
                file_name,
            }]
        }
        Msg::ExportFinished { job_id, result } => {
            state.finish_export(job_id, result);
            Vec::new()
        }
        Msg::DismissNotice => {
            state.dismiss_notice();
            Vec::new()
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}
