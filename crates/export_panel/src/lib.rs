//! Download panel: pure state machine and view-model helpers.
mod effect;
mod msg;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use msg::Msg;
pub use state::{DownloadFormat, ExportResultKind, JobId, PanelState, FALLBACK_BASE_NAME};
pub use update::update;
pub use view_model::PanelViewModel;
