//! Command-line host: argument parsing, logging, settings and the export loop.
mod app;
mod args;
mod effects;
mod logging;
mod settings;

pub use app::run_app;
