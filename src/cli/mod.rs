//! CLI layer - Command-line interface
//!
//! Contains argument parsing, output formatting, logging setup,
//! session controls, and the command runners.

pub mod app;
pub mod args;
pub mod config_cmd;
pub mod logging;
pub mod presenter;
pub mod signals;

// Re-export commonly used types
pub use app::{run_info, run_play, run_record, EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE_ERROR};
pub use args::{Cli, Commands, ConfigAction, PlayOptions, RecordOptions};
pub use logging::init_logging;
pub use presenter::Presenter;
