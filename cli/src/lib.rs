//! Library side of the `histrim` binary: session log I/O, the JSONL archive, config
//! resolution and subcommand bodies. `main.rs` only parses arguments and routes output.

pub mod archive;
pub mod commands;
pub mod error;
pub mod options;
pub mod session_log;

pub use archive::JsonlArchive;
pub use commands::{load_history, run_action, score_rows, Action, RunReport, ScoreRow};
pub use error::CliError;
pub use options::{resolve_config, ConfigOverrides};
pub use session_log::{read_items, write_messages};
