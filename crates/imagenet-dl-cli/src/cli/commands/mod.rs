//! CLI command handlers. Each command is in its own file.

mod run;
mod status;

pub use run::run_download;
pub use status::run_status;
