//! Command implementations
//!
//! Each module corresponds to a subcommand in the CLI. Commands are thin
//! adapters: they load the roster and configuration, drive the dispatch
//! core, and render its report.

pub mod check;
pub mod preview;
pub mod send;

// Re-export commonly used types
pub use check::run as check_run;
pub use preview::run as preview_run;
pub use send::{run as send_run, SendArgs};
