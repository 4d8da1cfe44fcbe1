//! Batch SMS Dispatch Library
//!
//! This library provides tools to:
//! - Load a recipient roster from a CSV spreadsheet export
//! - Build templated SMS requests with normalized phone numbers
//! - Send messages one by one through Tencent Cloud SMS
//! - Track batch progress with cooperative cancellation
//! - Aggregate per-recipient outcomes into an exportable report

pub mod config;
pub mod dispatch;
pub mod error;
pub mod providers;
pub mod report;
pub mod request;
pub mod roster;

// Re-export common types
pub use config::Config;
pub use dispatch::{BatchDispatcher, BatchHandle, BatchState, Progress};
pub use error::{Error, Result};
pub use providers::{ProviderReply, SmsProvider, TencentSmsClient};
pub use report::{BatchReport, DispatchOutcome, OutcomeStatus, ReportSummary};
pub use request::{build_request, normalize_phone, MessageRequest, TemplateConfig};
pub use roster::{load_roster, read_roster, RecipientRow};

// Commands module uses re-exported types, so it must be declared after the re-exports
pub mod commands;
