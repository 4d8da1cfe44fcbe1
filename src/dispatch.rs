//! Batch dispatcher
//!
//! Runs the send loop over an ordered roster: build a request per row,
//! dispatch it, record the outcome. A failing row never aborts the batch.
//! One batch at a time per dispatcher instance; cancellation is
//! cooperative and checked at each row boundary, never mid-request.

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Local;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::providers::SmsProvider;
use crate::report::{BatchReport, DispatchOutcome, OutcomeStatus};
use crate::request::{build_request, TemplateConfig};
use crate::roster::RecipientRow;

/// Batch lifecycle: Idle -> Running -> (Completed | Cancelled).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Idle,
    Running,
    Completed,
    Cancelled,
}

impl BatchState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => BatchState::Running,
            2 => BatchState::Completed,
            3 => BatchState::Cancelled,
            _ => BatchState::Idle,
        }
    }
}

/// Progress snapshot, monotonically non-decreasing within a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

#[derive(Debug, Default)]
struct Shared {
    running: AtomicBool,
    cancel: AtomicBool,
    completed: AtomicUsize,
    total: AtomicUsize,
    state: AtomicU8,
}

/// Cloneable read/cancel surface for a presentation layer. Only the
/// dispatcher itself writes outcomes; the handle reads snapshots.
#[derive(Debug, Clone)]
pub struct BatchHandle {
    shared: Arc<Shared>,
}

impl BatchHandle {
    pub fn progress(&self) -> Progress {
        Progress {
            completed: self.shared.completed.load(Ordering::Acquire),
            total: self.shared.total.load(Ordering::Acquire),
        }
    }

    pub fn state(&self) -> BatchState {
        BatchState::from_u8(self.shared.state.load(Ordering::Acquire))
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Request cooperative cancellation. The current row still finishes;
    /// the loop stops before starting the next one.
    pub fn cancel(&self) {
        self.shared.cancel.store(true, Ordering::Release);
    }
}

/// The batch dispatcher. Owns the report while a batch is running.
pub struct BatchDispatcher {
    provider: Arc<dyn SmsProvider>,
    template: TemplateConfig,
    shared: Arc<Shared>,
    outcome_tx: Mutex<Option<mpsc::UnboundedSender<DispatchOutcome>>>,
}

impl BatchDispatcher {
    pub fn new(provider: Arc<dyn SmsProvider>, template: TemplateConfig) -> Self {
        Self {
            provider,
            template,
            shared: Arc::new(Shared::default()),
            outcome_tx: Mutex::new(None),
        }
    }

    /// Handle for progress reads and cancellation.
    pub fn handle(&self) -> BatchHandle {
        BatchHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Subscribe to the live outcome stream. Each outcome is delivered in
    /// row order as it is appended to the report.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<DispatchOutcome> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut slot) = self.outcome_tx.lock() {
            *slot = Some(tx);
        }
        rx
    }

    /// Run one batch over the rows, strictly in input order.
    ///
    /// Returns `Error::Busy` if a batch is already running on this
    /// instance; otherwise always produces a finalized report, partial
    /// when cancelled.
    pub async fn run(&self, rows: &[RecipientRow]) -> Result<BatchReport> {
        if self
            .shared
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::Busy);
        }

        self.shared.cancel.store(false, Ordering::Release);
        self.shared.completed.store(0, Ordering::Release);
        self.shared.total.store(rows.len(), Ordering::Release);
        self.shared
            .state
            .store(BatchState::Running as u8, Ordering::Release);

        let outcome_tx = self
            .outcome_tx
            .lock()
            .ok()
            .and_then(|slot| slot.clone());

        info!(total = rows.len(), "Starting SMS batch");

        let mut report = BatchReport::new();
        let mut cancelled = false;

        for (index, row) in rows.iter().enumerate() {
            if self.shared.cancel.load(Ordering::Acquire) {
                cancelled = true;
                break;
            }

            let outcome = self.dispatch_row(index, row).await;

            match outcome.status {
                OutcomeStatus::Success => {
                    info!(row = index + 1, recipient = %outcome.recipient, "Sent")
                }
                OutcomeStatus::Failure => warn!(
                    row = index + 1,
                    recipient = %outcome.recipient,
                    detail = %outcome.detail,
                    "Send failed"
                ),
            }

            if let Some(ref tx) = outcome_tx {
                // Receiver may be gone; the report still gets the outcome
                let _ = tx.send(outcome.clone());
            }
            report.push(outcome);
            self.shared.completed.fetch_add(1, Ordering::AcqRel);
        }

        let final_state = if cancelled {
            report.mark_cancelled();
            BatchState::Cancelled
        } else {
            BatchState::Completed
        };
        self.shared
            .state
            .store(final_state as u8, Ordering::Release);
        self.shared.running.store(false, Ordering::Release);

        let summary = report.summary();
        info!(
            total = summary.total,
            success = summary.success_count,
            failure = summary.failure_count,
            cancelled,
            "Batch finished"
        );

        Ok(report)
    }

    async fn dispatch_row(&self, index: usize, row: &RecipientRow) -> DispatchOutcome {
        match build_request(index, row, &self.template) {
            Ok(request) => {
                let reply = self.provider.send_sms(&request).await;
                DispatchOutcome {
                    row_index: index,
                    name: row.name.clone(),
                    recipient: request.recipient,
                    status: if reply.ok {
                        OutcomeStatus::Success
                    } else {
                        OutcomeStatus::Failure
                    },
                    detail: reply.detail,
                    timestamp: Local::now(),
                }
            }
            // Validation failures become Failure outcomes; the batch goes on
            Err(err) => DispatchOutcome {
                row_index: index,
                name: row.name.clone(),
                recipient: row.phone.trim().to_string(),
                status: OutcomeStatus::Failure,
                detail: err.to_string(),
                timestamp: Local::now(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProviderReply;
    use crate::request::MessageRequest;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    fn row(name: &str, phone: &str) -> RecipientRow {
        RecipientRow {
            name: name.to_string(),
            phone: phone.to_string(),
            date: "05-01".to_string(),
            time: "14:00".to_string(),
            place: "Room A".to_string(),
        }
    }

    fn template() -> TemplateConfig {
        TemplateConfig {
            template_id: "449739".to_string(),
            param_order: vec![
                "name".to_string(),
                "date".to_string(),
                "time".to_string(),
                "place".to_string(),
            ],
            default_country_prefix: "+86".to_string(),
        }
    }

    /// Provider scripted to fail for specific recipients.
    struct ScriptedProvider {
        fail_recipients: Vec<String>,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(fail_recipients: &[&str]) -> Self {
            Self {
                fail_recipients: fail_recipients.iter().map(|s| s.to_string()).collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SmsProvider for ScriptedProvider {
        async fn send_sms(&self, request: &MessageRequest) -> ProviderReply {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_recipients.contains(&request.recipient) {
                ProviderReply::failed("LimitExceeded: daily limit")
            } else {
                ProviderReply::ok("send success")
            }
        }
    }

    /// Provider that cancels the batch through its handle after N sends.
    struct CancellingProvider {
        handle: Mutex<Option<BatchHandle>>,
        cancel_after: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SmsProvider for CancellingProvider {
        async fn send_sms(&self, _request: &MessageRequest) -> ProviderReply {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call == self.cancel_after {
                if let Ok(slot) = self.handle.lock() {
                    if let Some(ref handle) = *slot {
                        handle.cancel();
                    }
                }
            }
            ProviderReply::ok("send success")
        }
    }

    #[tokio::test]
    async fn report_has_one_outcome_per_row_in_order() {
        let provider = Arc::new(ScriptedProvider::new(&[]));
        let dispatcher = BatchDispatcher::new(provider.clone(), template());

        let rows: Vec<RecipientRow> = (0..5)
            .map(|i| row(&format!("user{}", i), &format!("137{:08}", i)))
            .collect();

        let report = dispatcher.run(&rows).await.unwrap();

        assert_eq!(report.outcomes().len(), 5);
        let indices: Vec<usize> = report.outcomes().iter().map(|o| o.row_index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 5);

        let summary = report.summary();
        assert_eq!(summary.success_count + summary.failure_count, summary.total);
        assert_eq!(dispatcher.handle().state(), BatchState::Completed);
    }

    #[tokio::test]
    async fn provider_failure_does_not_abort_batch() {
        let provider = Arc::new(ScriptedProvider::new(&["+8613700000001"]));
        let dispatcher = BatchDispatcher::new(provider, template());

        let rows = vec![
            row("a", "13700000000"),
            row("b", "13700000001"),
            row("c", "13700000002"),
        ];

        let report = dispatcher.run(&rows).await.unwrap();
        let summary = report.summary();

        assert_eq!(summary.total, 3);
        assert_eq!(summary.success_count, 2);
        assert_eq!(summary.failure_count, 1);
        assert_eq!(report.outcomes()[1].status, OutcomeStatus::Failure);
        assert!(report.outcomes()[1].detail.contains("LimitExceeded"));
    }

    #[tokio::test]
    async fn blank_field_yields_validation_failure_and_continues() {
        let provider = Arc::new(ScriptedProvider::new(&[]));
        let dispatcher = BatchDispatcher::new(provider.clone(), template());

        let rows = vec![row("a", "13700000000"), row("b", ""), row("c", "13700000002")];

        let report = dispatcher.run(&rows).await.unwrap();

        assert_eq!(report.outcomes().len(), 3);
        assert_eq!(report.outcomes()[1].status, OutcomeStatus::Failure);
        assert!(report.outcomes()[1].detail.contains("Row validation failed"));
        assert!(report.outcomes()[1].detail.contains("phone"));
        // The blank row never reaches the provider
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
        assert_eq!(report.outcomes()[2].status, OutcomeStatus::Success);
    }

    #[tokio::test]
    async fn phone_numbers_are_normalized_per_default_prefix() {
        let provider = Arc::new(ScriptedProvider::new(&[]));
        let dispatcher = BatchDispatcher::new(provider, template());

        let rows = vec![row("Li", "13711112222"), row("Wu", "+1234567")];
        let report = dispatcher.run(&rows).await.unwrap();

        assert_eq!(report.outcomes()[0].recipient, "+8613711112222");
        assert_eq!(report.outcomes()[1].recipient, "+1234567");
    }

    #[tokio::test]
    async fn cancellation_stops_after_current_row() {
        let provider = Arc::new(CancellingProvider {
            handle: Mutex::new(None),
            cancel_after: 3,
            calls: AtomicUsize::new(0),
        });
        let dispatcher = BatchDispatcher::new(provider.clone(), template());
        if let Ok(mut slot) = provider.handle.lock() {
            *slot = Some(dispatcher.handle());
        }

        let rows: Vec<RecipientRow> = (0..10)
            .map(|i| row(&format!("user{}", i), &format!("137{:08}", i)))
            .collect();

        let report = dispatcher.run(&rows).await.unwrap();

        assert!(report.cancelled());
        assert_eq!(report.outcomes().len(), 3);
        assert_eq!(report.summary().total, 3);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
        assert_eq!(dispatcher.handle().state(), BatchState::Cancelled);
    }

    #[tokio::test]
    async fn progress_tracks_completed_rows() {
        let provider = Arc::new(ScriptedProvider::new(&[]));
        let dispatcher = BatchDispatcher::new(provider, template());
        let handle = dispatcher.handle();

        assert_eq!(handle.progress(), Progress { completed: 0, total: 0 });

        let rows = vec![row("a", "137"), row("b", "138")];
        dispatcher.run(&rows).await.unwrap();

        assert_eq!(handle.progress(), Progress { completed: 2, total: 2 });
        assert!(!handle.is_running());
    }

    #[tokio::test]
    async fn outcome_stream_delivers_rows_in_order() {
        let provider = Arc::new(ScriptedProvider::new(&[]));
        let dispatcher = BatchDispatcher::new(provider, template());
        let mut stream = dispatcher.subscribe();

        let rows = vec![row("a", "137"), row("b", "138"), row("c", "139")];
        dispatcher.run(&rows).await.unwrap();

        let mut seen = Vec::new();
        while let Ok(outcome) = stream.try_recv() {
            seen.push(outcome.row_index);
        }
        assert_eq!(seen, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn empty_roster_completes_with_empty_report() {
        let provider = Arc::new(ScriptedProvider::new(&[]));
        let dispatcher = BatchDispatcher::new(provider, template());

        let report = dispatcher.run(&[]).await.unwrap();
        assert!(report.is_empty());
        assert!(!report.cancelled());
        assert_eq!(dispatcher.handle().state(), BatchState::Completed);
    }

    #[tokio::test]
    async fn second_run_after_completion_is_allowed() {
        let provider = Arc::new(ScriptedProvider::new(&[]));
        let dispatcher = BatchDispatcher::new(provider, template());

        let rows = vec![row("a", "137")];
        dispatcher.run(&rows).await.unwrap();
        let report = dispatcher.run(&rows).await.unwrap();
        assert_eq!(report.summary().total, 1);
    }

    #[test]
    fn state_round_trips_through_u8() {
        for state in [
            BatchState::Idle,
            BatchState::Running,
            BatchState::Completed,
            BatchState::Cancelled,
        ] {
            assert_eq!(BatchState::from_u8(state as u8), state);
        }
    }
}
