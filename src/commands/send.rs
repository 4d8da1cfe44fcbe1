//! Run a full SMS batch from a roster file

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;
use crate::dispatch::BatchDispatcher;
use crate::error::Result;
use crate::providers::TencentSmsClient;
use crate::report::{BatchReport, OutcomeStatus};
use crate::request::TemplateConfig;
use crate::roster;

#[derive(Debug)]
pub struct SendArgs {
    pub roster: PathBuf,
    pub export: Option<PathBuf>,
    pub yes: bool,
}

/// CLI entry point
pub async fn run(args: SendArgs) -> Result<()> {
    let config = Config::new();
    let template = TemplateConfig::from_config(&config)?;
    let rows = roster::load_roster(&args.roster)?;

    if rows.is_empty() {
        println!("Roster is empty, nothing to send");
        return Ok(());
    }

    if !args.yes && !confirm(&rows)? {
        println!("Aborted");
        return Ok(());
    }

    let client = Arc::new(TencentSmsClient::new(&config)?);
    let dispatcher = BatchDispatcher::new(client, template);

    // Ctrl-C requests cooperative cancellation; the in-flight row finishes
    let cancel_handle = dispatcher.handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\nCancellation requested, finishing current message...");
            cancel_handle.cancel();
        }
    });

    let total = rows.len();
    let mut stream = dispatcher.subscribe();
    let printer = tokio::spawn(async move {
        let mut done = 0usize;
        while let Some(outcome) = stream.recv().await {
            done += 1;
            let mark = match outcome.status {
                OutcomeStatus::Success => "✓",
                OutcomeStatus::Failure => "✗",
            };
            println!(
                "[{}/{}] {} {} {} — {}",
                done, total, mark, outcome.name, outcome.recipient, outcome.detail
            );
        }
    });

    let report = dispatcher.run(&rows).await?;
    drop(dispatcher); // closes the outcome stream
    let _ = printer.await;

    print_summary(&report);

    if let Some(path) = args.export {
        std::fs::write(&path, report.to_csv()?)?;
        println!("Report exported to {}", path.display());
    }

    Ok(())
}

fn confirm(rows: &[roster::RecipientRow]) -> Result<bool> {
    let first = &rows[0];
    println!("Roster: {} recipients", rows.len());
    println!(
        "First row: {} / {} / {} {} / {}",
        first.name, first.phone, first.date, first.time, first.place
    );
    print!("Send {} messages? [y/N] ", rows.len());
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

fn print_summary(report: &BatchReport) {
    let summary = report.summary();
    println!();
    if report.cancelled() {
        println!("Batch cancelled after {} rows", summary.total);
    }
    println!(
        "Done: {} total, {} sent, {} failed",
        summary.total, summary.success_count, summary.failure_count
    );

    if summary.failure_count > 0 {
        println!("\nFailed recipients (re-run with a trimmed roster to retry):");
        for outcome in report.failed_outcomes() {
            println!(
                "  row {}: {} {} — {}",
                outcome.row_index + 1,
                outcome.name,
                outcome.recipient,
                outcome.detail
            );
        }
    }
}
