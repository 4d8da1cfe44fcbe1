//! Validate a roster without sending anything
//!
//! Loads the roster, checks required columns, and dry-builds every
//! request so blank cells surface before a real batch.

use std::path::Path;

use crate::config::Config;
use crate::error::Result;
use crate::request::{build_request, TemplateConfig};
use crate::roster;

pub fn run<P: AsRef<Path>>(roster_path: P) -> Result<()> {
    let config = Config::new();
    let template = TemplateConfig::from_config(&config)?;
    let rows = roster::load_roster(roster_path)?;

    let mut problems = Vec::new();
    let mut ready = 0usize;

    for (index, row) in rows.iter().enumerate() {
        match build_request(index, row, &template) {
            Ok(request) => {
                ready += 1;
                println!(
                    "row {}: ok — {} -> {}",
                    index + 1,
                    row.name,
                    request.recipient
                );
            }
            Err(err) => {
                println!("row {}: {}", index + 1, err);
                problems.push(index);
            }
        }
    }

    println!();
    println!(
        "{} rows: {} ready, {} with problems",
        rows.len(),
        ready,
        problems.len()
    );

    Ok(())
}
