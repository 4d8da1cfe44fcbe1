//! Preview the message body for one roster row
//!
//! Renders the human-readable template by placeholder substitution. The
//! rendered text is a preview only; the provider fills its own approved
//! template from the ordered parameters.

use std::path::Path;

use crate::error::{Error, Result};
use crate::request::render_template;
use crate::roster;

/// Default preview text matching the approved recruitment template.
pub const DEFAULT_TEMPLATE_TEXT: &str = "【招生宣传联合会】亲爱的{name}同学：第一轮面试将在{date}的{time}于{place}进行，请提前十分钟到场签到。收到请回复“姓名+是否能参加面试”。";

pub fn run<P: AsRef<Path>>(
    roster_path: P,
    row_index: usize,
    template_text: Option<&str>,
) -> Result<()> {
    let rows = roster::load_roster(roster_path)?;
    let row = rows.get(row_index).ok_or_else(|| {
        Error::InvalidArgument(format!(
            "row {} out of range (roster has {} rows)",
            row_index,
            rows.len()
        ))
    })?;

    let text = template_text.unwrap_or(DEFAULT_TEMPLATE_TEXT);
    println!("{}", render_template(text, row));
    Ok(())
}
