//! Request builder
//!
//! Maps one roster row plus the template configuration into an outbound
//! message request. Owns phone normalization and the ordered assembly of
//! template parameters. The parameter order is a configuration contract
//! with the approved remote template, never inferred from the data.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::roster::{RecipientRow, REQUIRED_COLUMNS};

/// Template configuration shared by every request in a batch.
#[derive(Debug, Clone)]
pub struct TemplateConfig {
    pub template_id: String,
    pub param_order: Vec<String>,
    pub default_country_prefix: String,
}

impl TemplateConfig {
    /// Build from loaded configuration, rejecting unknown parameter names.
    pub fn from_config(config: &Config) -> Result<Self> {
        for param in &config.param_order {
            if !REQUIRED_COLUMNS.contains(&param.as_str()) {
                return Err(Error::Config(format!(
                    "unknown template parameter '{}' (expected one of: {})",
                    param,
                    REQUIRED_COLUMNS.join(", ")
                )));
            }
        }
        Ok(TemplateConfig {
            template_id: config.template_id.clone(),
            param_order: config.param_order.clone(),
            default_country_prefix: config.default_country_prefix.clone(),
        })
    }
}

/// One outbound message, immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRequest {
    pub recipient: String,
    pub template_id: String,
    pub template_params: Vec<String>,
}

/// Normalize a raw phone number to E.164-ish form.
///
/// Numbers without a leading `+` get the configured default country
/// prefix. Already-prefixed numbers pass through unchanged, which makes
/// the operation idempotent.
pub fn normalize_phone(raw: &str, default_prefix: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('+') {
        trimmed.to_string()
    } else {
        format!("{}{}", default_prefix, trimmed)
    }
}

/// Build the message request for one row.
///
/// Re-checks field presence even though the loader validated columns: a
/// column can exist with a blank cell.
pub fn build_request(
    row_index: usize,
    row: &RecipientRow,
    template: &TemplateConfig,
) -> Result<MessageRequest> {
    let blank = row.blank_fields();
    if !blank.is_empty() {
        return Err(Error::Validation(format!(
            "row {}: empty required field(s): {}",
            row_index + 1,
            blank.join(", ")
        )));
    }

    let template_params = template
        .param_order
        .iter()
        .map(|name| {
            row.field(name)
                .map(|v| v.trim().to_string())
                .ok_or_else(|| {
                    Error::Validation(format!("row {}: unknown field '{}'", row_index + 1, name))
                })
        })
        .collect::<Result<Vec<String>>>()?;

    Ok(MessageRequest {
        recipient: normalize_phone(&row.phone, &template.default_country_prefix),
        template_id: template.template_id.clone(),
        template_params,
    })
}

/// Render a human-readable preview of the message for one row by simple
/// placeholder substitution ({name}, {date}, {time}, {place}).
pub fn render_template(template_text: &str, row: &RecipientRow) -> String {
    let mut rendered = template_text.to_string();
    for name in REQUIRED_COLUMNS {
        let placeholder = format!("{{{}}}", name);
        if let Some(value) = row.field(name) {
            rendered = rendered.replace(&placeholder, value);
        }
    }
    rendered
}
