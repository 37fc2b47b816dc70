//! Output formatting: JSON, YAML, table.
//!
//! State documents are plain JSON values, so every format is a view of a
//! `serde_json::Value`. Tables flatten one level: each top-level attribute
//! becomes a row, nested values print as compact JSON.

use std::io::{self, Write};

use owo_colors::OwoColorize;
use serde::Serialize;
use serde_json::Value;
use tabled::{Table, Tabled, settings::Style};

use octodeploy_core::{Diagnostics, Severity};

use crate::cli::OutputFormat;
use crate::error::CliError;

#[derive(Tabled)]
struct AttributeRow {
    #[tabled(rename = "Attribute")]
    attribute: String,
    #[tabled(rename = "Value")]
    value: String,
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render any serializable document in the chosen format.
pub fn render<T: Serialize + ?Sized>(format: OutputFormat, data: &T) -> Result<String, CliError> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(data)?,
        OutputFormat::JsonCompact => serde_json::to_string(data)?,
        OutputFormat::Yaml => serde_yaml::to_string(data)?,
        OutputFormat::Table => render_table(&serde_json::to_value(data)?),
    })
}

/// Render rows that carry their own `Tabled` layout; structured formats
/// serialize the rows as-is.
pub fn render_list<R: Serialize + Tabled>(
    format: OutputFormat,
    rows: &[R],
) -> Result<String, CliError> {
    match format {
        OutputFormat::Table => Ok(Table::new(rows).with(Style::rounded()).to_string()),
        other => render(other, rows),
    }
}

pub fn print_output(output: &str) {
    if output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Tables ───────────────────────────────────────────────────────────

fn render_table(value: &Value) -> String {
    let rows: Vec<AttributeRow> = match value {
        Value::Object(map) => map
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| AttributeRow {
                attribute: k.clone(),
                value: cell(v),
            })
            .collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| AttributeRow {
                attribute: i.to_string(),
                value: cell(v),
            })
            .collect(),
        scalar => vec![AttributeRow {
            attribute: "value".into(),
            value: cell(scalar),
        }],
    };
    Table::new(rows).with(Style::rounded()).to_string()
}

fn cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

// ── Diagnostics ──────────────────────────────────────────────────────

/// Print diagnostics to stderr, errors in red and warnings in yellow.
pub fn print_diagnostics(diags: &Diagnostics) {
    let mut stderr = io::stderr().lock();
    for diag in diags.iter() {
        let _ = match diag.severity {
            Severity::Error => writeln!(stderr, "{} {diag}", "error:".red().bold()),
            Severity::Warning => writeln!(stderr, "{} {diag}", "warning:".yellow().bold()),
        };
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn table_skips_nulls_and_compacts_nested_values() {
        let out = render(
            OutputFormat::Table,
            &json!({
                "id": "Environments-1",
                "description": null,
                "sort_order": 3,
                "extension_settings": [{"extension_id": "jira"}]
            }),
        )
        .unwrap();
        assert!(out.contains("Environments-1"));
        assert!(out.contains(r#"[{"extension_id":"jira"}]"#));
        assert!(!out.contains("description"));
    }

    #[test]
    fn compact_json_is_single_line() {
        let out = render(OutputFormat::JsonCompact, &json!({"a": [1, 2]})).unwrap();
        assert_eq!(out, r#"{"a":[1,2]}"#);
    }
}
