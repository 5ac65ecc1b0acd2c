//! Output → human/json string formatting.
//!
//! Two modes:
//! - **Human** (default): `"value"`, `(integer) 42`, `(nil)`, one match per line
//! - **JSON** (`--json`): `serde_json::to_string_pretty`

use docmeta_core::{DocValue, Error};
use docmeta_engine::FilterResultSet;

use crate::state::Output;

/// Output formatting mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

/// Format a successful output.
pub fn format_output(output: &Output, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => format_json(output),
        OutputMode::Human => format_human(output),
    }
}

/// Format an error.
pub fn format_error(err: &Error, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => serde_json::to_string_pretty(&serde_json::json!({
            "error": err.to_string()
        }))
        .unwrap_or_else(|_| format!("{{\"error\": \"{}\"}}", err)),
        OutputMode::Human => format!("(error) {}", err),
    }
}

fn format_json(output: &Output) -> String {
    let json = match output {
        Output::Value(v) => serde_json::Value::from(v.clone()),
        Output::Bool(b) => serde_json::Value::Bool(*b),
        Output::Mutation { cas, seqno } => serde_json::json!({
            "cas": cas.to_hex(),
            "seqno": seqno,
        }),
        Output::Matches(results) => matches_json(results),
    };
    serde_json::to_string_pretty(&json).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
}

fn matches_json(results: &FilterResultSet) -> serde_json::Value {
    let documents: Vec<serde_json::Value> = results
        .iter()
        .map(|doc| {
            serde_json::json!({
                "id": doc.id,
                "value": serde_json::Value::from(doc.value.clone()),
                "cas": doc.cas.to_hex(),
                "body": serde_json::Value::from(doc.body.clone()),
            })
        })
        .collect();
    serde_json::json!({
        "documents": documents,
        "stats": {
            "listed": results.stats.listed,
            "matched": results.stats.matched,
            "absent": results.stats.absent,
            "rejected": results.stats.rejected,
            "failed": results.stats.failed,
        }
    })
}

fn format_human(output: &Output) -> String {
    match output {
        Output::Value(v) => format_value_human(v),
        Output::Bool(b) => format!("(boolean) {}", b),
        Output::Mutation { cas, seqno } => format!("OK (cas={}, seqno={})", cas.to_hex(), seqno),
        Output::Matches(results) if results.is_empty() => {
            format!("(empty) {} listed", results.stats.listed)
        }
        Output::Matches(results) => {
            let mut lines: Vec<String> = results
                .iter()
                .enumerate()
                .map(|(i, doc)| {
                    format!("{}) {} => {}", i + 1, doc.id, format_value_human(&doc.value))
                })
                .collect();
            lines.push(format!(
                "({} of {} listed matched)",
                results.stats.matched, results.stats.listed
            ));
            lines.join("\n")
        }
    }
}

fn format_value_human(v: &DocValue) -> String {
    match v {
        DocValue::Null => "(nil)".to_string(),
        DocValue::Bool(b) => format!("(boolean) {}", b),
        DocValue::Int(i) => format!("(integer) {}", i),
        DocValue::Float(f) => format!("(float) {}", f),
        DocValue::String(s) => format!("\"{}\"", s),
        DocValue::Array(_) | DocValue::Object(_) => v.to_json_string_pretty(),
    }
}
