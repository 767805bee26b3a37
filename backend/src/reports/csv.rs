//! Comma-joined, quote-wrapped CSV for report downloads.

use anyhow::Context;
use ::csv::{QuoteStyle, WriterBuilder};
use serde::Serialize;
use serde_json::Value;

/// Serialize `rows` with a header line taken from the first row's field
/// names. Every value is wrapped in double quotes (embedded quotes doubled,
/// nulls empty). Rows must serialize to JSON objects.
pub fn to_csv<T: Serialize>(rows: &[T]) -> anyhow::Result<String> {
    let values = rows
        .iter()
        .map(serde_json::to_value)
        .collect::<serde_json::Result<Vec<_>>>()
        .context("Failed to serialize report rows")?;

    let Some(Value::Object(first)) = values.first() else {
        return Ok(String::new());
    };
    let headers: Vec<&String> = first.keys().collect();

    let mut header = WriterBuilder::new().from_writer(Vec::new());
    header.write_record(headers.iter().map(|h| h.as_str()))?;

    let mut body = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_writer(Vec::new());
    for value in &values {
        body.write_record(headers.iter().map(|h| field(value.get(h.as_str()))))?;
    }

    let mut out = String::from_utf8(header.into_inner().map_err(|e| e.into_error())?)?;
    out.push_str(&String::from_utf8(body.into_inner().map_err(|e| e.into_error())?)?);
    out.truncate(out.trim_end_matches('\n').len());
    Ok(out)
}

fn field(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
