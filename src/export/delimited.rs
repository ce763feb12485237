use chrono::NaiveDate;
use csv::{QuoteStyle, Terminator, WriterBuilder};
use serde::Serialize;
use serde_json::{Number, Value};

use crate::error::{ReportError, Result};
use crate::report::{Column, DatasetId};

/// Header labels plus one string cell per column for every row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Records {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Display form of a single value: null is empty, strings are verbatim.
pub fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => number_text(n),
        Some(other) => other.to_string(),
    }
}

fn number_text(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    // f64 Display drops the ".0" that Number's own Display keeps
    match n.as_f64() {
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

/// Stringify rows against a column list.
///
/// Without explicit columns the header is the union of keys in first-seen
/// order; that fallback is meant for ad hoc data, not the named report tables.
pub fn to_records<T: Serialize>(rows: &[T], columns: Option<&[Column]>) -> Result<Records> {
    let values = rows
        .iter()
        .map(serde_json::to_value)
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let (keys, headers): (Vec<String>, Vec<String>) = match columns {
        Some(columns) => columns
            .iter()
            .map(|c| (c.key.to_string(), c.header.to_string()))
            .unzip(),
        None => {
            let keys = observed_keys(&values);
            (keys.clone(), keys)
        }
    };

    let rows = values
        .iter()
        .map(|value| {
            keys.iter()
                .map(|key| cell_text(value.get(key.as_str())))
                .collect()
        })
        .collect();

    Ok(Records { headers, rows })
}

fn observed_keys(values: &[Value]) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    for object in values.iter().filter_map(Value::as_object) {
        for key in object.keys() {
            if !keys.iter().any(|k| k == key) {
                keys.push(key.clone());
            }
        }
    }
    keys
}

/// Serialize rows to delimited text: header first, records joined by `\n`.
///
/// Values containing the delimiter, a quote or a newline are quoted with
/// embedded quotes doubled. No rows means no output at all, not even a header.
pub fn to_delimited<T: Serialize>(
    rows: &[T],
    columns: Option<&[Column]>,
    delimiter: u8,
) -> Result<String> {
    if rows.is_empty() {
        return Ok(String::new());
    }
    let records = to_records(rows, columns)?;

    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(&records.headers)?;
    for row in &records.rows {
        writer.write_record(row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ReportError::Io(e.into_error()))?;
    let mut text = String::from_utf8(bytes).map_err(|e| {
        ReportError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    })?;

    // The writer terminates every record; the document has no trailing newline.
    if text.ends_with('\n') {
        text.pop();
    }
    Ok(text)
}

/// `<dataset>_<YYYY-MM-DD>.<ext>`
pub fn export_file_name(dataset: DatasetId, date: NaiveDate, extension: &str) -> String {
    format!("{}_{}.{}", dataset, date.format("%Y-%m-%d"), extension)
}
