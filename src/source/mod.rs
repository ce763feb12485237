//! Raw payloads from the external data source and the trait that supplies them.
//!
//! Every payload field is optional and numbers decode leniently, so a single
//! malformed record degrades to defaults during normalization instead of
//! failing the whole batch.

mod fixtures;
mod http;

pub use fixtures::FixtureSource;
pub use http::HttpSource;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::config::{resolve_path, Config, SourceKind};
use crate::error::{ReportError, Result};
use crate::report::TimeRange;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawAgingRecord {
    #[serde(deserialize_with = "lenient_string")]
    pub vendor_name: Option<String>,
    #[serde(deserialize_with = "lenient_number")]
    pub outstanding_amount: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub avg_pending_days: Option<f64>,
    #[serde(deserialize_with = "lenient_string")]
    pub oldest_invoice_date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawComplianceRecord {
    #[serde(deserialize_with = "lenient_string")]
    pub vendor: Option<String>,
    #[serde(deserialize_with = "lenient_number")]
    pub total_invoices: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub compliant_percentage: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub issues_found: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawCompliance {
    #[serde(deserialize_with = "lenient_records")]
    pub vendors: Vec<RawComplianceRecord>,
    #[serde(deserialize_with = "lenient_number")]
    pub overall_compliance_rate: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawSlaRecord {
    #[serde(deserialize_with = "lenient_string")]
    pub sla_type: Option<String>,
    #[serde(deserialize_with = "lenient_number")]
    pub breach_count: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub avg_delay_days: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawSlaBreaches {
    #[serde(deserialize_with = "lenient_records")]
    pub items: Vec<RawSlaRecord>,
    #[serde(deserialize_with = "lenient_number")]
    pub total_breaches: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub avg_delay_across_all: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawSummary {
    #[serde(deserialize_with = "lenient_number")]
    pub released: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub pending: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawTrendPoint {
    #[serde(deserialize_with = "lenient_string")]
    pub period: Option<String>,
    #[serde(deserialize_with = "lenient_number")]
    pub released: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub pending: Option<f64>,
}

/// The external collaborator that supplies raw rows and summary numbers.
///
/// Implementations are called from several threads at once during a
/// dashboard refresh, one call per dataset.
pub trait DataSource: Sync {
    fn fetch_aging(&self) -> Result<Vec<RawAgingRecord>>;
    fn fetch_compliance(&self) -> Result<RawCompliance>;
    fn fetch_sla_breaches(&self) -> Result<RawSlaBreaches>;
    fn fetch_summary(&self, range: TimeRange) -> Result<RawSummary>;
    fn fetch_trends(&self, range: TimeRange) -> Result<Vec<RawTrendPoint>>;
}

/// Build the data source described by `[source]`.
pub fn from_config(config: &Config, cfg_dir: &Path) -> Result<Box<dyn DataSource>> {
    match config.source.kind {
        SourceKind::Http => {
            let base_url = config.source.base_url.clone().ok_or_else(|| {
                ReportError::InvalidSetting {
                    key: "source.base_url".to_string(),
                    reason: "required when source.kind = \"http\"".to_string(),
                }
            })?;
            Ok(Box::new(HttpSource::new(
                base_url,
                config.source.token.clone(),
                config.source.timeout_secs,
            )))
        }
        SourceKind::Fixtures => {
            let dir = config.source.fixtures_dir.as_deref().ok_or_else(|| {
                ReportError::InvalidSetting {
                    key: "source.fixtures_dir".to_string(),
                    reason: "required when source.kind = \"fixtures\"".to_string(),
                }
            })?;
            Ok(Box::new(FixtureSource::new(resolve_path(dir, cfg_dir))))
        }
    }
}

/// Decode a payload body, tagging failures with the dataset they came from.
pub(crate) fn decode<T: for<'de> Deserialize<'de>>(dataset: &str, body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| ReportError::MalformedPayload {
        dataset: dataset.to_string(),
        reason: e.to_string(),
    })
}

/// Decode a top-level array of records.
///
/// Elements that are not objects become default records, so one bad entry
/// never costs the rest of the batch.
pub(crate) fn decode_records<T: DeserializeOwned + Default>(
    dataset: &str,
    body: &str,
) -> Result<Vec<T>> {
    match decode::<Value>(dataset, body)? {
        Value::Array(items) => Ok(lenient_elements(items)),
        other => Err(ReportError::MalformedPayload {
            dataset: dataset.to_string(),
            reason: format!("expected an array of records, found {}", json_kind(&other)),
        }),
    }
}

fn lenient_elements<T: DeserializeOwned + Default>(items: Vec<Value>) -> Vec<T> {
    items
        .into_iter()
        .map(|item| serde_json::from_value(item).unwrap_or_default())
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Nested record arrays: null or a non-array is empty, bad elements default.
fn lenient_records<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => lenient_elements(items),
        _ => Vec::new(),
    })
}

/// Accept a JSON number or a numeric string; anything else is treated as absent.
fn lenient_number<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite()))
}

/// Accept a string, or stringify a scalar; null and containers are absent.
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aging_record_tolerates_bad_fields() {
        let body = r#"[
            {"vendorName": "Acme", "outstandingAmount": "1,250.50", "avgPendingDays": 12},
            {"vendorName": null, "outstandingAmount": {"x": 1}, "oldestInvoiceDate": 42},
            {}
        ]"#;
        let records: Vec<RawAgingRecord> = decode_records("aging", body).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].outstanding_amount, Some(1250.5));
        assert_eq!(records[0].oldest_invoice_date, None);
        assert_eq!(records[1].vendor_name, None);
        assert_eq!(records[1].outstanding_amount, None);
        assert_eq!(records[1].oldest_invoice_date.as_deref(), Some("42"));
        assert!(records[2].vendor_name.is_none());
    }

    #[test]
    fn test_compliance_missing_summary_field() {
        let body = r#"{"vendors": [{"vendor": "Acme", "totalInvoices": 10}]}"#;
        let payload: RawCompliance = decode("compliance", body).unwrap();
        assert_eq!(payload.vendors.len(), 1);
        assert_eq!(payload.overall_compliance_rate, None);
    }

    #[test]
    fn test_bad_array_elements_keep_the_rest() {
        let body = r#"[{"vendorName": "Acme", "outstandingAmount": 500}, null, "garbage", 7]"#;
        let records: Vec<RawAgingRecord> = decode_records("aging", body).unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(records[0].vendor_name.as_deref(), Some("Acme"));
        assert_eq!(records[0].outstanding_amount, Some(500.0));
        assert!(records[1..].iter().all(|r| r.vendor_name.is_none()));

        let points: Vec<RawTrendPoint> =
            decode_records("trends", r#"[null, {"period": "2026-10", "released": 3}]"#).unwrap();
        assert_eq!(points[1].period.as_deref(), Some("2026-10"));
    }

    #[test]
    fn test_nested_record_arrays_are_lenient() {
        let body = r#"{"vendors": [null, {"vendor": "Acme"}, []], "overallComplianceRate": 80}"#;
        let payload: RawCompliance = decode("compliance", body).unwrap();
        assert_eq!(payload.vendors.len(), 3);
        assert_eq!(payload.vendors[1].vendor.as_deref(), Some("Acme"));
        assert_eq!(payload.overall_compliance_rate, Some(80.0));

        let body = r#"{"items": null, "totalBreaches": 4}"#;
        let payload: RawSlaBreaches = decode("sla", body).unwrap();
        assert!(payload.items.is_empty());
        assert_eq!(payload.total_breaches, Some(4.0));
    }

    #[test]
    fn test_non_array_record_list_is_malformed() {
        let err = decode_records::<RawAgingRecord>("aging", r#"{"rows": []}"#).unwrap_err();
        match err {
            ReportError::MalformedPayload { dataset, reason } => {
                assert_eq!(dataset, "aging");
                assert!(reason.contains("an object"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_non_json_is_malformed() {
        let err = decode::<RawSummary>("summary", "<html>").unwrap_err();
        assert!(matches!(err, ReportError::MalformedPayload { .. }));
    }
}
