use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;

use super::filter::{AgingFilters, ComplianceFilters, FilterCriteria, SlaFilters, TrendFilters};
use super::DatasetId;
use crate::source::{RawAgingRecord, RawComplianceRecord, RawSlaRecord, RawTrendPoint};

const SECONDS_PER_DAY: i64 = 86_400;

/// One exported column: the serialized field name and its header label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub key: &'static str,
    pub header: &'static str,
}

impl Column {
    pub const fn new(key: &'static str, header: &'static str) -> Self {
        Self { key, header }
    }
}

/// A normalized row of one of the named report tables.
pub trait ReportRow: Clone + Serialize + Send {
    type Filters: FilterCriteria<Self>;

    const DATASET: DatasetId;

    /// Column order shared by the delimited and printed exports.
    fn columns() -> &'static [Column];
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgingRow {
    pub vendor_name: String,
    pub outstanding_amount: f64,
    pub avg_pending_days: f64,
    pub oldest_invoice_date: Option<String>,
    /// Whole days since `oldest_invoice_date`, fixed when the row was normalized.
    pub oldest_invoice_days: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplianceRow {
    pub vendor: String,
    pub total_invoices: u64,
    pub compliant_percentage: f64,
    pub issues_found: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlaBreachRow {
    pub sla_type: String,
    pub breach_count: u64,
    pub avg_delay_days: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendRow {
    pub period: String,
    pub released: f64,
    pub pending: f64,
}

const AGING_COLUMNS: &[Column] = &[
    Column::new("vendor_name", "Vendor Name"),
    Column::new("outstanding_amount", "Outstanding Amount"),
    Column::new("avg_pending_days", "Avg Days Pending"),
    Column::new("oldest_invoice_date", "Oldest Invoice Date"),
    Column::new("oldest_invoice_days", "Oldest Invoice (Days)"),
];

const COMPLIANCE_COLUMNS: &[Column] = &[
    Column::new("vendor", "Vendor"),
    Column::new("total_invoices", "Total Invoices"),
    Column::new("compliant_percentage", "Compliant %"),
    Column::new("issues_found", "Issues Found"),
];

const SLA_COLUMNS: &[Column] = &[
    Column::new("sla_type", "SLA Type"),
    Column::new("breach_count", "Breach Count"),
    Column::new("avg_delay_days", "Avg Delay (Days)"),
];

const TREND_COLUMNS: &[Column] = &[
    Column::new("period", "Period"),
    Column::new("released", "Released"),
    Column::new("pending", "Pending"),
];

impl ReportRow for AgingRow {
    type Filters = AgingFilters;
    const DATASET: DatasetId = DatasetId::Aging;

    fn columns() -> &'static [Column] {
        AGING_COLUMNS
    }
}

impl ReportRow for ComplianceRow {
    type Filters = ComplianceFilters;
    const DATASET: DatasetId = DatasetId::Compliance;

    fn columns() -> &'static [Column] {
        COMPLIANCE_COLUMNS
    }
}

impl ReportRow for SlaBreachRow {
    type Filters = SlaFilters;
    const DATASET: DatasetId = DatasetId::SlaBreaches;

    fn columns() -> &'static [Column] {
        SLA_COLUMNS
    }
}

impl ReportRow for TrendRow {
    type Filters = TrendFilters;
    const DATASET: DatasetId = DatasetId::Trends;

    fn columns() -> &'static [Column] {
        TREND_COLUMNS
    }
}

/// Parse a source date in any of the accepted forms, reading naive values as UTC.
fn parse_source_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Whole days elapsed from `date` to `now`, floored and never negative.
///
/// A missing or unparseable date counts as zero days.
pub fn days_since(date: Option<&str>, now: DateTime<Utc>) -> u64 {
    let Some(parsed) = date.and_then(parse_source_date) else {
        return 0;
    };
    let elapsed = (now - parsed).num_seconds();
    if elapsed <= 0 {
        0
    } else {
        (elapsed / SECONDS_PER_DAY) as u64
    }
}

fn text(value: Option<String>) -> String {
    value.map(|s| s.trim().to_string()).unwrap_or_default()
}

fn amount(value: Option<f64>) -> f64 {
    value.unwrap_or(0.0)
}

fn non_negative(value: Option<f64>) -> f64 {
    value.unwrap_or(0.0).max(0.0)
}

fn count(value: Option<f64>) -> u64 {
    // Saturating float-to-int cast: negatives become 0, fractions truncate.
    value.unwrap_or(0.0) as u64
}

pub fn normalize_aging(raw: RawAgingRecord, now: DateTime<Utc>) -> AgingRow {
    let oldest_invoice_days = days_since(raw.oldest_invoice_date.as_deref(), now);
    AgingRow {
        vendor_name: text(raw.vendor_name),
        outstanding_amount: amount(raw.outstanding_amount),
        avg_pending_days: non_negative(raw.avg_pending_days),
        oldest_invoice_date: raw
            .oldest_invoice_date
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty()),
        oldest_invoice_days,
    }
}

pub fn normalize_compliance(raw: RawComplianceRecord) -> ComplianceRow {
    ComplianceRow {
        vendor: text(raw.vendor),
        total_invoices: count(raw.total_invoices),
        compliant_percentage: non_negative(raw.compliant_percentage),
        issues_found: count(raw.issues_found),
    }
}

pub fn normalize_sla(raw: RawSlaRecord) -> SlaBreachRow {
    SlaBreachRow {
        sla_type: text(raw.sla_type),
        breach_count: count(raw.breach_count),
        avg_delay_days: non_negative(raw.avg_delay_days),
    }
}

pub fn normalize_trend(raw: RawTrendPoint) -> TrendRow {
    TrendRow {
        period: text(raw.period),
        released: amount(raw.released),
        pending: amount(raw.pending),
    }
}
