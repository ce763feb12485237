mod dashboard;
mod filter;
mod pagination;
mod rows;
mod summary;
mod view;

pub use dashboard::{Dashboard, DatasetView, PeriodTicket};
pub use filter::{
    apply_filters, AgingFilters, Bucket, ComplianceFilters, DelayTier, FilterCriteria,
    IssueTier, PendingStatus, RateTier, SeverityTier, SlaFilters, SlotKind, SlotSpec, Thresholds,
    TrendFilters,
};
pub use pagination::{total_pages, Pagination, PaginationInfo};
pub use rows::{
    days_since, normalize_aging, normalize_compliance, normalize_sla, normalize_trend, AgingRow,
    Column, ComplianceRow, ReportRow, SlaBreachRow, TrendRow,
};
pub use summary::{total_outstanding, SummaryMetrics};
pub use view::{FetchTicket, ReportView};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ReportError;

/// One of the independent report tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasetId {
    Aging,
    Compliance,
    SlaBreaches,
    Trends,
}

impl DatasetId {
    pub const ALL: [DatasetId; 4] = [
        DatasetId::Aging,
        DatasetId::Compliance,
        DatasetId::SlaBreaches,
        DatasetId::Trends,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetId::Aging => "aging",
            DatasetId::Compliance => "compliance",
            DatasetId::SlaBreaches => "sla",
            DatasetId::Trends => "trends",
        }
    }

    /// Human title used on printed reports
    pub fn title(&self) -> &'static str {
        match self {
            DatasetId::Aging => "Payment Aging",
            DatasetId::Compliance => "Invoice / PO Compliance",
            DatasetId::SlaBreaches => "SLA Breaches",
            DatasetId::Trends => "Payment Trends",
        }
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetId {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aging" => Ok(DatasetId::Aging),
            "compliance" => Ok(DatasetId::Compliance),
            "sla" | "sla-breaches" | "sla_breaches" => Ok(DatasetId::SlaBreaches),
            "trends" => Ok(DatasetId::Trends),
            _ => Err(ReportError::UnknownDataset(s.to_string())),
        }
    }
}

/// Period selector for the summary and trend fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeRange {
    Week,
    #[default]
    Month,
    Quarter,
    Year,
}

impl TimeRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::Week => "week",
            TimeRange::Month => "month",
            TimeRange::Quarter => "quarter",
            TimeRange::Year => "year",
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeRange {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "week" => Ok(TimeRange::Week),
            "month" => Ok(TimeRange::Month),
            "quarter" => Ok(TimeRange::Quarter),
            "year" => Ok(TimeRange::Year),
            _ => Err(ReportError::InvalidRange(s.to_string())),
        }
    }
}
