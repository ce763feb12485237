//! Per-dataset filter criteria and the predicate engine.
//!
//! Every bucket slot splits a numeric field into three tiers over two
//! thresholds: top `> upper`, middle `(lower, upper]`, bottom `<= lower`.

use std::fmt;

use super::rows::{AgingRow, ComplianceRow, SlaBreachRow, TrendRow};
use crate::error::{ReportError, Result};

/// Boundaries of a three-tier bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub upper: f64,
    pub lower: f64,
}

impl Thresholds {
    /// Tier index, 0 = top. NaN lands in the bottom tier.
    fn tier(&self, value: f64) -> usize {
        if value > self.upper {
            0
        } else if value > self.lower {
            1
        } else {
            2
        }
    }
}

/// A named severity/status partition of one numeric field.
pub trait Bucket: Copy + PartialEq + fmt::Debug + 'static {
    /// Tiers ordered top, middle, bottom.
    const TIERS: [Self; 3];
    const NAMES: [&'static str; 3];
    const THRESHOLDS: Thresholds;

    fn classify(value: f64) -> Self {
        Self::TIERS[Self::THRESHOLDS.tier(value)]
    }

    fn name(self) -> &'static str {
        let idx = Self::TIERS.iter().position(|t| *t == self).unwrap_or(2);
        Self::NAMES[idx]
    }
}

const PENDING_NAMES: [&str; 3] = ["overdue", "warning", "good"];
const RATE_NAMES: [&str; 3] = ["excellent", "fair", "poor"];
const ISSUE_NAMES: [&str; 3] = ["many", "some", "none"];
const SEVERITY_NAMES: [&str; 3] = ["critical", "moderate", "minor"];
const DELAY_NAMES: [&str; 3] = ["severe", "moderate", "minor"];

/// Days-pending status, used for both average and oldest-invoice age.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingStatus {
    Overdue,
    Warning,
    Good,
}

impl Bucket for PendingStatus {
    const TIERS: [Self; 3] = [Self::Overdue, Self::Warning, Self::Good];
    const NAMES: [&'static str; 3] = PENDING_NAMES;
    const THRESHOLDS: Thresholds = Thresholds {
        upper: 30.0,
        lower: 15.0,
    };
}

/// Compliance percentage tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateTier {
    Excellent,
    Fair,
    Poor,
}

impl Bucket for RateTier {
    const TIERS: [Self; 3] = [Self::Excellent, Self::Fair, Self::Poor];
    const NAMES: [&'static str; 3] = RATE_NAMES;
    const THRESHOLDS: Thresholds = Thresholds {
        upper: 90.0,
        lower: 70.0,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueTier {
    Many,
    Few,
    Clean,
}

impl Bucket for IssueTier {
    const TIERS: [Self; 3] = [Self::Many, Self::Few, Self::Clean];
    const NAMES: [&'static str; 3] = ISSUE_NAMES;
    const THRESHOLDS: Thresholds = Thresholds {
        upper: 5.0,
        lower: 0.0,
    };
}

/// Breach-count severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeverityTier {
    Critical,
    Moderate,
    Minor,
}

impl Bucket for SeverityTier {
    const TIERS: [Self; 3] = [Self::Critical, Self::Moderate, Self::Minor];
    const NAMES: [&'static str; 3] = SEVERITY_NAMES;
    const THRESHOLDS: Thresholds = Thresholds {
        upper: 10.0,
        lower: 5.0,
    };
}

/// Average-delay severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayTier {
    Severe,
    Moderate,
    Minor,
}

impl Bucket for DelayTier {
    const TIERS: [Self; 3] = [Self::Severe, Self::Moderate, Self::Minor];
    const NAMES: [&'static str; 3] = DELAY_NAMES;
    const THRESHOLDS: Thresholds = Thresholds {
        upper: 7.0,
        lower: 3.0,
    };
}

/// Kind of a filter slot, for listing and validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// Case-insensitive substring match
    Text,
    /// One of the listed tiers, or `all`
    Bucket(&'static [&'static str; 3]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotSpec {
    pub name: &'static str,
    pub field: &'static str,
    pub kind: SlotKind,
}

/// The filter state of one dataset. `Default` is neutral on every slot.
pub trait FilterCriteria<R>: Default + Clone + PartialEq + fmt::Debug + Send {
    fn slots() -> &'static [SlotSpec];

    /// Set one slot. Unknown slots and invalid bucket names leave `self` unchanged.
    fn set(&mut self, slot: &str, value: &str) -> Result<()>;

    fn matches(&self, row: &R) -> bool;

    fn is_neutral(&self) -> bool {
        *self == Self::default()
    }
}

/// Rows satisfying every active slot, in their original order.
pub fn apply_filters<R: Clone, F: FilterCriteria<R>>(rows: &[R], criteria: &F) -> Vec<R> {
    if criteria.is_neutral() {
        return rows.to_vec();
    }
    rows.iter().filter(|r| criteria.matches(r)).cloned().collect()
}

fn text_matches(field: &str, needle: &str) -> bool {
    needle.is_empty() || field.to_lowercase().contains(&needle.to_lowercase())
}

fn bucket_matches<B: Bucket>(selected: Option<B>, value: f64) -> bool {
    selected.map_or(true, |b| B::classify(value) == b)
}

/// Kept verbatim: only the empty string is neutral, whitespace is part of the needle.
fn parse_text(value: &str) -> String {
    value.to_string()
}

/// `all` (or empty) is the neutral value and maps to `None`.
fn parse_bucket<B: Bucket>(slot: &str, value: &str) -> Result<Option<B>> {
    let wanted = value.trim().to_ascii_lowercase();
    if wanted.is_empty() || wanted == "all" {
        return Ok(None);
    }
    B::NAMES
        .iter()
        .position(|name| *name == wanted)
        .map(|idx| Some(B::TIERS[idx]))
        .ok_or_else(|| ReportError::InvalidFilterValue {
            slot: slot.to_string(),
            value: value.to_string(),
            expected: format!("all, {}", B::NAMES.join(", ")),
        })
}

fn unknown_slot(dataset: &str, slot: &str) -> ReportError {
    ReportError::UnknownFilterSlot {
        dataset: dataset.to_string(),
        slot: slot.to_string(),
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgingFilters {
    pub vendor: String,
    pub status: Option<PendingStatus>,
    pub age: Option<PendingStatus>,
}

const AGING_SLOTS: &[SlotSpec] = &[
    SlotSpec {
        name: "vendor",
        field: "vendor_name",
        kind: SlotKind::Text,
    },
    SlotSpec {
        name: "status",
        field: "avg_pending_days",
        kind: SlotKind::Bucket(&PENDING_NAMES),
    },
    SlotSpec {
        name: "age",
        field: "oldest_invoice_days",
        kind: SlotKind::Bucket(&PENDING_NAMES),
    },
];

impl FilterCriteria<AgingRow> for AgingFilters {
    fn slots() -> &'static [SlotSpec] {
        AGING_SLOTS
    }

    fn set(&mut self, slot: &str, value: &str) -> Result<()> {
        match slot {
            "vendor" => self.vendor = parse_text(value),
            "status" => self.status = parse_bucket(slot, value)?,
            "age" => self.age = parse_bucket(slot, value)?,
            _ => return Err(unknown_slot("aging", slot)),
        }
        Ok(())
    }

    fn matches(&self, row: &AgingRow) -> bool {
        text_matches(&row.vendor_name, &self.vendor)
            && bucket_matches(self.status, row.avg_pending_days)
            && bucket_matches(self.age, row.oldest_invoice_days as f64)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComplianceFilters {
    pub vendor: String,
    pub rate: Option<RateTier>,
    pub issues: Option<IssueTier>,
}

const COMPLIANCE_SLOTS: &[SlotSpec] = &[
    SlotSpec {
        name: "vendor",
        field: "vendor",
        kind: SlotKind::Text,
    },
    SlotSpec {
        name: "rate",
        field: "compliant_percentage",
        kind: SlotKind::Bucket(&RATE_NAMES),
    },
    SlotSpec {
        name: "issues",
        field: "issues_found",
        kind: SlotKind::Bucket(&ISSUE_NAMES),
    },
];

impl FilterCriteria<ComplianceRow> for ComplianceFilters {
    fn slots() -> &'static [SlotSpec] {
        COMPLIANCE_SLOTS
    }

    fn set(&mut self, slot: &str, value: &str) -> Result<()> {
        match slot {
            "vendor" => self.vendor = parse_text(value),
            "rate" => self.rate = parse_bucket(slot, value)?,
            "issues" => self.issues = parse_bucket(slot, value)?,
            _ => return Err(unknown_slot("compliance", slot)),
        }
        Ok(())
    }

    fn matches(&self, row: &ComplianceRow) -> bool {
        text_matches(&row.vendor, &self.vendor)
            && bucket_matches(self.rate, row.compliant_percentage)
            && bucket_matches(self.issues, row.issues_found as f64)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlaFilters {
    pub sla_type: String,
    pub breaches: Option<SeverityTier>,
    pub delay: Option<DelayTier>,
}

const SLA_SLOTS: &[SlotSpec] = &[
    SlotSpec {
        name: "type",
        field: "sla_type",
        kind: SlotKind::Text,
    },
    SlotSpec {
        name: "breaches",
        field: "breach_count",
        kind: SlotKind::Bucket(&SEVERITY_NAMES),
    },
    SlotSpec {
        name: "delay",
        field: "avg_delay_days",
        kind: SlotKind::Bucket(&DELAY_NAMES),
    },
];

impl FilterCriteria<SlaBreachRow> for SlaFilters {
    fn slots() -> &'static [SlotSpec] {
        SLA_SLOTS
    }

    fn set(&mut self, slot: &str, value: &str) -> Result<()> {
        match slot {
            "type" => self.sla_type = parse_text(value),
            "breaches" => self.breaches = parse_bucket(slot, value)?,
            "delay" => self.delay = parse_bucket(slot, value)?,
            _ => return Err(unknown_slot("sla", slot)),
        }
        Ok(())
    }

    fn matches(&self, row: &SlaBreachRow) -> bool {
        text_matches(&row.sla_type, &self.sla_type)
            && bucket_matches(self.breaches, row.breach_count as f64)
            && bucket_matches(self.delay, row.avg_delay_days)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrendFilters {
    pub period: String,
}

const TREND_SLOTS: &[SlotSpec] = &[SlotSpec {
    name: "period",
    field: "period",
    kind: SlotKind::Text,
}];

impl FilterCriteria<TrendRow> for TrendFilters {
    fn slots() -> &'static [SlotSpec] {
        TREND_SLOTS
    }

    fn set(&mut self, slot: &str, value: &str) -> Result<()> {
        match slot {
            "period" => self.period = parse_text(value),
            _ => return Err(unknown_slot("trends", slot)),
        }
        Ok(())
    }

    fn matches(&self, row: &TrendRow) -> bool {
        text_matches(&row.period, &self.period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aging(vendor: &str, avg: f64, oldest_days: u64) -> AgingRow {
        AgingRow {
            vendor_name: vendor.to_string(),
            outstanding_amount: 100.0,
            avg_pending_days: avg,
            oldest_invoice_date: None,
            oldest_invoice_days: oldest_days,
        }
    }

    fn sla(sla_type: &str, breaches: u64, delay: f64) -> SlaBreachRow {
        SlaBreachRow {
            sla_type: sla_type.to_string(),
            breach_count: breaches,
            avg_delay_days: delay,
        }
    }

    fn sample_aging() -> Vec<AgingRow> {
        vec![
            aging("Acme Supplies", 45.0, 80),
            aging("Globex", 30.0, 31),
            aging("Initech", 15.0, 0),
            aging("acme logistics", 16.0, 10),
        ]
    }

    #[test]
    fn test_neutral_criteria_is_identity() {
        let rows = sample_aging();
        assert_eq!(apply_filters(&rows, &AgingFilters::default()), rows);

        // Explicitly setting every slot to its neutral value is still the identity
        let mut criteria = AgingFilters::default();
        criteria.set("vendor", "").unwrap();
        criteria.set("status", "all").unwrap();
        criteria.set("age", "ALL").unwrap();
        assert!(criteria.is_neutral());
        assert_eq!(apply_filters(&rows, &criteria), rows);
    }

    #[test]
    fn test_pending_status_boundaries() {
        assert_eq!(PendingStatus::classify(30.0), PendingStatus::Warning);
        assert_eq!(PendingStatus::classify(30.01), PendingStatus::Overdue);
        assert_eq!(PendingStatus::classify(15.0), PendingStatus::Good);
        assert_eq!(PendingStatus::classify(15.5), PendingStatus::Warning);
        assert_eq!(PendingStatus::classify(0.0), PendingStatus::Good);
        assert_eq!(PendingStatus::classify(f64::NAN), PendingStatus::Good);
    }

    fn assert_partition<B: Bucket>() {
        let mut value = -5.0;
        while value <= 120.0 {
            let hits = B::TIERS
                .iter()
                .filter(|tier| bucket_matches(Some(**tier), value))
                .count();
            assert_eq!(
                hits,
                1,
                "{} value {value} matched {hits} buckets",
                std::any::type_name::<B>()
            );
            value += 0.25;
        }
        let nan_hits = B::TIERS
            .iter()
            .filter(|tier| bucket_matches(Some(**tier), f64::NAN))
            .count();
        assert_eq!(nan_hits, 1);
    }

    #[test]
    fn test_every_value_in_exactly_one_bucket() {
        assert_partition::<PendingStatus>();
        assert_partition::<RateTier>();
        assert_partition::<IssueTier>();
        assert_partition::<SeverityTier>();
        assert_partition::<DelayTier>();
    }

    #[test]
    fn test_status_slot_partitions_rows() {
        let mut value = -5.0;
        while value <= 120.0 {
            let hits = PendingStatus::TIERS
                .iter()
                .filter(|tier| {
                    let mut criteria = AgingFilters::default();
                    criteria.set("status", tier.name()).unwrap();
                    criteria.matches(&aging("x", value, 0))
                })
                .count();
            assert_eq!(hits, 1, "value {value} matched {hits} buckets");
            value += 0.25;
        }
    }

    #[test]
    fn test_sla_tier_boundaries() {
        assert_eq!(SeverityTier::classify(10.0), SeverityTier::Moderate);
        assert_eq!(SeverityTier::classify(11.0), SeverityTier::Critical);
        assert_eq!(SeverityTier::classify(5.0), SeverityTier::Minor);
        assert_eq!(SeverityTier::classify(6.0), SeverityTier::Moderate);
        assert_eq!(DelayTier::classify(7.0), DelayTier::Moderate);
        assert_eq!(DelayTier::classify(7.5), DelayTier::Severe);
        assert_eq!(DelayTier::classify(3.0), DelayTier::Minor);
        assert_eq!(DelayTier::classify(3.5), DelayTier::Moderate);
        assert_eq!(DelayTier::classify(f64::NAN), DelayTier::Minor);
    }

    #[test]
    fn test_text_slot_is_case_insensitive_substring() {
        let mut criteria = AgingFilters::default();
        criteria.set("vendor", "ACME").unwrap();
        let names: Vec<_> = apply_filters(&sample_aging(), &criteria)
            .into_iter()
            .map(|r| r.vendor_name)
            .collect();
        assert_eq!(names, vec!["Acme Supplies", "acme logistics"]);
    }

    #[test]
    fn test_text_slot_keeps_whitespace() {
        let mut criteria = AgingFilters::default();
        criteria.set("vendor", "acme ").unwrap();
        assert!(!criteria.is_neutral());
        let names: Vec<_> = apply_filters(&sample_aging(), &criteria)
            .into_iter()
            .map(|r| r.vendor_name)
            .collect();
        assert_eq!(names, vec!["Acme Supplies", "acme logistics"]);

        criteria.set("vendor", " acme").unwrap();
        assert!(apply_filters(&sample_aging(), &criteria).is_empty());

        criteria.set("vendor", "").unwrap();
        assert!(criteria.is_neutral());
    }

    #[test]
    fn test_slots_compose_with_and() {
        let mut criteria = AgingFilters::default();
        criteria.set("vendor", "acme").unwrap();
        criteria.set("status", "warning").unwrap();
        let rows = apply_filters(&sample_aging(), &criteria);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].vendor_name, "acme logistics");
    }

    #[test]
    fn test_missing_date_is_never_overdue_by_age() {
        let mut criteria = AgingFilters::default();
        criteria.set("age", "overdue").unwrap();
        let row = aging("No Date Co", 5.0, 0);
        assert!(!criteria.matches(&row));
        criteria.set("age", "good").unwrap();
        assert!(criteria.matches(&row));
    }

    #[test]
    fn test_sla_breach_and_delay_compose() {
        let rows = vec![
            sla("Invoice Approval", 12, 9.0),
            sla("PO Matching", 12, 2.0),
            sla("Payment Release", 6, 9.0),
            sla("Vendor Onboarding", 3, 1.0),
        ];
        let mut criteria = SlaFilters::default();
        criteria.set("breaches", "critical").unwrap();
        criteria.set("delay", "severe").unwrap();
        let filtered = apply_filters(&rows, &criteria);
        assert_eq!(filtered, vec![sla("Invoice Approval", 12, 9.0)]);

        criteria.set("breaches", "moderate").unwrap();
        assert_eq!(
            apply_filters(&rows, &criteria),
            vec![sla("Payment Release", 6, 9.0)]
        );
    }

    #[test]
    fn test_compliance_tiers() {
        assert_eq!(RateTier::classify(90.0), RateTier::Fair);
        assert_eq!(RateTier::classify(95.0), RateTier::Excellent);
        assert_eq!(RateTier::classify(70.0), RateTier::Poor);
        assert_eq!(IssueTier::classify(0.0), IssueTier::Clean);
        assert_eq!(IssueTier::classify(1.0), IssueTier::Few);
        assert_eq!(IssueTier::classify(5.0), IssueTier::Few);
        assert_eq!(IssueTier::classify(6.0), IssueTier::Many);
        assert_eq!(IssueTier::Clean.name(), "none");
    }

    #[test]
    fn test_invalid_value_leaves_criteria_untouched() {
        let mut criteria = AgingFilters::default();
        criteria.set("status", "overdue").unwrap();
        let err = criteria.set("status", "late").unwrap_err();
        assert!(err.to_string().contains("all, overdue, warning, good"), "got: {err}");
        assert_eq!(criteria.status, Some(PendingStatus::Overdue));
    }

    #[test]
    fn test_unknown_slot_rejected() {
        let mut criteria = ComplianceFilters::default();
        let err = criteria.set("region", "emea").unwrap_err();
        assert!(matches!(err, ReportError::UnknownFilterSlot { .. }));
        assert!(criteria.is_neutral());
    }

    #[test]
    fn test_slot_listing_matches_setters() {
        let mut criteria = SlaFilters::default();
        for spec in SlaFilters::slots() {
            let value = match spec.kind {
                SlotKind::Text => "x",
                SlotKind::Bucket(names) => names[0],
            };
            criteria.set(spec.name, value).unwrap();
        }
        assert!(!criteria.is_neutral());
    }
}
