use serde::Serialize;

use super::rows::AgingRow;
use crate::source::{RawCompliance, RawSlaBreaches, RawSummary};

/// Headline KPIs, independent of any view's filters or page.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SummaryMetrics {
    pub total_outstanding: f64,
    pub overall_compliance_rate: f64,
    pub total_breaches: u64,
    pub avg_delay_across_all: f64,
    pub released: f64,
    pub pending: f64,
}

/// Sum of outstanding amounts over every aging row.
pub fn total_outstanding(rows: &[AgingRow]) -> f64 {
    rows.iter().map(|r| r.outstanding_amount).sum()
}

impl SummaryMetrics {
    /// Recompute from the full (unfiltered) aging row set.
    pub fn update_aging(&mut self, rows: &[AgingRow]) {
        self.total_outstanding = total_outstanding(rows);
    }

    /// Take the headline rate straight from the source, never from vendor rows.
    pub fn update_compliance(&mut self, payload: Option<&RawCompliance>) {
        self.overall_compliance_rate = payload
            .and_then(|p| p.overall_compliance_rate)
            .unwrap_or(0.0);
    }

    pub fn update_sla(&mut self, payload: Option<&RawSlaBreaches>) {
        self.total_breaches = payload
            .and_then(|p| p.total_breaches)
            .map(|n| n as u64)
            .unwrap_or(0);
        self.avg_delay_across_all = payload
            .and_then(|p| p.avg_delay_across_all)
            .unwrap_or(0.0);
    }

    /// Released/pending figures for the selected time range.
    pub fn update_period(&mut self, payload: Option<&RawSummary>) {
        self.released = payload.and_then(|p| p.released).unwrap_or(0.0);
        self.pending = payload.and_then(|p| p.pending).unwrap_or(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{RawComplianceRecord, RawSlaRecord};

    fn aging(amount: f64, avg: f64) -> AgingRow {
        AgingRow {
            vendor_name: "v".to_string(),
            outstanding_amount: amount,
            avg_pending_days: avg,
            oldest_invoice_date: None,
            oldest_invoice_days: 0,
        }
    }

    #[test]
    fn test_total_outstanding_sums_all_rows() {
        let rows = vec![aging(100.0, 45.0), aging(250.5, 5.0), aging(0.0, 20.0)];
        assert_eq!(total_outstanding(&rows), 350.5);
        assert_eq!(total_outstanding(&[]), 0.0);
    }

    #[test]
    fn test_compliance_rate_comes_from_source_summary() {
        let payload = RawCompliance {
            vendors: vec![
                RawComplianceRecord {
                    compliant_percentage: Some(50.0),
                    ..Default::default()
                },
                RawComplianceRecord {
                    compliant_percentage: Some(100.0),
                    ..Default::default()
                },
            ],
            overall_compliance_rate: Some(82.4),
        };
        let mut metrics = SummaryMetrics::default();
        metrics.update_compliance(Some(&payload));
        assert_eq!(metrics.overall_compliance_rate, 82.4);
    }

    #[test]
    fn test_missing_summaries_default_to_zero() {
        let mut metrics = SummaryMetrics {
            total_breaches: 9,
            released: 10.0,
            pending: 4.0,
            overall_compliance_rate: 75.0,
            ..Default::default()
        };
        metrics.update_sla(None);
        metrics.update_period(None);
        metrics.update_compliance(Some(&RawCompliance::default()));
        assert_eq!(metrics, SummaryMetrics::default());
    }

    #[test]
    fn test_sla_totals_not_recomputed_from_items() {
        let payload = RawSlaBreaches {
            items: vec![RawSlaRecord {
                breach_count: Some(3.0),
                ..Default::default()
            }],
            total_breaches: Some(41.0),
            avg_delay_across_all: Some(4.5),
        };
        let mut metrics = SummaryMetrics::default();
        metrics.update_sla(Some(&payload));
        assert_eq!(metrics.total_breaches, 41);
        assert_eq!(metrics.avg_delay_across_all, 4.5);
    }
}
