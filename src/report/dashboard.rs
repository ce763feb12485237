use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::thread::{self, ScopedJoinHandle};

use super::filter::{FilterCriteria, SlotSpec};
use super::pagination::PaginationInfo;
use super::rows::{
    normalize_aging, normalize_compliance, normalize_sla, normalize_trend, AgingRow,
    ComplianceRow, ReportRow, SlaBreachRow, TrendRow,
};
use super::summary::SummaryMetrics;
use super::view::{FetchTicket, ReportView};
use super::{DatasetId, TimeRange};
use crate::error::{ReportError, Result};
use crate::export::{to_delimited, to_records, Records};
use crate::pdf::{render_print_document, PrintDocument, Printer};
use crate::source::{
    DataSource, RawAgingRecord, RawCompliance, RawSlaBreaches, RawSummary, RawTrendPoint,
};

/// Dataset-agnostic handle on a view, for callers that pick the table at runtime.
pub trait DatasetView {
    fn slots(&self) -> &'static [SlotSpec];
    fn set_filter(&mut self, slot: &str, value: &str) -> Result<()>;
    fn reset_filters(&mut self);
    fn set_page(&mut self, page: usize);
    fn pagination_info(&self) -> PaginationInfo;
    fn is_loading(&self) -> bool;
    /// Stringified cells of the visible page.
    fn visible_records(&self) -> Result<Records>;
    /// Delimited text of the filtered, unpaginated rows.
    fn export_delimited(&self, delimiter: u8) -> Result<String>;
    fn print_document(&self, generated_at: &str) -> Result<PrintDocument>;
}

impl<R: ReportRow> DatasetView for ReportView<R> {
    fn slots(&self) -> &'static [SlotSpec] {
        R::Filters::slots()
    }

    fn set_filter(&mut self, slot: &str, value: &str) -> Result<()> {
        ReportView::set_filter(self, slot, value)
    }

    fn reset_filters(&mut self) {
        ReportView::reset_filters(self)
    }

    fn set_page(&mut self, page: usize) {
        ReportView::set_page(self, page)
    }

    fn pagination_info(&self) -> PaginationInfo {
        ReportView::pagination_info(self)
    }

    fn is_loading(&self) -> bool {
        ReportView::is_loading(self)
    }

    fn visible_records(&self) -> Result<Records> {
        to_records(self.visible_page(), Some(R::columns()))
    }

    fn export_delimited(&self, delimiter: u8) -> Result<String> {
        to_delimited(self.filtered(), Some(R::columns()), delimiter)
    }

    fn print_document(&self, generated_at: &str) -> Result<PrintDocument> {
        render_print_document(
            R::DATASET.title(),
            R::columns(),
            self.filtered(),
            generated_at,
        )
    }
}

/// Ticket for the range-scoped released/pending fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodTicket {
    range: TimeRange,
    generation: u64,
}

/// Every report view plus the headline KPIs.
///
/// Views share nothing but the read-only time range.
pub struct Dashboard {
    pub aging: ReportView<AgingRow>,
    pub compliance: ReportView<ComplianceRow>,
    pub sla: ReportView<SlaBreachRow>,
    pub trends: ReportView<TrendRow>,
    summary: SummaryMetrics,
    range: TimeRange,
    period_generation: u64,
}

fn joined<T>(dataset: &str, handle: ScopedJoinHandle<'_, Result<T>>) -> Result<T> {
    handle.join().unwrap_or_else(|_| {
        Err(ReportError::SourceUnavailable {
            dataset: dataset.to_string(),
            reason: "fetch thread panicked".to_string(),
        })
    })
}

impl Dashboard {
    pub fn new(page_size: usize, range: TimeRange) -> Self {
        Self {
            aging: ReportView::new(page_size),
            compliance: ReportView::new(page_size),
            sla: ReportView::new(page_size),
            trends: ReportView::new(page_size),
            summary: SummaryMetrics::default(),
            range,
            period_generation: 0,
        }
    }

    pub fn summary(&self) -> &SummaryMetrics {
        &self.summary
    }

    pub fn range(&self) -> TimeRange {
        self.range
    }

    pub fn view(&self, dataset: DatasetId) -> &dyn DatasetView {
        match dataset {
            DatasetId::Aging => &self.aging,
            DatasetId::Compliance => &self.compliance,
            DatasetId::SlaBreaches => &self.sla,
            DatasetId::Trends => &self.trends,
        }
    }

    pub fn view_mut(&mut self, dataset: DatasetId) -> &mut dyn DatasetView {
        match dataset {
            DatasetId::Aging => &mut self.aging,
            DatasetId::Compliance => &mut self.compliance,
            DatasetId::SlaBreaches => &mut self.sla,
            DatasetId::Trends => &mut self.trends,
        }
    }

    /// Fetch every dataset concurrently and commit each through its own guard.
    pub fn refresh<S: DataSource + ?Sized>(&mut self, source: &S) {
        self.refresh_at(source, Utc::now());
    }

    /// As `refresh`, normalizing derived fields against `now`.
    pub fn refresh_at<S: DataSource + ?Sized>(&mut self, source: &S, now: DateTime<Utc>) {
        let aging_ticket = self.aging.begin_fetch();
        let compliance_ticket = self.compliance.begin_fetch();
        let sla_ticket = self.sla.begin_fetch();
        let trends_ticket = self.trends.begin_fetch();
        let period_ticket = self.begin_period();
        let range = self.range;

        log::debug!("refreshing all datasets (range: {range})");
        let (aging, compliance, sla, summary, trends) = thread::scope(|s| {
            let aging = s.spawn(|| source.fetch_aging());
            let compliance = s.spawn(|| source.fetch_compliance());
            let sla = s.spawn(|| source.fetch_sla_breaches());
            let summary = s.spawn(|| source.fetch_summary(range));
            let trends = s.spawn(|| source.fetch_trends(range));
            (
                joined("aging", aging),
                joined("compliance", compliance),
                joined("sla", sla),
                joined("summary", summary),
                joined("trends", trends),
            )
        });

        self.commit_aging(aging_ticket, aging, now);
        self.commit_compliance(compliance_ticket, compliance);
        self.commit_sla(sla_ticket, sla);
        self.commit_period(period_ticket, summary);
        self.commit_trends(trends_ticket, trends);
    }

    /// Switch the time range and refetch only the range-scoped figures.
    pub fn set_range<S: DataSource + ?Sized>(&mut self, range: TimeRange, source: &S) {
        if range == self.range {
            return;
        }
        self.range = range;
        let period_ticket = self.begin_period();
        let trends_ticket = self.trends.begin_fetch();

        let (summary, trends) = thread::scope(|s| {
            let summary = s.spawn(|| source.fetch_summary(range));
            let trends = s.spawn(|| source.fetch_trends(range));
            (joined("summary", summary), joined("trends", trends))
        });

        self.commit_period(period_ticket, summary);
        self.commit_trends(trends_ticket, trends);
    }

    pub fn begin_period(&mut self) -> PeriodTicket {
        self.period_generation += 1;
        PeriodTicket {
            range: self.range,
            generation: self.period_generation,
        }
    }

    pub fn commit_aging(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<RawAgingRecord>>,
        now: DateTime<Utc>,
    ) -> bool {
        let rows = result.map(|raw| {
            raw.into_iter()
                .map(|record| normalize_aging(record, now))
                .collect()
        });
        let committed = self.aging.complete_fetch(ticket, rows);
        if committed {
            self.summary.update_aging(self.aging.rows());
        }
        committed
    }

    pub fn commit_compliance(
        &mut self,
        ticket: FetchTicket,
        result: Result<RawCompliance>,
    ) -> bool {
        if !self.compliance.is_current(ticket) {
            return false;
        }
        let (rows, payload) = match result {
            Ok(mut payload) => {
                let vendors = std::mem::take(&mut payload.vendors);
                let rows = vendors.into_iter().map(normalize_compliance).collect();
                (Ok(rows), Some(payload))
            }
            Err(e) => (Err(e), None),
        };
        self.summary.update_compliance(payload.as_ref());
        self.compliance.complete_fetch(ticket, rows)
    }

    pub fn commit_sla(&mut self, ticket: FetchTicket, result: Result<RawSlaBreaches>) -> bool {
        if !self.sla.is_current(ticket) {
            return false;
        }
        let (rows, payload) = match result {
            Ok(mut payload) => {
                let items = std::mem::take(&mut payload.items);
                let rows = items.into_iter().map(normalize_sla).collect();
                (Ok(rows), Some(payload))
            }
            Err(e) => (Err(e), None),
        };
        self.summary.update_sla(payload.as_ref());
        self.sla.complete_fetch(ticket, rows)
    }

    pub fn commit_trends(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<RawTrendPoint>>,
    ) -> bool {
        let rows = result.map(|raw| raw.into_iter().map(normalize_trend).collect());
        self.trends.complete_fetch(ticket, rows)
    }

    pub fn commit_period(&mut self, ticket: PeriodTicket, result: Result<RawSummary>) -> bool {
        if ticket.generation != self.period_generation || ticket.range != self.range {
            log::debug!("discarding stale {} summary", ticket.range);
            return false;
        }
        match result {
            Ok(payload) => self.summary.update_period(Some(&payload)),
            Err(e) => {
                log::warn!("summary: {e}; released/pending shown as zero");
                self.summary.update_period(None);
            }
        }
        true
    }

    /// Delimited text of the dataset's current filtered view.
    pub fn export_delimited(&self, dataset: DatasetId, delimiter: u8) -> Result<String> {
        self.view(dataset).export_delimited(delimiter)
    }

    pub fn print_document(&self, dataset: DatasetId, generated_at: &str) -> Result<PrintDocument> {
        self.view(dataset).print_document(generated_at)
    }

    /// Start a background print of the dataset's filtered view.
    ///
    /// Never fails from the caller's point of view; problems are logged.
    pub fn trigger_print_export(&self, dataset: DatasetId, printer: &Printer, output: PathBuf) {
        let generated_at = Utc::now().format("%B %d, %Y %H:%M UTC").to_string();
        match self.print_document(dataset, &generated_at) {
            Ok(doc) => printer.print(doc, output),
            Err(e) => log::warn!("{dataset}: cannot build print document: {e}"),
        }
    }
}
