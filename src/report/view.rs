use super::filter::{apply_filters, FilterCriteria};
use super::pagination::{Pagination, PaginationInfo};
use super::rows::ReportRow;
use super::DatasetId;
use crate::error::Result;

/// Proof of interest captured when a fetch starts.
///
/// A completion is committed only if its ticket is still the latest one
/// issued by the view and the view has not been detached since.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    dataset: DatasetId,
    generation: u64,
}

/// Rows, filters and page of one dataset. Nothing here is shared with other views.
#[derive(Debug, Clone)]
pub struct ReportView<R: ReportRow> {
    rows: Vec<R>,
    filtered: Vec<R>,
    criteria: R::Filters,
    pagination: Pagination,
    loading: bool,
    generation: u64,
    attached: bool,
}

impl<R: ReportRow> ReportView<R> {
    pub fn new(page_size: usize) -> Self {
        Self {
            rows: Vec::new(),
            filtered: Vec::new(),
            criteria: R::Filters::default(),
            pagination: Pagination::new(page_size),
            loading: false,
            generation: 0,
            attached: true,
        }
    }

    /// A view pre-loaded with rows, bypassing the fetch guard.
    pub fn with_rows(page_size: usize, rows: Vec<R>) -> Self {
        let mut view = Self::new(page_size);
        view.replace_rows(rows);
        view
    }

    /// Every row of the last committed fetch, unfiltered.
    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    /// Rows passing the current criteria, unpaginated.
    pub fn filtered(&self) -> &[R] {
        &self.filtered
    }

    pub fn criteria(&self) -> &R::Filters {
        &self.criteria
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn visible_page(&self) -> &[R] {
        self.pagination.slice(&self.filtered)
    }

    pub fn pagination_info(&self) -> PaginationInfo {
        self.pagination.info(self.filtered.len())
    }

    /// Change one filter slot. The page returns to 1 if the criteria actually changed.
    pub fn set_filter(&mut self, slot: &str, value: &str) -> Result<()> {
        let mut next = self.criteria.clone();
        next.set(slot, value)?;
        if next != self.criteria {
            log::debug!("{}: filter {slot}={value:?}", R::DATASET);
            self.criteria = next;
            self.pagination.reset();
            self.refilter();
        }
        Ok(())
    }

    pub fn reset_filters(&mut self) {
        self.criteria = R::Filters::default();
        self.pagination.reset();
        self.refilter();
    }

    /// Page navigation never touches the criteria.
    pub fn set_page(&mut self, page: usize) {
        self.pagination.set_page(page);
    }

    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.generation += 1;
        self.loading = true;
        log::debug!("{}: fetch #{} started", R::DATASET, self.generation);
        FetchTicket {
            dataset: R::DATASET,
            generation: self.generation,
        }
    }

    /// Commit a fetch result if the ticket is still current.
    ///
    /// A failed fetch commits an empty row set. Returns whether the result was applied.
    pub fn complete_fetch(&mut self, ticket: FetchTicket, result: Result<Vec<R>>) -> bool {
        if !self.is_current(ticket) {
            log::debug!(
                "{}: discarding stale fetch #{} (current #{}, attached: {})",
                R::DATASET,
                ticket.generation,
                self.generation,
                self.attached
            );
            return false;
        }

        let rows = match result {
            Ok(rows) => rows,
            Err(e) => {
                log::warn!("{}: {e}; showing an empty report", R::DATASET);
                Vec::new()
            }
        };
        log::debug!("{}: committed {} rows", R::DATASET, rows.len());
        self.replace_rows(rows);
        self.loading = false;
        true
    }

    pub fn is_current(&self, ticket: FetchTicket) -> bool {
        self.attached && ticket.dataset == R::DATASET && ticket.generation == self.generation
    }

    /// Drop interest in any in-flight fetch, e.g. when the view is torn down.
    pub fn detach(&mut self) {
        self.attached = false;
        self.generation += 1;
        self.loading = false;
    }

    pub fn attach(&mut self) {
        self.attached = true;
    }

    fn replace_rows(&mut self, rows: Vec<R>) {
        self.rows = rows;
        self.refilter();
    }

    fn refilter(&mut self) {
        self.filtered = apply_filters(&self.rows, &self.criteria);
    }
}
