use serde::Serialize;
use std::ops::Range;

/// Number of pages needed for `len` items; zero when there are no items.
pub fn total_pages(len: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    len.div_ceil(page_size)
}

/// Current page of one dataset's view. Page numbers are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    current_page: usize,
    page_size: usize,
}

/// Snapshot handed to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaginationInfo {
    pub current_page: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub start_index: usize,
    pub end_index: usize,
}

impl Pagination {
    /// A zero page size is treated as one.
    pub fn new(page_size: usize) -> Self {
        Self {
            current_page: 1,
            page_size: page_size.max(1),
        }
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Navigate without clamping to the page count; out-of-range pages window to nothing.
    pub fn set_page(&mut self, page: usize) {
        self.current_page = page.max(1);
    }

    pub fn reset(&mut self) {
        self.current_page = 1;
    }

    /// Index range of the visible items for a sequence of `len` items.
    pub fn window(&self, len: usize) -> Range<usize> {
        let start = (self.current_page - 1)
            .saturating_mul(self.page_size)
            .min(len);
        let end = start.saturating_add(self.page_size).min(len);
        start..end
    }

    pub fn info(&self, len: usize) -> PaginationInfo {
        let window = self.window(len);
        PaginationInfo {
            current_page: self.current_page,
            total_pages: total_pages(len, self.page_size),
            total_items: len,
            start_index: window.start,
            end_index: window.end,
        }
    }

    /// The visible sub-slice of `items`.
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        &items[self.window(items.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(1, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(23, 10), 3);
    }

    #[test]
    fn test_last_page_is_short() {
        let mut pagination = Pagination::new(10);
        pagination.set_page(3);
        assert_eq!(pagination.window(23), 20..23);
        let info = pagination.info(23);
        assert_eq!(info.total_pages, 3);
        assert_eq!(info.start_index, 20);
        assert_eq!(info.end_index, 23);
    }

    #[test]
    fn test_out_of_range_page_is_empty() {
        let mut pagination = Pagination::new(10);
        pagination.set_page(7);
        let items: Vec<u32> = (0..23).collect();
        assert!(pagination.slice(&items).is_empty());
        assert_eq!(pagination.current_page(), 7);

        pagination.set_page(0);
        assert_eq!(pagination.current_page(), 1);
    }

    #[test]
    fn test_empty_sequence() {
        let pagination = Pagination::new(10);
        let info = pagination.info(0);
        assert_eq!(info.total_pages, 0);
        assert_eq!(info.start_index, 0);
        assert_eq!(info.end_index, 0);
    }

    #[test]
    fn test_pages_partition_the_sequence() {
        for len in [0usize, 1, 9, 10, 11, 23, 40] {
            for size in [1usize, 3, 10] {
                let items: Vec<usize> = (0..len).collect();
                let mut pagination = Pagination::new(size);
                let mut seen = Vec::new();
                for page in 1..=total_pages(len, size) {
                    pagination.set_page(page);
                    let visible = pagination.slice(&items);
                    assert!(!visible.is_empty());
                    assert!(visible.len() <= size);
                    seen.extend_from_slice(visible);
                }
                assert_eq!(seen, items, "len {len} size {size}");
            }
        }
    }

    #[test]
    fn test_zero_page_size_clamped() {
        assert_eq!(Pagination::new(0).page_size(), 1);
    }
}
