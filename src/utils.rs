use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// `?page=N` query parameter, 1-based.
#[derive(Debug, Deserialize, Default)]
pub struct PageParams {
    #[serde(default)]
    page: Option<u64>,
}

impl PageParams {
    pub fn new(page: u64) -> Self {
        Self { page: Some(page) }
    }

    pub fn page(&self) -> u64 {
        // Missing or zero means the first page
        self.page.unwrap_or(1).max(1)
    }
}

/// Limit/offset window for one page of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: u64,
    pub page_size: u64,
}

impl PageWindow {
    /// Validates the requested page against the total row count. Pages past the
    /// end are a 404, except the first page of an empty listing.
    pub fn resolve(params: &PageParams, page_size: u64, total: i64) -> Result<Self, AppError> {
        let page_size = page_size.max(1);
        let page = params.page();
        if page > num_pages(total, page_size) {
            return Err(AppError::NotFound);
        }
        Ok(Self { page, page_size })
    }

    pub fn limit(&self) -> i64 {
        self.page_size as i64
    }

    pub fn offset(&self) -> i64 {
        ((self.page - 1) * self.page_size) as i64
    }
}

/// Number of pages for `total` rows; an empty listing still has one page.
pub fn num_pages(total: i64, page_size: u64) -> u64 {
    let total = total.max(0) as u64;
    let page_size = page_size.max(1);
    if total == 0 {
        1
    } else {
        (total + page_size - 1) / page_size
    }
}

/// Page on which the `position`-th item (1-based) of a listing lands.
pub fn page_for_position(position: i64, page_size: u64) -> u64 {
    num_pages(position.max(1), page_size)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub num_pages: u64,
    pub total: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, window: PageWindow, total: i64) -> Self {
        Self {
            items,
            page: window.page,
            num_pages: num_pages(total, window.page_size),
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_defaults_to_first() {
        assert_eq!(PageParams::default().page(), 1);
        assert_eq!(PageParams::new(0).page(), 1);
        assert_eq!(PageParams::new(4).page(), 4);
    }

    #[test]
    fn window_offsets() {
        let window = PageWindow::resolve(&PageParams::new(3), 10, 25).unwrap();
        assert_eq!(window.limit(), 10);
        assert_eq!(window.offset(), 20);
    }

    #[test]
    fn page_past_end_is_not_found() {
        assert!(matches!(
            PageWindow::resolve(&PageParams::new(4), 10, 25),
            Err(AppError::NotFound)
        ));
        assert!(PageWindow::resolve(&PageParams::new(1), 10, 0).is_ok());
    }

    #[test]
    fn positions_map_to_pages() {
        assert_eq!(page_for_position(1, 10), 1);
        assert_eq!(page_for_position(10, 10), 1);
        assert_eq!(page_for_position(11, 10), 2);
        assert_eq!(num_pages(0, 10), 1);
    }
}
