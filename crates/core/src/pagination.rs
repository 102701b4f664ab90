//! Page requests and paged results.

use crate::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::models::{Appointment, InventoryItem, Invoice, Patient};
use serde::{Deserialize, Serialize};

/// Raw page parameters as sent by a client. Any value is accepted; use
/// [`PageRequest::normalized`] before slicing.
#[derive(Debug, Clone, Copy, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PageRequest {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

/// Page parameters after normalisation: `page >= 1`, `1 <= page_size <= MAX_PAGE_SIZE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizedPage {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn new(page: i64, page_size: i64) -> Self {
        Self {
            page: Some(page),
            page_size: Some(page_size),
        }
    }

    pub fn normalized(&self) -> NormalizedPage {
        let page = match self.page {
            Some(p) if p >= 1 => p.min(u32::MAX as i64) as u32,
            _ => 1,
        };
        let page_size = match self.page_size {
            Some(s) if s < 1 => DEFAULT_PAGE_SIZE,
            Some(s) => s.min(MAX_PAGE_SIZE as i64) as u32,
            None => DEFAULT_PAGE_SIZE,
        };
        NormalizedPage { page, page_size }
    }
}

impl NormalizedPage {
    pub fn offset(&self) -> usize {
        (self.page as usize - 1).saturating_mul(self.page_size as usize)
    }
}

/// One page of results plus the totals needed to render a pager.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
#[aliases(
    PatientPage = Page<Patient>,
    AppointmentPage = Page<Appointment>,
    InvoicePage = Page<Invoice>,
    InventoryPage = Page<InventoryItem>
)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total_count: usize,
    pub total_pages: u32,
}

impl<T> Page<T> {
    /// Slices an already filtered and ordered list into the requested page.
    pub fn from_vec(all: Vec<T>, request: &PageRequest) -> Self {
        let normalized = request.normalized();
        let total_count = all.len();
        let total_pages = total_count.div_ceil(normalized.page_size as usize) as u32;

        let items = all
            .into_iter()
            .skip(normalized.offset())
            .take(normalized.page_size as usize)
            .collect();

        Self {
            items,
            page: normalized.page,
            page_size: normalized.page_size,
            total_count,
            total_pages,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            page_size: self.page_size,
            total_count: self.total_count,
            total_pages: self.total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_out_of_range_values() {
        assert_eq!(
            PageRequest::default().normalized(),
            NormalizedPage {
                page: 1,
                page_size: DEFAULT_PAGE_SIZE
            }
        );
        assert_eq!(
            PageRequest::new(0, 0).normalized(),
            NormalizedPage {
                page: 1,
                page_size: DEFAULT_PAGE_SIZE
            }
        );
        assert_eq!(
            PageRequest::new(-5, -1).normalized(),
            NormalizedPage {
                page: 1,
                page_size: DEFAULT_PAGE_SIZE
            }
        );
        assert_eq!(
            PageRequest::new(3, 1000).normalized(),
            NormalizedPage {
                page: 3,
                page_size: MAX_PAGE_SIZE
            }
        );
        assert_eq!(PageRequest::new(2, 1).normalized().page_size, 1);
    }

    #[test]
    fn slices_pages() {
        let page = Page::from_vec((1..=45).collect::<Vec<_>>(), &PageRequest::new(3, 20));
        assert_eq!(page.items, (41..=45).collect::<Vec<_>>());
        assert_eq!(page.total_count, 45);
        assert_eq!(page.total_pages, 3);
    }

    #[test]
    fn page_past_end_is_empty_with_true_totals() {
        let page = Page::from_vec(vec![1, 2, 3], &PageRequest::new(9, 2));
        assert!(page.items.is_empty());
        assert_eq!(page.total_count, 3);
        assert_eq!(page.total_pages, 2);
    }

    #[test]
    fn empty_list_has_zero_pages() {
        let page: Page<i32> = Page::from_vec(vec![], &PageRequest::default());
        assert_eq!(page.total_pages, 0);
        assert_eq!(page.page, 1);
    }
}
