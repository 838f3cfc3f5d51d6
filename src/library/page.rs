use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// 1-based.
    pub page: usize,
    pub page_size: usize,
}

impl Pagination {
    pub fn new(page: usize, page_size: usize) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.max(1),
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(1, 24)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageView<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub total_count: usize,
    pub total_pages: usize,
}

pub fn total_pages(count: usize, page_size: usize) -> usize {
    count.div_ceil(page_size.max(1))
}

/// Caller-side clamp of a requested page into `1..=total_pages`.
pub fn clamp_page(page: usize, total_pages: usize) -> usize {
    page.clamp(1, total_pages.max(1))
}

/// Slices `(page - 1) * page_size .. + page_size`. Pages past the end come
/// back empty; clamping is the caller's job.
pub fn paginate<T: Clone>(items: &[T], pagination: Pagination) -> PageView<T> {
    let Pagination { page, page_size } = Pagination::new(pagination.page, pagination.page_size);
    let start = (page - 1).saturating_mul(page_size).min(items.len());
    let end = start.saturating_add(page_size).min(items.len());

    PageView {
        items: items[start..end].to_vec(),
        page,
        page_size,
        total_count: items.len(),
        total_pages: total_pages(items.len(), page_size),
    }
}
