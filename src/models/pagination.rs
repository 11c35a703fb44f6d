// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use crate::models::criteria::Criteria;

pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Page state for list widgets. `current_page` is zero-based and clamped to
/// the last page once the item count is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    page_size: u32,
    current_page: u32,
    item_count: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            current_page: 0,
            item_count: 0,
        }
    }
}

impl Pagination {
    pub fn new(page_size: u32) -> Self {
        Self {
            page_size: page_size.max(1),
            ..Self::default()
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn set_page_size(&mut self, page_size: u32) {
        self.page_size = page_size.max(1);
    }

    pub fn item_count(&self) -> u64 {
        self.item_count
    }

    pub fn set_item_count(&mut self, item_count: u64) {
        self.item_count = item_count;
    }

    pub fn page_count(&self) -> u64 {
        self.item_count.div_ceil(u64::from(self.page_size))
    }

    pub fn current_page(&self) -> u32 {
        let last = self.page_count().saturating_sub(1);
        let last = u32::try_from(last).unwrap_or(u32::MAX);
        self.current_page.min(last)
    }

    pub fn set_current_page(&mut self, page: u32) {
        self.current_page = page;
    }

    pub fn offset(&self) -> u32 {
        self.current_page().saturating_mul(self.page_size)
    }

    /// Set `rows`/`start` on the criteria for the current page.
    pub fn apply_limit(&self, criteria: &mut Criteria) {
        criteria.set_limit(self.page_size);
        criteria.set_offset(self.offset());
    }
}
