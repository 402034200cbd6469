//! Filtering and paging over supervisor logbook summaries.

use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use shared::protocol::LogbookSummary;

pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    #[default]
    All,
    Signed,
    Pending,
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" | "todas" => Ok(Self::All),
            "signed" | "firmada" => Ok(Self::Signed),
            "pending" | "pendiente" => Ok(Self::Pending),
            other => Err(format!("unknown status filter '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogbookFilters {
    pub search: String,
    pub status: StatusFilter,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl LogbookFilters {
    pub fn matches(&self, entry: &LogbookSummary) -> bool {
        let needle = self.search.trim().to_lowercase();
        if !needle.is_empty() {
            let hit = [
                Some(entry.code.as_str()),
                entry.supervisor.as_deref(),
                entry.lead_diver.as_deref(),
                entry.immersion_code.as_deref(),
            ]
            .into_iter()
            .flatten()
            .any(|haystack| haystack.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }

        let signed = entry.is_signed();
        match self.status {
            StatusFilter::Signed if !signed => return false,
            StatusFilter::Pending if signed => return false,
            _ => {}
        }

        // Undated entries pass both bounds.
        if let Some(date) = entry.date {
            if self.from.is_some_and(|from| date < from) {
                return false;
            }
            if self.to.is_some_and(|to| date > to) {
                return false;
            }
        }
        true
    }
}

/// Filter state plus a page cursor. Any change to the filters or to the
/// page size rewinds the cursor to page 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogbookQuery {
    filters: LogbookFilters,
    page: usize,
    page_size: usize,
}

impl Default for LogbookQuery {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl LogbookQuery {
    pub fn new(page_size: usize) -> Self {
        Self {
            filters: LogbookFilters::default(),
            page: 1,
            page_size: page_size.max(1),
        }
    }

    pub fn filters(&self) -> &LogbookFilters {
        &self.filters
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn set_filters(&mut self, filters: LogbookFilters) {
        self.filters = filters;
        self.page = 1;
    }

    pub fn update_filters(&mut self, update: impl FnOnce(&mut LogbookFilters)) {
        update(&mut self.filters);
        self.page = 1;
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
        self.page = 1;
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    /// Pages past the end yield an empty item list.
    pub fn apply(&self, entries: &[LogbookSummary]) -> LogbookPage {
        let matching: Vec<&LogbookSummary> = entries
            .iter()
            .filter(|entry| self.filters.matches(entry))
            .collect();
        let total_items = matching.len();
        let items = matching
            .into_iter()
            .skip((self.page - 1).saturating_mul(self.page_size))
            .take(self.page_size)
            .cloned()
            .collect();

        LogbookPage {
            items,
            page: self.page,
            page_size: self.page_size,
            total_items,
            total_pages: total_items.div_ceil(self.page_size),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LogbookPage {
    pub items: Vec<LogbookSummary>,
    pub page: usize,
    pub page_size: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

#[cfg(test)]
#[path = "tests/listing_tests.rs"]
mod tests;
