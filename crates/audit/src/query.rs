//! Filtered, paginated read surface over the audit trail.

use serde::{Deserialize, Serialize};

/// Default page size for audit queries.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Search criteria for audit records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditFilter {
    /// Case-insensitive free-text match over the action and entity-name
    /// fields.
    pub search: Option<String>,
}

impl AuditFilter {
    pub fn search(term: impl Into<String>) -> Self {
        Self {
            search: Some(term.into()),
        }
    }

    pub(crate) fn matches(&self, action: &str, entity_name: &str) -> bool {
        match &self.search {
            None => true,
            Some(term) => {
                let needle = term.to_lowercase();
                action.to_lowercase().contains(&needle)
                    || entity_name.to_lowercase().contains(&needle)
            }
        }
    }
}

/// Zero-based page request. Sorting is fixed: event time ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: usize,
    pub size: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    pub fn new(page: usize, size: usize) -> Self {
        Self { page, size }
    }

    pub(crate) fn offset(&self) -> usize {
        self.page * self.size
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub size: usize,
    pub total_elements: usize,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> usize {
        if self.size == 0 {
            0
        } else {
            self.total_elements.div_ceil(self.size)
        }
    }
}
