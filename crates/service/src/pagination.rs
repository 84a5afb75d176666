//! Pagination utilities for service layer
//!
//! `PageRequest` carries the caller's offset/limit window and sort order;
//! `normalize` clamps it to the configured page bounds.

use std::str::FromStr;

use models::{Feature, Record};

use crate::errors::ServiceError;

/// Upper bound on `limit` for one page.
pub const MAX_PAGE_LIMIT: usize = 1000;

/// Feature attribute a page can be ordered by.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortField {
    #[default]
    Key,
    Name,
    Category,
    Version,
}

impl FromStr for SortField {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "key" => Ok(SortField::Key),
            "name" => Ok(SortField::Name),
            "category" => Ok(SortField::Category),
            "version" => Ok(SortField::Version),
            other => Err(ServiceError::Validation(format!("cannot order by {other:?}"))),
        }
    }
}

impl SortField {
    /// Compare two features on this field.
    pub fn compare(self, a: &Feature, b: &Feature) -> std::cmp::Ordering {
        match self {
            SortField::Key => a.key().cmp(b.key()),
            SortField::Name => a.properties.name.cmp(&b.properties.name),
            SortField::Category => a.properties.category.cmp(&b.properties.category),
            SortField::Version => a.version().cmp(&b.version()),
        }
    }
}

/// Pagination parameters
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: usize,
    pub offset: usize,
    pub order_by: SortField,
    pub descending: bool,
}

impl PageRequest {
    /// Clamp `limit` into `1..=MAX_PAGE_LIMIT`.
    pub fn normalize(self) -> Self {
        Self { limit: self.limit.clamp(1, MAX_PAGE_LIMIT), ..self }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { limit: 25, offset: 0, order_by: SortField::Key, descending: false }
    }
}
