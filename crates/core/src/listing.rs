//! Validation and page math for the comparison list query.
//!
//! Sorting is restricted to a fixed column whitelist; an unrecognized sort
//! field is a validation error, never a silent fallback. Pagination is
//! 1-indexed with a bounded page size.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

// ---------------------------------------------------------------------------
// Sort whitelist
// ---------------------------------------------------------------------------

/// Columns a comparison listing may be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    CreatedAt,
    ModificationPercentage,
    FieldsAdded,
    FieldsRemoved,
    FieldsModified,
}

impl SortBy {
    /// The SQL column this sort key maps to. Only ever interpolated from
    /// this fixed set, never from raw user input.
    pub fn column(&self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::ModificationPercentage => "modification_percentage",
            Self::FieldsAdded => "fields_added",
            Self::FieldsRemoved => "fields_removed",
            Self::FieldsModified => "fields_modified",
        }
    }
}

impl FromStr for SortBy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created_at" => Ok(Self::CreatedAt),
            "modification_percentage" => Ok(Self::ModificationPercentage),
            "fields_added" => Ok(Self::FieldsAdded),
            "fields_removed" => Ok(Self::FieldsRemoved),
            "fields_modified" => Ok(Self::FieldsModified),
            other => Err(CoreError::Validation(format!(
                "Invalid sort_by '{other}'. Must be one of: created_at, \
                 modification_percentage, fields_added, fields_removed, fields_modified"
            ))),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl FromStr for SortOrder {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(CoreError::Validation(format!(
                "Invalid sort_order '{other}'. Must be 'asc' or 'desc'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// List request
// ---------------------------------------------------------------------------

/// A validated comparison list query.
#[derive(Debug, Clone)]
pub struct ListRequest {
    pub page: i64,
    pub page_size: i64,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
    /// Case-insensitive match against either side's template name.
    pub search: Option<String>,
}

impl ListRequest {
    /// Validate raw query values into a [`ListRequest`].
    ///
    /// Pages are 1-indexed and `page_size` must lie in `1..=MAX_PAGE_SIZE`;
    /// out-of-range values are rejected, not clamped. Defaults: page 1,
    /// page size [`DEFAULT_PAGE_SIZE`], sort by created_at descending.
    pub fn new(
        page: Option<i64>,
        page_size: Option<i64>,
        sort_by: Option<&str>,
        sort_order: Option<&str>,
        search: Option<String>,
    ) -> Result<Self, CoreError> {
        let page = page.unwrap_or(1);
        if page < 1 {
            return Err(CoreError::Validation(format!(
                "page must be >= 1, got {page}"
            )));
        }

        let page_size = page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(CoreError::Validation(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}, got {page_size}"
            )));
        }

        let sort_by = match sort_by {
            Some(s) => s.parse()?,
            None => SortBy::CreatedAt,
        };
        let sort_order = match sort_order {
            Some(s) => s.parse()?,
            None => SortOrder::Desc,
        };

        let search = search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(Self {
            page,
            page_size,
            sort_by,
            sort_order,
            search,
        })
    }

    /// SQL OFFSET for this page.
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.page_size
    }

    /// Total page count for a given row total: `ceil(total / page_size)`.
    pub fn total_pages(&self, total: i64) -> i64 {
        if total == 0 {
            0
        } else {
            (total + self.page_size - 1) / self.page_size
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_validation_err(result: Result<ListRequest, CoreError>) {
        match result {
            Err(CoreError::Validation(_)) => {}
            other => panic!("expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn defaults_are_first_page_newest_first() {
        let req = ListRequest::new(None, None, None, None, None).unwrap();
        assert_eq!(req.page, 1);
        assert_eq!(req.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(req.sort_by, SortBy::CreatedAt);
        assert_eq!(req.sort_order, SortOrder::Desc);
        assert_eq!(req.offset(), 0);
    }

    #[test]
    fn bogus_sort_field_is_rejected_not_defaulted() {
        assert_validation_err(ListRequest::new(None, None, Some("bogus_field"), None, None));
    }

    #[test]
    fn bogus_sort_order_is_rejected() {
        assert_validation_err(ListRequest::new(None, None, None, Some("sideways"), None));
    }

    #[test]
    fn page_must_be_positive() {
        assert_validation_err(ListRequest::new(Some(0), None, None, None, None));
        assert_validation_err(ListRequest::new(Some(-3), None, None, None, None));
    }

    #[test]
    fn page_size_is_bounded() {
        assert_validation_err(ListRequest::new(None, Some(0), None, None, None));
        assert_validation_err(ListRequest::new(None, Some(MAX_PAGE_SIZE + 1), None, None, None));
        assert!(ListRequest::new(None, Some(MAX_PAGE_SIZE), None, None, None).is_ok());
    }

    #[test]
    fn offset_reflects_one_indexed_pages() {
        let req = ListRequest::new(Some(3), Some(25), None, None, None).unwrap();
        assert_eq!(req.offset(), 50);
    }

    #[test]
    fn total_pages_rounds_up() {
        let req = ListRequest::new(Some(1), Some(10), None, None, None).unwrap();
        assert_eq!(req.total_pages(0), 0);
        assert_eq!(req.total_pages(1), 1);
        assert_eq!(req.total_pages(10), 1);
        assert_eq!(req.total_pages(11), 2);
        assert_eq!(req.total_pages(95), 10);
    }

    #[test]
    fn blank_search_is_normalized_away() {
        let req = ListRequest::new(None, None, None, None, Some("   ".into())).unwrap();
        assert!(req.search.is_none());

        let req = ListRequest::new(None, None, None, None, Some("  tax form ".into())).unwrap();
        assert_eq!(req.search.as_deref(), Some("tax form"));
    }

    #[test]
    fn every_whitelisted_column_parses() {
        for name in [
            "created_at",
            "modification_percentage",
            "fields_added",
            "fields_removed",
            "fields_modified",
        ] {
            let sort: SortBy = name.parse().unwrap();
            assert_eq!(sort.column(), name);
        }
    }
}
