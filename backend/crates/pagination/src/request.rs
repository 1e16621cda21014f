//! Validated page-number requests.

use serde::{Deserialize, Serialize};

/// Page returned when a caller does not ask for one.
pub const DEFAULT_PAGE: u32 = 1;
/// Page size returned when a caller does not ask for one.
pub const DEFAULT_PAGE_SIZE: u32 = 12;
/// Highest page number accepted from callers.
pub const MAX_PAGE: u32 = 10_000_000;
/// Largest page size accepted from callers.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Errors raised when a page request falls outside the accepted ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PaginationError {
    /// `page` was zero or above [`MAX_PAGE`].
    #[error("page must be between 1 and {MAX_PAGE}, got {page}")]
    PageOutOfRange {
        /// Rejected page number.
        page: u32,
    },
    /// `page_size` was zero or above [`MAX_PAGE_SIZE`].
    #[error("page size must be between 1 and {MAX_PAGE_SIZE}, got {page_size}")]
    PageSizeOutOfRange {
        /// Rejected page size.
        page_size: u32,
    },
}

/// One-based page request.
///
/// ## Invariants
/// - `1 <= page <= MAX_PAGE`
/// - `1 <= page_size <= MAX_PAGE_SIZE`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl PageRequest {
    /// Validate and build a page request.
    ///
    /// # Errors
    ///
    /// Returns [`PaginationError`] when either value is out of range. The page
    /// is checked before the page size.
    pub const fn new(page: u32, page_size: u32) -> Result<Self, PaginationError> {
        if page == 0 || page > MAX_PAGE {
            return Err(PaginationError::PageOutOfRange { page });
        }
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(PaginationError::PageSizeOutOfRange { page_size });
        }
        Ok(Self { page, page_size })
    }

    /// Requested one-based page number.
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Requested page size.
    #[must_use]
    pub const fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Number of rows to return (`LIMIT`).
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.page_size
    }

    /// Number of rows to skip (`OFFSET`).
    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.page_size as u64
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}
