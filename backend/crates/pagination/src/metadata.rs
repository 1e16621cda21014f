//! Page metadata returned alongside paginated results.

use serde::{Deserialize, Serialize};

use crate::PageRequest;

/// Description of one page within a filtered result set.
///
/// When the result set is empty every field is zero, so clients can detect
/// "no data" without special-casing the page numbers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetadata {
    /// Page the caller asked for.
    pub current_page: u32,
    /// Page size the caller asked for.
    pub page_size: u32,
    /// Always `1` for non-empty results.
    pub first_page: u32,
    /// `ceil(total_records / page_size)`.
    pub last_page: u64,
    /// Size of the full filtered set, not only the returned page.
    pub total_records: u64,
}

impl PageMetadata {
    /// Build metadata for `request` given the size of the filtered set.
    ///
    /// # Examples
    /// ```
    /// use pagination::{PageMetadata, PageRequest};
    ///
    /// let empty = PageMetadata::calculate(0, PageRequest::default());
    /// assert_eq!(empty, PageMetadata::default());
    /// ```
    #[must_use]
    pub const fn calculate(total_records: u64, request: PageRequest) -> Self {
        if total_records == 0 {
            return Self {
                current_page: 0,
                page_size: 0,
                first_page: 0,
                last_page: 0,
                total_records: 0,
            };
        }
        Self {
            current_page: request.page(),
            page_size: request.page_size(),
            first_page: 1,
            last_page: total_records.div_ceil(request.page_size() as u64),
            total_records,
        }
    }
}

/// A page of items together with its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    /// Items on this page.
    pub data: Vec<T>,
    /// Position of this page within the filtered set.
    pub meta: PageMetadata,
}

impl<T> Paginated<T> {
    /// Bundle `data` with metadata derived from `total_records`.
    #[must_use]
    pub const fn new(data: Vec<T>, total_records: u64, request: PageRequest) -> Self {
        Self {
            data,
            meta: PageMetadata::calculate(total_records, request),
        }
    }

    /// An empty page with zeroed metadata.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            data: Vec::new(),
            meta: PageMetadata::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn request(page: u32, size: u32) -> PageRequest {
        PageRequest::new(page, size).expect("valid request")
    }

    #[rstest]
    fn zero_records_yield_zero_metadata() {
        assert_eq!(
            PageMetadata::calculate(0, request(3, 25)),
            PageMetadata::default()
        );
    }

    #[rstest]
    #[case::exact_fit(100, 10, 10)]
    #[case::remainder_adds_page(101, 10, 11)]
    #[case::single_record(1, 100, 1)]
    #[case::fewer_than_page(7, 12, 1)]
    fn last_page_rounds_up(#[case] total: u64, #[case] size: u32, #[case] last: u64) {
        let meta = PageMetadata::calculate(total, request(1, size));
        assert_eq!(meta.last_page, last);
        assert_eq!(meta.first_page, 1);
        assert_eq!(meta.total_records, total);
    }

    #[rstest]
    fn metadata_echoes_requested_page() {
        let meta = PageMetadata::calculate(50, request(4, 5));
        assert_eq!(meta.current_page, 4);
        assert_eq!(meta.page_size, 5);
    }

    #[rstest]
    fn metadata_serialises_camel_case() {
        let meta = PageMetadata::calculate(101, request(2, 10));
        let json = serde_json::to_value(meta).expect("serialise metadata");
        assert_eq!(
            json,
            serde_json::json!({
                "currentPage": 2,
                "pageSize": 10,
                "firstPage": 1,
                "lastPage": 11,
                "totalRecords": 101
            })
        );
    }
}
