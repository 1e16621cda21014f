//! Page-number pagination primitives shared by Pulse backend endpoints.
//!
//! Callers validate inbound `page`/`pageSize` values with [`PageRequest::new`],
//! derive `LIMIT`/`OFFSET` from the request, and describe the returned slice
//! with [`PageMetadata::calculate`] once the total record count is known.
//!
//! ```
//! use pagination::{PageMetadata, PageRequest};
//!
//! let request = PageRequest::new(2, 10)?;
//! assert_eq!(request.offset(), 10);
//!
//! let meta = PageMetadata::calculate(101, request);
//! assert_eq!(meta.last_page, 11);
//! # Ok::<(), pagination::PaginationError>(())
//! ```

mod metadata;
mod request;

pub use metadata::{PageMetadata, Paginated};
pub use request::{
    DEFAULT_PAGE, DEFAULT_PAGE_SIZE, MAX_PAGE, MAX_PAGE_SIZE, PageRequest, PaginationError,
};
