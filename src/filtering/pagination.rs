use axum::http::header::HeaderMap;
use serde::Serialize;

/// Page size used when a request does not ask for one
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Upper bound on page size accepted by `QueryConfiguration`
pub const MAX_PAGE_SIZE: u64 = 1_000;

/// Row offset of a 1-based page.
#[must_use]
pub fn page_offset(page: u64, page_size: u64) -> u64 {
    page.saturating_sub(1).saturating_mul(page_size)
}

/// One page of results with its pagination metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultPage<T> {
    pub items: Vec<T>,
    /// Total matching rows. Zero when counting failed, see `count_failed`.
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    /// The count query failed and `total` was reported as zero
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub count_failed: bool,
    /// Filter, search or sort fields that were ignored because they did not resolve
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl<T> ResultPage<T> {
    pub fn new(items: Vec<T>, total: u64, page: u64, page_size: u64) -> Self {
        Self {
            items,
            total,
            page,
            page_size,
            count_failed: false,
            warnings: Vec::new(),
        }
    }

    /// `ceil(total / page_size)`, never less than 1
    pub fn page_count(&self) -> u64 {
        if self.page_size == 0 {
            return 1;
        }
        self.total.div_ceil(self.page_size).max(1)
    }

    pub fn has_next(&self) -> bool {
        self.page < self.page_count()
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn offset(&self) -> u64 {
        page_offset(self.page, self.page_size)
    }

    pub fn map<U, F>(self, f: F) -> ResultPage<U>
    where
        F: FnMut(T) -> U,
    {
        ResultPage {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
            count_failed: self.count_failed,
            warnings: self.warnings,
        }
    }
}

/// Sanitize resource name by removing control characters for HTTP headers
fn sanitize_resource_name(name: &str) -> String {
    name.chars().filter(|c| c.is_ascii() && !c.is_ascii_control()).collect()
}

/// Build a `Content-Range` header describing `page`.
///
/// `users 10-19/25` for a page with items, `users */25` for an empty page. The resource
/// name is stripped of non-ASCII and control characters so it cannot inject headers.
#[must_use]
pub fn content_range_headers<T>(page: &ResultPage<T>, resource_name: &str) -> HeaderMap {
    let safe_name = sanitize_resource_name(resource_name);
    let total = page.total;
    let content_range = if page.items.is_empty() {
        format!("{safe_name} */{total}")
    } else {
        let start = page.offset();
        let end = start + page.items.len() as u64 - 1;
        format!("{safe_name} {start}-{end}/{total}")
    };

    let mut headers = HeaderMap::new();
    if let Ok(value) = content_range.parse() {
        headers.insert("Content-Range", value);
    }
    headers
}
