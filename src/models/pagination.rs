// src/models/pagination.rs

use serde::{Deserialize, Serialize};

const MAX_LIMIT: i64 = 100;

/// `?page=&limit=` query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageParams {
    /// Page number, at least 1.
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    /// Page size clamped to 1..=100.
    pub fn limit(&self, default: i64) -> i64 {
        self.limit.unwrap_or(default).clamp(1, MAX_LIMIT)
    }

    /// Rows to skip. Saturates for absurd page numbers so the query just comes back empty.
    pub fn offset(&self, default: i64) -> i64 {
        (self.page() - 1).saturating_mul(self.limit(default))
    }
}

/// Pagination block attached to list responses.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

impl Pagination {
    pub fn new(params: &PageParams, default_limit: i64, total: i64) -> Self {
        let limit = params.limit(default_limit);
        Self {
            page: params.page(),
            limit,
            total,
            pages: (total + limit - 1) / limit,
        }
    }
}
