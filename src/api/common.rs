//! Common API utilities and shared types

use serde::Deserialize;

/// Default page size for list endpoints
pub fn default_limit() -> i64 {
    20
}

fn default_offset() -> i64 {
    0
}

/// Limit/offset pagination query parameters
#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default = "default_offset")]
    pub offset: i64,
}

impl PaginationQuery {
    /// Clamp the limit to a sane range so a client cannot request the
    /// whole table in one page.
    pub fn clamped(&self) -> (i64, i64) {
        (self.limit.clamp(1, 100), self.offset.max(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamped_bounds() {
        let q = PaginationQuery {
            limit: 0,
            offset: -5,
        };
        assert_eq!(q.clamped(), (1, 0));

        let q = PaginationQuery {
            limit: 5000,
            offset: 40,
        };
        assert_eq!(q.clamped(), (100, 40));

        let q = PaginationQuery {
            limit: 20,
            offset: 0,
        };
        assert_eq!(q.clamped(), (20, 0));
    }
}
