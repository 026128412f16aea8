//! Pagination ranges and the history request/result pair.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::profile::PlayerProfile;
use crate::selector::{PlayerSelector, ShopSelector};
use crate::trade::LoggedTrade;

/// The slice of matching trades a history query returns.
///
/// A range resolves to concrete row indices only once the total number of
/// matching trades is known; page ranges clamp into the valid page interval
/// rather than running off the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Range {
    /// Explicit row bounds: start inclusive, end exclusive, both 0-based.
    Explicit {
        /// Index of the first returned record.
        start: usize,
        /// Upper index limit (exclusive), greater than `start`.
        end: usize,
    },
    /// A 1-based page of fixed size.
    ///
    /// A page beyond the last valid page is trimmed to the last page.
    Page {
        /// The requested page, starting at 1.
        page: usize,
        /// The number of entries per page, at least 1.
        per_page: usize,
    },
}

impl Range {
    /// Creates an explicit range.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyRange`] unless `end > start`.
    pub const fn explicit(start: usize, end: usize) -> Result<Self, ValidationError> {
        if end <= start {
            return Err(ValidationError::EmptyRange { start, end });
        }
        Ok(Self::Explicit { start, end })
    }

    /// Creates a page range.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NotPositive`] if `page` or `per_page` is
    /// zero.
    pub const fn page(page: usize, per_page: usize) -> Result<Self, ValidationError> {
        if page == 0 {
            return Err(ValidationError::NotPositive("page"));
        }
        if per_page == 0 {
            return Err(ValidationError::NotPositive("entries per page"));
        }
        Ok(Self::Page { page, per_page })
    }

    /// The highest valid page for the given total, at least 1.
    pub const fn max_page(total_entries: usize, per_page: usize) -> usize {
        let pages = total_entries.div_ceil(per_page);
        if pages == 0 { 1 } else { pages }
    }

    /// The index of the first returned record (inclusive, 0-based).
    pub const fn start_index(&self, total_entries: usize) -> usize {
        match *self {
            Self::Explicit { start, .. } => start,
            Self::Page { page, per_page } => {
                (self.actual_page(total_entries, page, per_page) - 1) * per_page
            }
        }
    }

    /// The upper index limit for the last returned record (exclusive).
    pub const fn end_index(&self, total_entries: usize) -> usize {
        match *self {
            Self::Explicit { end, .. } => end,
            Self::Page { page, per_page } => {
                self.actual_page(total_entries, page, per_page) * per_page
            }
        }
    }

    const fn actual_page(&self, total_entries: usize, page: usize, per_page: usize) -> usize {
        let max_page = Self::max_page(total_entries, per_page);
        if page > max_page {
            max_page
        } else if page == 0 {
            1
        } else {
            page
        }
    }
}

/// A request for a slice of the trading history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRequest {
    /// Which trading player(s) to include.
    pub player: PlayerSelector,
    /// Which shop(s) to include.
    pub shop: ShopSelector,
    /// Which slice of the matching trades to return.
    pub range: Range,
}

impl HistoryRequest {
    /// Creates a history request.
    pub const fn new(player: PlayerSelector, shop: ShopSelector, range: Range) -> Self {
        Self {
            player,
            shop,
            range,
        }
    }
}

/// The answer to a [`HistoryRequest`].
///
/// Carries the *total* number of matching trades alongside the returned
/// slice, so callers can compute page bounds without refetching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryResult {
    /// The resolved trading player, if one was requested and found.
    pub trading_player: Option<PlayerProfile>,
    /// The resolved shop owner, if one was requested and found.
    pub owner: Option<PlayerProfile>,
    /// The requested slice of trades, newest first.
    pub trades: Vec<LoggedTrade>,
    /// The total number of trades matching the selectors.
    pub total_trades: usize,
}

impl HistoryResult {
    /// An empty result, used when a requested player or owner is unknown.
    pub const fn empty(
        trading_player: Option<PlayerProfile>,
        owner: Option<PlayerProfile>,
    ) -> Self {
        Self {
            trading_player,
            owner,
            trades: Vec::new(),
            total_trades: 0,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn explicit_range_ignores_total() {
        let range = Range::explicit(10, 25).unwrap();
        assert_eq!(range.start_index(3), 10);
        assert_eq!(range.end_index(3), 25);
    }

    #[test]
    fn explicit_range_must_be_non_empty() {
        assert!(Range::explicit(5, 5).is_err());
        assert!(Range::explicit(7, 3).is_err());
    }

    #[test]
    fn page_range_resolves_indices() {
        let range = Range::page(2, 10).unwrap();
        assert_eq!(range.start_index(35), 10);
        assert_eq!(range.end_index(35), 20);
    }

    #[test]
    fn page_past_the_end_clamps_to_last_page() {
        // 35 entries at 10 per page -> pages 1..=4.
        let range = Range::page(9, 10).unwrap();
        assert_eq!(range.start_index(35), 30);
        assert_eq!(range.end_index(35), 40);

        let last = Range::page(4, 10).unwrap();
        assert_eq!(range.start_index(35), last.start_index(35));
        assert_eq!(range.end_index(35), last.end_index(35));
    }

    #[test]
    fn empty_total_clamps_to_first_page() {
        let range = Range::page(3, 10).unwrap();
        assert_eq!(range.start_index(0), 0);
        assert_eq!(range.end_index(0), 10);
    }

    #[test]
    fn max_page_is_at_least_one() {
        assert_eq!(Range::max_page(0, 10), 1);
        assert_eq!(Range::max_page(10, 10), 1);
        assert_eq!(Range::max_page(11, 10), 2);
    }

    #[test]
    fn last_page_bounds_are_consistent() {
        let total = 35;
        let per_page = 10;
        let last = Range::page(Range::max_page(total, per_page), per_page).unwrap();
        let start = last.start_index(total);
        let end = last.end_index(total);
        assert!(start < total);
        assert!(start + per_page <= end);
    }

    #[test]
    fn zero_page_arguments_rejected() {
        assert!(Range::page(0, 10).is_err());
        assert!(Range::page(1, 0).is_err());
    }
}
