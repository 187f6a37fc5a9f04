//! Lookahead pagination.
//!
//! The upstream query layer is asked for one record more than the page
//! size. Receiving exactly `size + 1` records means a next page exists,
//! with no separate count query.

use serde::Serialize;

/// Paging request handed to the upstream query layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Cursor {
    /// Records to skip.
    pub cursor: Option<usize>,
    /// Records to fetch: page size plus one lookahead record.
    pub take: usize,
}

/// Pagination bookkeeping for one list serialisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub size: usize,
    pub offset: Option<usize>,
    pub offset_next: Option<usize>,
    pub offset_previous: Option<usize>,
}

impl PageWindow {
    /// Compute the window for a list of `len` records fetched with
    /// `size + 1` lookahead starting at `offset`.
    ///
    /// A next offset that does not fit in `usize` means there is no next page.
    pub fn compute(size: usize, offset: Option<usize>, len: usize) -> Self {
        let offset_next = if lookahead_hit(size, len) {
            offset.unwrap_or(0).checked_add(len - 1)
        } else {
            None
        };
        let offset_previous = offset
            .filter(|&o| o > 0)
            .map(|o| o.saturating_sub(size));

        Self {
            size,
            offset,
            offset_next,
            offset_previous,
        }
    }

    pub fn has_next(&self) -> bool {
        self.offset_next.is_some()
    }

    /// Records to keep out of `len`: the lookahead record is dropped.
    pub fn visible_len(&self, len: usize) -> usize {
        if lookahead_hit(self.size, len) {
            self.size
        } else {
            len
        }
    }

    /// Offset carried by the `self` link; only a positive requested offset.
    pub fn self_offset(&self) -> Option<usize> {
        self.offset.filter(|&o| o > 0)
    }
}

/// Exactly one record past the page came back.
fn lookahead_hit(size: usize, len: usize) -> bool {
    size.checked_add(1) == Some(len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookahead_hit_opens_next_page() {
        let window = PageWindow::compute(2, None, 3);
        assert_eq!(window.offset_next, Some(2));
        assert_eq!(window.offset_previous, None);
        assert_eq!(window.visible_len(3), 2);
    }

    #[test]
    fn short_page_has_no_next() {
        let window = PageWindow::compute(25, None, 7);
        assert!(!window.has_next());
        assert_eq!(window.visible_len(7), 7);
    }

    #[test]
    fn offset_produces_previous_page() {
        let window = PageWindow::compute(10, Some(30), 11);
        assert_eq!(window.offset_next, Some(40));
        assert_eq!(window.offset_previous, Some(20));
        assert_eq!(window.self_offset(), Some(30));
    }

    #[test]
    fn previous_offset_saturates_at_zero() {
        let window = PageWindow::compute(10, Some(4), 2);
        assert_eq!(window.offset_previous, Some(0));
    }

    #[test]
    fn zero_offset_has_no_previous() {
        let window = PageWindow::compute(10, Some(0), 2);
        assert_eq!(window.offset_previous, None);
        assert_eq!(window.self_offset(), None);
    }

    #[test]
    fn huge_page_size_never_hits_lookahead() {
        let window = PageWindow::compute(usize::MAX, None, 3);
        assert!(!window.has_next());
        assert_eq!(window.visible_len(3), 3);
    }

    #[test]
    fn unrepresentable_next_offset_closes_the_window() {
        let window = PageWindow::compute(1, Some(usize::MAX), 2);
        assert_eq!(window.offset_next, None);
        assert_eq!(window.visible_len(2), 1);
        assert_eq!(window.offset_previous, Some(usize::MAX - 1));
    }
}
