use crate::search::PageSize;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Something that can be scrolled back to a named anchor
pub trait ScrollTarget: Send + Sync {
    fn scroll_to(&self, anchor: &str);
}

/// Scroll target for headless use
#[derive(Debug, Default, Clone, Copy)]
pub struct NoScroll;

impl ScrollTarget for NoScroll {
    fn scroll_to(&self, _anchor: &str) {}
}

/// Number of pages needed for `total` items; at least one so an empty result
/// still has a page 0 to show.
pub fn page_count(total: u64, page_size: PageSize) -> u64 {
    total.div_ceil(page_size.get()).max(1)
}

/// Clamp `index` into `[0, page_count - 1]`
pub fn clamp_page(index: u64, total: u64, page_size: PageSize) -> u64 {
    index.min(page_count(total, page_size) - 1)
}

/// 1-based page numbers for a pagination bar. `None` marks a gap.
///
/// Keeps `edge` pages at each end plus a window of `before` pages ahead of
/// and `after` pages behind `current`.
fn page_links(last: u64, current: u64, edge: u64, before: u64, after: u64) -> Vec<Option<u64>> {
    let window = current.saturating_sub(before)..=current.saturating_add(after);
    let shown = (1..=last).filter(|page| {
        *page <= edge || *page > last.saturating_sub(edge) || window.contains(page)
    });

    let mut links = Vec::new();
    let mut previous = 0;
    for page in shown {
        if page > previous + 1 {
            links.push(None);
        }
        links.push(Some(page));
        previous = page;
    }
    links
}

/// Snapshot of the pagination bar for rendering
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PageBar {
    /// 1-based page number of the current page
    pub page: u64,
    pub pages: Vec<Option<u64>>,
    pub page_size: u64,
    pub total: u64,
}

/// Tracks page and page size for one view and keeps the index in range
pub struct PaginationController {
    page_index: u64,
    page_size: PageSize,
    total: u64,
    anchor: String,
    scroll: Arc<dyn ScrollTarget>,
}

impl PaginationController {
    pub fn new(anchor: impl Into<String>, scroll: Arc<dyn ScrollTarget>) -> Self {
        Self {
            page_index: 0,
            page_size: PageSize::default(),
            total: 0,
            anchor: anchor.into(),
            scroll,
        }
    }

    pub fn page_index(&self) -> u64 {
        self.page_index
    }

    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn page_count(&self) -> u64 {
        page_count(self.total, self.page_size)
    }

    /// Record a freshly loaded page. Returns the index to display, clamped to
    /// what the reported total allows.
    pub fn sync(&mut self, page_index: u64, page_size: PageSize, total: u64) -> u64 {
        self.page_size = page_size;
        self.total = total;
        self.page_index = clamp_page(page_index, total, page_size);
        if self.page_index != page_index {
            debug!(
                requested = page_index,
                shown = self.page_index,
                total,
                "Clamped page index to available pages"
            );
        }
        self.page_index
    }

    /// Move to another page. Scrolls to the anchor and returns the clamped index to fetch.
    pub fn on_page_change(&mut self, new_index: u64) -> u64 {
        self.page_index = clamp_page(new_index, self.total, self.page_size);
        self.scroll.scroll_to(&self.anchor);
        self.page_index
    }

    /// Switch page size. The view returns to the first page.
    pub fn on_page_size_change(&mut self, new_size: PageSize) -> u64 {
        self.page_size = new_size;
        self.page_index = 0;
        self.scroll.scroll_to(&self.anchor);
        self.page_index
    }

    pub fn page_bar(&self) -> PageBar {
        PageBar {
            page: self.page_index + 1,
            pages: page_links(self.page_count(), self.page_index + 1, 2, 2, 4),
            page_size: self.page_size.get(),
            total: self.total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingScroll {
        anchors: Mutex<Vec<String>>,
    }

    impl ScrollTarget for RecordingScroll {
        fn scroll_to(&self, anchor: &str) {
            self.anchors.lock().push(anchor.to_string());
        }
    }

    #[test]
    fn page_count_is_never_zero() {
        assert_eq!(page_count(0, PageSize::FortyEight), 1);
        assert_eq!(page_count(48, PageSize::FortyEight), 1);
        assert_eq!(page_count(49, PageSize::FortyEight), 2);
    }

    #[test]
    fn out_of_range_page_is_clamped_on_sync() {
        let mut controller = PaginationController::new("top", Arc::new(NoScroll));
        assert_eq!(controller.sync(5, PageSize::FortyEight, 10), 0);
        assert_eq!(controller.sync(5, PageSize::Twelve, 100), 5);
        assert_eq!(controller.sync(50, PageSize::Twelve, 100), 8);
    }

    #[test]
    fn page_changes_scroll_to_anchor_and_clamp() {
        let scroll = Arc::new(RecordingScroll::default());
        let mut controller = PaginationController::new("results", scroll.clone());
        controller.sync(0, PageSize::TwentyFour, 60);

        assert_eq!(controller.on_page_change(1), 1);
        assert_eq!(controller.on_page_change(9), 2);
        assert_eq!(controller.on_page_size_change(PageSize::Twelve), 0);
        assert_eq!(*scroll.anchors.lock(), vec!["results", "results", "results"]);
    }

    #[test]
    fn index_in_range_after_any_page_size_change() {
        let mut controller = PaginationController::new("top", Arc::new(NoScroll));
        for total in [0u64, 1, 47, 48, 49, 500] {
            for size in PageSize::ALL {
                controller.sync(1_000, PageSize::Twelve, total);
                let index = controller.on_page_size_change(size);
                assert!(index <= page_count(total, size) - 1);
            }
        }
    }

    #[test]
    fn page_bar_inserts_gaps() {
        let mut controller = PaginationController::new("top", Arc::new(NoScroll));
        controller.sync(9, PageSize::Twelve, 12 * 20);
        let bar = controller.page_bar();
        assert_eq!(bar.page, 10);
        assert_eq!(
            bar.pages,
            vec![
                Some(1), Some(2), None, Some(8), Some(9), Some(10), Some(11), Some(12), Some(13),
                Some(14), None, Some(19), Some(20)
            ]
        );
    }

    #[test]
    fn page_links_merge_touching_windows() {
        assert_eq!(
            page_links(20, 1, 2, 2, 4),
            vec![Some(1), Some(2), Some(3), Some(4), Some(5), None, Some(19), Some(20)]
        );
        assert_eq!(page_links(9, 5, 2, 2, 4), (1..=9).map(Some).collect::<Vec<_>>());
    }

    #[test]
    fn single_page_bar() {
        let controller = PaginationController::new("top", Arc::new(NoScroll));
        assert_eq!(controller.page_bar().pages, vec![Some(1)]);
    }
}
