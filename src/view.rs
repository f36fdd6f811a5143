//! Per-view search state.
//!
//! A [`SearchView`] owns one set of criteria, one pagination controller and one
//! listing source, and publishes its state over a `watch` channel:
//!
//! ```text
//! Idle -> Loading -> Loaded | Failed
//!            ^                  |
//!            +-- any change ----+
//! ```
//!
//! Requests are ticketed. Only the response to the newest ticket is published;
//! anything older is dropped when it arrives, whatever order responses land in.

use crate::config::Settings;
use crate::error::{FetchError, FetchResult};
use crate::fetcher::ListingSource;
use crate::models::{group_categories, PagedResults};
use crate::pagination::{PageBar, PaginationController, ScrollTarget};
use crate::search::{PageSize, SearchCriteria};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// What a search view currently shows
#[derive(Debug, Clone, PartialEq)]
pub enum ViewState {
    Idle,
    Loading {
        request: u64,
        criteria: SearchCriteria,
    },
    Loaded {
        request: u64,
        /// Criteria the page belongs to, with the page index as displayed
        criteria: SearchCriteria,
        results: PagedResults,
        page_bar: PageBar,
    },
    Failed {
        request: u64,
        criteria: SearchCriteria,
        error: FetchError,
    },
}

impl ViewState {
    pub fn is_loading(&self) -> bool {
        matches!(self, ViewState::Loading { .. })
    }

    /// A successful search that matched nothing
    pub fn is_empty_result(&self) -> bool {
        matches!(self, ViewState::Loaded { results, .. } if results.is_empty())
    }

    pub fn results(&self) -> Option<&PagedResults> {
        match self {
            ViewState::Loaded { results, .. } => Some(results),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&FetchError> {
        match self {
            ViewState::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn request(&self) -> Option<u64> {
        match self {
            ViewState::Idle => None,
            ViewState::Loading { request, .. }
            | ViewState::Loaded { request, .. }
            | ViewState::Failed { request, .. } => Some(*request),
        }
    }
}

enum Completion {
    Published(ViewState),
    Stale,
    Refetch(u64, SearchCriteria),
}

/// Search state for a single listing view
pub struct SearchView {
    source: Arc<dyn ListingSource>,
    criteria: Mutex<SearchCriteria>,
    pagination: Mutex<PaginationController>,
    /// Newest request ticket. Locked while publishing so a stale response can
    /// never overwrite a newer one.
    latest: Mutex<u64>,
    state: watch::Sender<ViewState>,
    pending: Mutex<Option<JoinHandle<()>>>,
    debounce: Duration,
}

impl SearchView {
    pub fn new(
        source: Arc<dyn ListingSource>,
        settings: &Settings,
        scroll: Arc<dyn ScrollTarget>,
    ) -> Self {
        Self::with_criteria(source, settings, scroll, SearchCriteria::default())
    }

    /// Start from existing criteria, e.g. ones decoded from a shared link
    pub fn with_criteria(
        source: Arc<dyn ListingSource>,
        settings: &Settings,
        scroll: Arc<dyn ScrollTarget>,
        criteria: SearchCriteria,
    ) -> Self {
        let (state, _) = watch::channel(ViewState::Idle);
        Self {
            source,
            criteria: Mutex::new(criteria.normalized()),
            pagination: Mutex::new(PaginationController::new(
                settings.scroll_anchor.clone(),
                scroll,
            )),
            latest: Mutex::new(0),
            state,
            pending: Mutex::new(None),
            debounce: settings.debounce(),
        }
    }

    pub fn criteria(&self) -> SearchCriteria {
        self.criteria.lock().clone()
    }

    pub fn state(&self) -> ViewState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.state.subscribe()
    }

    /// Shareable link for the current criteria
    pub fn share_url(&self, base: &str) -> String {
        self.criteria().to_url(base)
    }

    pub fn page_bar(&self) -> PageBar {
        self.pagination.lock().page_bar()
    }

    /// Fetch with the current criteria
    pub async fn refresh(&self) -> ViewState {
        let criteria = self.criteria();
        self.fetch(criteria).await
    }

    /// Explicit retry after a failure. There is no automatic retry.
    pub async fn retry(&self) -> ViewState {
        let failure = self.state.borrow().error().cloned();
        if let Some(error) = failure {
            info!(%error, "Retrying failed search");
        }
        self.refresh().await
    }

    /// Replace the criteria and fetch. Filter changes reset the page index.
    pub async fn update(&self, next: SearchCriteria) -> ViewState {
        let criteria = {
            let mut current = self.criteria.lock();
            *current = current.transition(next);
            current.clone()
        };
        self.fetch(criteria).await
    }

    /// Edit the criteria in place and fetch
    pub async fn edit(&self, change: impl FnOnce(&mut SearchCriteria)) -> ViewState {
        let mut next = self.criteria();
        change(&mut next);
        self.update(next).await
    }

    /// Replace the criteria after the debounce period. A newer call made
    /// within the period replaces this one.
    pub fn schedule(self: &Arc<Self>, next: SearchCriteria) {
        // the task must not keep a dropped view alive
        let view = Arc::downgrade(self);
        let delay = self.debounce;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(view) = view.upgrade() else {
                return;
            };
            view.update(next).await;
        });
        if let Some(previous) = self.pending.lock().replace(handle) {
            previous.abort();
        }
    }

    pub async fn on_page_change(&self, new_index: u64) -> ViewState {
        let index = self.pagination.lock().on_page_change(new_index);
        let criteria = {
            let mut current = self.criteria.lock();
            current.page_index = index;
            current.clone()
        };
        self.fetch(criteria).await
    }

    pub async fn on_page_size_change(&self, new_size: PageSize) -> ViewState {
        let index = self.pagination.lock().on_page_size_change(new_size);
        let criteria = {
            let mut current = self.criteria.lock();
            current.page_size = new_size;
            current.page_index = index;
            current.clone()
        };
        self.fetch(criteria).await
    }

    /// Item type options grouped by category
    pub async fn item_type_options(&self) -> FetchResult<BTreeMap<String, Vec<String>>> {
        let categories = self.source.categories().await?;
        Ok(group_categories(&categories))
    }

    async fn fetch(&self, criteria: SearchCriteria) -> ViewState {
        let mut criteria = criteria;
        let mut refetched = false;

        let mut request = self.begin(&criteria);

        loop {
            let outcome = self.source.search(&criteria).await;

            match self.complete(request, &criteria, outcome, !refetched) {
                Completion::Published(state) => return state,
                Completion::Stale => {
                    debug!(request, "Discarding superseded search response");
                    return self.state();
                }
                Completion::Refetch(next, clamped) => {
                    refetched = true;
                    request = next;
                    criteria = clamped;
                }
            }
        }
    }

    fn begin(&self, criteria: &SearchCriteria) -> u64 {
        let mut latest = self.latest.lock();
        self.issue(&mut latest, criteria)
    }

    /// Take the next ticket and publish `Loading`. Callers hold the `latest` lock.
    fn issue(&self, latest: &mut u64, criteria: &SearchCriteria) -> u64 {
        *latest += 1;
        let request = *latest;
        debug!(
            request,
            source = self.source.source_name(),
            page = criteria.page_index,
            "Starting search"
        );
        self.state.send_replace(ViewState::Loading {
            request,
            criteria: criteria.clone(),
        });
        request
    }

    fn complete(
        &self,
        request: u64,
        criteria: &SearchCriteria,
        outcome: FetchResult<PagedResults>,
        may_refetch: bool,
    ) -> Completion {
        let mut latest = self.latest.lock();
        if *latest != request {
            return Completion::Stale;
        }

        let state = match outcome {
            Ok(mut results) => {
                let page_size = criteria.page_size.get() as usize;
                if results.items.len() > page_size {
                    warn!(
                        items = results.items.len(),
                        page_size, "Market sent more items than the page size, truncating"
                    );
                    results.items.truncate(page_size);
                }

                let shown = self.pagination.lock().sync(
                    criteria.page_index,
                    criteria.page_size,
                    results.total,
                );
                let shown_criteria = criteria.with_page(shown);
                {
                    let mut current = self.criteria.lock();
                    if current.same_filters(criteria) {
                        current.page_index = shown;
                    }
                }

                // the requested page is past the end; load the last real page instead
                if shown != criteria.page_index
                    && results.items.is_empty()
                    && results.total > 0
                    && may_refetch
                {
                    // ticket taken before releasing the lock so a newer search stays newer
                    let next = self.issue(&mut latest, &shown_criteria);
                    return Completion::Refetch(next, shown_criteria);
                }

                info!(
                    request,
                    total = results.total,
                    items = results.items.len(),
                    page = shown,
                    "Search loaded"
                );
                ViewState::Loaded {
                    request,
                    criteria: shown_criteria,
                    results,
                    page_bar: self.pagination.lock().page_bar(),
                }
            }
            Err(error) => {
                warn!(request, %error, "Search failed");
                ViewState::Failed {
                    request,
                    criteria: criteria.clone(),
                    error,
                }
            }
        };

        self.state.send_replace(state.clone());
        drop(latest);
        Completion::Published(state)
    }
}

impl Drop for SearchView {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.get_mut().take() {
            pending.abort();
        }
    }
}
