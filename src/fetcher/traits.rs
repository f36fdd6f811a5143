use crate::error::FetchResult;
use crate::models::{ItemCategory, PagedResults};
use crate::search::SearchCriteria;
use async_trait::async_trait;

/// Common trait for everything that can answer a market search.
/// The view layer only talks to this, so a live backend and an in-memory
/// catalog are interchangeable.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Fetch one page of listings matching `criteria`
    async fn search(&self, criteria: &SearchCriteria) -> FetchResult<PagedResults>;

    /// Fetch the item taxonomy used for item type options
    async fn categories(&self) -> FetchResult<Vec<ItemCategory>>;

    /// Get the name of the listing source
    fn source_name(&self) -> &'static str;
}

/// Supplies the signed-in user's credentials, if any
pub trait SessionProvider: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

/// Fixed session, typically built from configuration
#[derive(Debug, Clone, Default)]
pub struct StaticSession {
    token: Option<String>,
}

impl StaticSession {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }
}

impl SessionProvider for StaticSession {
    fn bearer_token(&self) -> Option<String> {
        self.token.clone()
    }
}
