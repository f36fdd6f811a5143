//! Search state, listing fetches and pagination for a marketplace listing view.

pub mod config;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod normalize;
pub mod pagination;
pub mod search;
pub mod view;

pub use config::Settings;
pub use error::{FetchError, FetchResult};
pub use fetcher::{CatalogSource, HttpListingSource, ListingSource};
pub use models::{ListingResult, PagedResults};
pub use search::{decode, encode, SearchCriteria};
pub use view::{SearchView, ViewState};
