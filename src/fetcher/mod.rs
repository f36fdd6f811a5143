pub mod catalog;
pub mod http;
pub mod traits;

pub use catalog::CatalogSource;
pub use http::HttpListingSource;
pub use traits::{ListingSource, SessionProvider, StaticSession};
