pub mod criteria;
pub mod state;

pub use criteria::{PageSize, SaleType, SearchCriteria, SortKey};
pub use state::{decode, decode_query, encode, encode_query, QueryParams};
