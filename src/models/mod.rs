use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lifecycle status of a listing
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    Active,
    Inactive,
    Archived,
}

impl ListingStatus {
    pub const ALL: [ListingStatus; 3] = [Self::Active, Self::Inactive, Self::Archived];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Archived => "archived",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(value.trim()))
    }
}

/// An individual user selling on the market
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserSeller {
    pub username: String,
    pub display_name: String,
    pub rating: Option<f64>,
}

/// An organization selling on the market
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ContractorSeller {
    pub spectrum_id: String,
    pub name: String,
    pub rating: Option<f64>,
}

/// Who owns a listing. A listing is owned by a user or by a contractor, never both.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Seller {
    User(UserSeller),
    Contractor(ContractorSeller),
}

impl Seller {
    /// Name shown on listing cards
    pub fn display_name(&self) -> &str {
        match self {
            Seller::User(user) if !user.display_name.is_empty() => &user.display_name,
            Seller::User(user) => &user.username,
            Seller::Contractor(org) if !org.name.is_empty() => &org.name,
            Seller::Contractor(org) => &org.spectrum_id,
        }
    }

    pub fn rating(&self) -> Option<f64> {
        match self {
            Seller::User(user) => user.rating,
            Seller::Contractor(org) => org.rating,
        }
    }
}

impl Default for Seller {
    fn default() -> Self {
        Seller::User(UserSeller::default())
    }
}

/// Price of a listing, either a single amount or the span across several offers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Price {
    Fixed { amount: u64 },
    Range { min: u64, max: u64 },
}

impl Price {
    /// Build a range, collapsing to a fixed price when both ends match
    pub fn range(a: u64, b: u64) -> Self {
        let (min, max) = if a <= b { (a, b) } else { (b, a) };
        if min == max {
            Price::Fixed { amount: min }
        } else {
            Price::Range { min, max }
        }
    }

    /// Lowest amount a buyer could pay
    pub fn floor(&self) -> u64 {
        match *self {
            Price::Fixed { amount } => amount,
            Price::Range { min, .. } => min,
        }
    }

    pub fn ceiling(&self) -> u64 {
        match *self {
            Price::Fixed { amount } => amount,
            Price::Range { max, .. } => max,
        }
    }
}

impl Default for Price {
    fn default() -> Self {
        Price::Fixed { amount: 0 }
    }
}

/// How a unique listing is sold
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SaleKind {
    #[default]
    Sale,
    Auction,
}

/// Fields shared by every listing shape, ready for display
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ListingSummary {
    pub id: String,
    pub title: String,
    pub item_type: Option<String>,
    pub photo: Option<String>,
    pub seller: Seller,
    pub price: Price,
    pub quantity: u64,
    pub timestamp: DateTime<Utc>,
    pub status: Option<ListingStatus>,
}

/// A single search result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ListingResult {
    /// One item offered by one seller
    Unique {
        #[serde(flatten)]
        summary: ListingSummary,
        sale_kind: SaleKind,
        auction_end: Option<DateTime<Utc>>,
    },
    /// Combined availability of a commodity across sellers
    Aggregate {
        #[serde(flatten)]
        summary: ListingSummary,
        seller_count: u64,
    },
    /// Several unique listings sold under one detail page
    Multiple {
        #[serde(flatten)]
        summary: ListingSummary,
        listing_ids: Vec<String>,
    },
}

impl ListingResult {
    pub fn summary(&self) -> &ListingSummary {
        match self {
            ListingResult::Unique { summary, .. }
            | ListingResult::Aggregate { summary, .. }
            | ListingResult::Multiple { summary, .. } => summary,
        }
    }

    pub fn id(&self) -> &str {
        &self.summary().id
    }

    pub fn title(&self) -> &str {
        &self.summary().title
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            ListingResult::Unique { .. } => "unique",
            ListingResult::Aggregate { .. } => "aggregate",
            ListingResult::Multiple { .. } => "multiple",
        }
    }

    pub fn is_auction(&self) -> bool {
        matches!(
            self,
            ListingResult::Unique {
                sale_kind: SaleKind::Auction,
                ..
            }
        )
    }
}

/// One page of search results. `total` counts every match, not just this page.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PagedResults {
    pub total: u64,
    pub items: Vec<ListingResult>,
}

impl PagedResults {
    pub fn is_empty(&self) -> bool {
        self.total == 0 && self.items.is_empty()
    }
}

/// Entry in the item taxonomy used for item type options
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct ItemCategory {
    pub category: String,
    pub subcategory: String,
}

/// Group taxonomy entries into category -> sorted, de-duplicated subcategories
pub fn group_categories(entries: &[ItemCategory]) -> BTreeMap<String, Vec<String>> {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for entry in entries {
        let subs = grouped.entry(entry.category.clone()).or_default();
        if !entry.subcategory.is_empty() && !subs.contains(&entry.subcategory) {
            subs.push(entry.subcategory.clone());
        }
    }
    for subs in grouped.values_mut() {
        subs.sort();
    }
    grouped
}
