use crate::error::FetchResult;
use crate::fetcher::traits::ListingSource;
use crate::models::{
    ContractorSeller, ItemCategory, ListingResult, ListingStatus, ListingSummary, PagedResults,
    Price, SaleKind, Seller, UserSeller,
};
use crate::search::{SaleType, SearchCriteria, SortKey};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::cmp::Reverse;
use tracing::{debug, info};

/// In-memory listing catalog that filters, sorts and pages client side
#[derive(Debug, Clone, Default)]
pub struct CatalogSource {
    listings: Vec<ListingResult>,
    categories: Vec<ItemCategory>,
}

impl CatalogSource {
    pub fn new(listings: Vec<ListingResult>, categories: Vec<ItemCategory>) -> Self {
        Self {
            listings,
            categories,
        }
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    /// Run `criteria` against the catalog
    pub fn query(&self, criteria: &SearchCriteria) -> PagedResults {
        let criteria = criteria.clone().normalized();
        let mut matches: Vec<&ListingResult> = self
            .listings
            .iter()
            .filter(|listing| matches_criteria(listing, &criteria))
            .collect();

        sort_listings(&mut matches, criteria.sort_key);

        let total = matches.len() as u64;
        let items = matches
            .into_iter()
            .skip(usize::try_from(criteria.offset()).unwrap_or(usize::MAX))
            .take(criteria.page_size.get() as usize)
            .cloned()
            .collect();

        PagedResults { total, items }
    }

    /// A small fixed catalog for offline runs and demos
    pub fn sample() -> Self {
        info!("📋 Building sample market catalog");

        let base = Utc
            .with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
            .single()
            .unwrap_or_default();

        let user = |name: &str, rating: f64| {
            Seller::User(UserSeller {
                username: name.to_lowercase(),
                display_name: name.to_string(),
                rating: Some(rating),
            })
        };
        let org = |id: &str, name: &str| {
            Seller::Contractor(ContractorSeller {
                spectrum_id: id.to_string(),
                name: name.to_string(),
                rating: Some(4.8),
            })
        };

        let listings = vec![
            unique(
                summary("sample_1", "Arclight Pistol", "Pistol", user("Khuno", 4.9), Price::Fixed { amount: 5_195 }, 3, base),
                SaleKind::Sale,
                None,
            ),
            unique(
                summary("sample_2", "P4-AR Rifle", "Rifle", org("SCMKT", "Market Co"), Price::Fixed { amount: 7_900 }, 10, base - Duration::hours(2)),
                SaleKind::Sale,
                None,
            ),
            unique(
                summary("sample_3", "Pembroke Helmet", "Helmet", user("Vexa", 4.2), Price::Fixed { amount: 12_950 }, 1, base - Duration::hours(5)),
                SaleKind::Auction,
                Some(base + Duration::days(2)),
            ),
            ListingResult::Aggregate {
                summary: summary("sample_4", "Quantanium", "Commodity", org("MINERS", "Deep Core Mining"), Price::range(2_395, 3_495), 3_000, base - Duration::hours(1)),
                seller_count: 4,
            },
            ListingResult::Multiple {
                summary: summary("sample_5", "ORC-mkX Armor Set", "Armor", user("Khuno", 4.9), Price::range(18_000, 24_000), 2, base - Duration::days(1)),
                listing_ids: vec!["sample_5a".into(), "sample_5b".into(), "sample_5c".into()],
            },
            unique(
                ListingSummary {
                    status: Some(ListingStatus::Archived),
                    ..summary("sample_6", "Retired Laser Repeater", "Ship Weapon", org("SCMKT", "Market Co"), Price::Fixed { amount: 40_000 }, 1, base - Duration::days(30))
                },
                SaleKind::Sale,
                None,
            ),
        ];

        let categories = [
            ("Weapon", "Pistol"),
            ("Weapon", "Rifle"),
            ("Armor", "Helmet"),
            ("Armor", "Armor"),
            ("Commodity", "Commodity"),
            ("Ship", "Ship Weapon"),
        ]
        .into_iter()
        .map(|(category, subcategory)| ItemCategory {
            category: category.into(),
            subcategory: subcategory.into(),
        })
        .collect();

        Self::new(listings, categories)
    }
}

#[async_trait]
impl ListingSource for CatalogSource {
    async fn search(&self, criteria: &SearchCriteria) -> FetchResult<PagedResults> {
        let page = self.query(criteria);
        debug!(total = page.total, items = page.items.len(), "Catalog search");
        Ok(page)
    }

    async fn categories(&self) -> FetchResult<Vec<ItemCategory>> {
        Ok(self.categories.clone())
    }

    fn source_name(&self) -> &'static str {
        "Catalog"
    }
}

fn summary(
    id: &str,
    title: &str,
    item_type: &str,
    seller: Seller,
    price: Price,
    quantity: u64,
    timestamp: DateTime<Utc>,
) -> ListingSummary {
    ListingSummary {
        id: id.to_string(),
        title: title.to_string(),
        item_type: Some(item_type.to_string()),
        photo: None,
        seller,
        price,
        quantity,
        timestamp,
        status: Some(ListingStatus::Active),
    }
}

fn unique(
    summary: ListingSummary,
    sale_kind: SaleKind,
    auction_end: Option<DateTime<Utc>>,
) -> ListingResult {
    ListingResult::Unique {
        summary,
        sale_kind,
        auction_end,
    }
}

fn matches_criteria(listing: &ListingResult, criteria: &SearchCriteria) -> bool {
    let summary = listing.summary();

    let sale_type_ok = match criteria.sale_type {
        SaleType::Any => true,
        SaleType::Sale => matches!(
            listing,
            ListingResult::Unique {
                sale_kind: SaleKind::Sale,
                ..
            } | ListingResult::Multiple { .. }
        ),
        SaleType::Aggregate => matches!(listing, ListingResult::Aggregate { .. }),
        SaleType::Auction => listing.is_auction(),
    };

    let item_type_ok = match (&criteria.item_type, &summary.item_type) {
        (None, _) => true,
        (Some(wanted), Some(actual)) => wanted.eq_ignore_ascii_case(actual),
        (Some(_), None) => false,
    };

    let cost_ok = summary.price.ceiling() >= criteria.min_cost
        && criteria
            .max_cost
            .map_or(true, |max| summary.price.floor() <= max);

    // listings without a status are live ones
    let status = summary.status.unwrap_or(ListingStatus::Active);
    let status_ok = criteria.status_filter.is_empty() || criteria.status_filter.contains(&status);

    sale_type_ok
        && item_type_ok
        && cost_ok
        && summary.quantity >= criteria.quantity_available
        && status_ok
        && matches_text(summary, &criteria.query_text)
}

fn matches_text(summary: &ListingSummary, query: &str) -> bool {
    let haystack = format!(
        "{} {}",
        summary.title,
        summary.item_type.as_deref().unwrap_or_default()
    )
    .to_lowercase();
    query
        .split_whitespace()
        .all(|term| haystack.contains(&term.to_lowercase()))
}

fn sort_listings(listings: &mut [&ListingResult], key: SortKey) {
    match key {
        SortKey::Activity | SortKey::DateNew => {
            listings.sort_by_key(|l| (Reverse(l.summary().timestamp), l.id().to_string()))
        }
        SortKey::DateOld => listings.sort_by_key(|l| (l.summary().timestamp, l.id().to_string())),
        SortKey::Title => {
            listings.sort_by_key(|l| (l.title().to_lowercase(), l.id().to_string()))
        }
        SortKey::PriceLow => {
            listings.sort_by_key(|l| (l.summary().price.floor(), l.id().to_string()))
        }
        SortKey::PriceHigh => {
            listings.sort_by_key(|l| (Reverse(l.summary().price.ceiling()), l.id().to_string()))
        }
        SortKey::QuantityLow => {
            listings.sort_by_key(|l| (l.summary().quantity, l.id().to_string()))
        }
        SortKey::QuantityHigh => {
            listings.sort_by_key(|l| (Reverse(l.summary().quantity), l.id().to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::PageSize;
    use std::collections::BTreeSet;

    fn ids(page: &PagedResults) -> Vec<&str> {
        page.items.iter().map(|l| l.id()).collect()
    }

    #[test]
    fn default_search_hides_archived_listings() {
        let catalog = CatalogSource::sample();
        let page = catalog.query(&SearchCriteria::default());
        assert_eq!(page.total, 5);
        assert!(!ids(&page).contains(&"sample_6"));
        // newest first
        assert_eq!(ids(&page)[0], "sample_1");
    }

    #[test]
    fn sale_type_filters_listing_shapes() {
        let catalog = CatalogSource::sample();
        let auctions = catalog.query(&SearchCriteria {
            sale_type: SaleType::Auction,
            ..Default::default()
        });
        assert_eq!(ids(&auctions), vec!["sample_3"]);

        let aggregates = catalog.query(&SearchCriteria {
            sale_type: SaleType::Aggregate,
            ..Default::default()
        });
        assert_eq!(ids(&aggregates), vec!["sample_4"]);
    }

    #[test]
    fn cost_range_overlaps_price_ranges() {
        let catalog = CatalogSource::sample();
        let page = catalog.query(&SearchCriteria {
            min_cost: 3_000,
            max_cost: Some(6_000),
            sort_key: SortKey::PriceLow,
            ..Default::default()
        });
        assert_eq!(ids(&page), vec!["sample_4", "sample_1"]);
    }

    #[test]
    fn query_terms_must_all_match() {
        let catalog = CatalogSource::sample();
        let page = catalog.query(&SearchCriteria {
            query_text: "rifle p4".into(),
            ..Default::default()
        });
        assert_eq!(ids(&page), vec!["sample_2"]);
    }

    #[test]
    fn status_filter_selects_archived() {
        let catalog = CatalogSource::sample();
        let page = catalog.query(&SearchCriteria {
            status_filter: BTreeSet::from([ListingStatus::Archived]),
            ..Default::default()
        });
        assert_eq!(ids(&page), vec!["sample_6"]);
    }

    #[test]
    fn pages_are_cut_by_page_size_and_total_stays_whole() {
        let listings: Vec<ListingResult> = (0..30)
            .map(|i| {
                unique(
                    summary(&format!("item_{i:02}"), "Ammo", "Ammo", Seller::default(), Price::Fixed { amount: i }, 5, Utc::now()),
                    SaleKind::Sale,
                    None,
                )
            })
            .collect();
        let catalog = CatalogSource::new(listings, vec![]);
        let criteria = SearchCriteria {
            page_size: PageSize::Twelve,
            page_index: 2,
            sort_key: SortKey::PriceLow,
            ..Default::default()
        };
        let page = catalog.query(&criteria);
        assert_eq!(page.total, 30);
        assert_eq!(page.items.len(), 6);
        assert_eq!(page.items[0].id(), "item_24");
    }

    #[tokio::test]
    async fn categories_come_from_the_catalog() {
        let catalog = CatalogSource::sample();
        let categories = catalog.categories().await.unwrap();
        assert_eq!(categories.len(), 6);
        assert_eq!(catalog.source_name(), "Catalog");
    }
}
