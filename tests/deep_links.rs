use market_scout::fetcher::CatalogSource;
use market_scout::models::ListingStatus;
use market_scout::pagination::NoScroll;
use market_scout::search::{
    decode, decode_query, encode, encode_query, PageSize, QueryParams, SaleType, SearchCriteria,
    SortKey,
};
use market_scout::{SearchView, Settings};
use std::collections::BTreeSet;
use std::sync::Arc;

#[test]
fn empty_link_decodes_to_documented_defaults() {
    let criteria = decode(&QueryParams::new());
    assert_eq!(
        criteria,
        SearchCriteria {
            sale_type: SaleType::Any,
            item_type: None,
            min_cost: 0,
            max_cost: None,
            quantity_available: 1,
            query_text: String::new(),
            sort_key: SortKey::Activity,
            status_filter: BTreeSet::from([ListingStatus::Active]),
            page_index: 0,
            page_size: PageSize::FortyEight,
        }
    );
}

#[test]
fn links_only_carry_non_default_fields() {
    let criteria = SearchCriteria {
        query_text: "laser".into(),
        ..Default::default()
    };
    let params = encode(&criteria);
    assert_eq!(params.len(), 1);
    assert_eq!(params["query"], "laser");
    assert_eq!(encode_query(&criteria), "query=laser");
}

#[test]
fn hand_edited_links_are_forgiving() {
    let criteria = decode_query("?page_size=1000&min_cost=abc&max_cost=50&sort=PRICE-LOW&status=archived,bogus");
    assert_eq!(criteria.page_size, PageSize::FortyEight);
    assert_eq!(criteria.min_cost, 0);
    assert_eq!(criteria.max_cost, Some(50));
    assert_eq!(criteria.sort_key, SortKey::PriceLow);
    assert_eq!(criteria.status_filter, BTreeSet::from([ListingStatus::Archived]));
}

#[test]
fn encoding_is_idempotent() {
    let criteria = SearchCriteria {
        sale_type: SaleType::Sale,
        item_type: Some("Rifle".into()),
        max_cost: Some(10_000),
        query_text: "p4 ar".into(),
        page_index: 1,
        page_size: PageSize::TwentyFour,
        ..Default::default()
    };
    let once = encode_query(&criteria);
    let twice = encode_query(&decode_query(&once));
    assert_eq!(once, twice);
}

#[tokio::test]
async fn shared_link_reproduces_the_same_page() {
    let link = "sale_type=sale&sort=price-high&page_size=12";
    let view = SearchView::with_criteria(
        Arc::new(CatalogSource::sample()),
        &Settings::default(),
        Arc::new(NoScroll),
        decode_query(link),
    );

    let state = view.refresh().await;
    let ids: Vec<&str> = state
        .results()
        .map(|r| r.items.iter().map(|l| l.id()).collect())
        .unwrap_or_default();
    assert_eq!(ids, vec!["sample_5", "sample_2", "sample_1"]);

    let shared = view.share_url("/market");
    assert_eq!(shared, "/market?page_size=12&sale_type=sale&sort=price-high");
}
