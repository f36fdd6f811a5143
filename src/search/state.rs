//! Mapping between [`SearchCriteria`] and flat query parameters.
//!
//! `decode` never fails: missing keys take their defaults and malformed values
//! are coerced to the field default. `encode` omits every field that equals its
//! default so shared links stay short, and `decode(encode(c))` always equals
//! `c.normalized()`.

use super::criteria::{
    PageSize, SaleType, SearchCriteria, SortKey, DEFAULT_MIN_COST, DEFAULT_PAGE_SIZE,
    DEFAULT_QUANTITY, DEFAULT_SORT, DEFAULT_STATUS,
};
use crate::models::ListingStatus;
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;
use tracing::debug;

/// Flat string-keyed representation of search state
pub type QueryParams = BTreeMap<String, String>;

pub const KEY_SALE_TYPE: &str = "sale_type";
pub const KEY_ITEM_TYPE: &str = "item_type";
pub const KEY_MIN_COST: &str = "min_cost";
pub const KEY_MAX_COST: &str = "max_cost";
pub const KEY_QUANTITY: &str = "quantity";
pub const KEY_QUERY: &str = "query";
pub const KEY_SORT: &str = "sort";
pub const KEY_STATUS: &str = "status";
pub const KEY_PAGE: &str = "page";
pub const KEY_PAGE_SIZE: &str = "page_size";

/// Build criteria from query parameters, filling defaults
pub fn decode(params: &QueryParams) -> SearchCriteria {
    let get = |key: &str| params.get(key).map(String::as_str);

    let sale_type = get(KEY_SALE_TYPE)
        .map(|raw| coerce(KEY_SALE_TYPE, raw, SaleType::parse, SaleType::Any))
        .unwrap_or_default();

    let item_type = get(KEY_ITEM_TYPE)
        .filter(|raw| !raw.trim().is_empty())
        .map(str::to_string);

    let min_cost = get(KEY_MIN_COST)
        .map(|raw| coerce(KEY_MIN_COST, raw, parse_number, DEFAULT_MIN_COST))
        .unwrap_or(DEFAULT_MIN_COST);

    let max_cost = get(KEY_MAX_COST).and_then(|raw| {
        let parsed = parse_number(raw);
        if parsed.is_none() && !raw.is_empty() {
            debug!(key = KEY_MAX_COST, value = raw, "Ignoring malformed search parameter");
        }
        parsed
    });

    let quantity_available = get(KEY_QUANTITY)
        .map(|raw| coerce(KEY_QUANTITY, raw, parse_number, DEFAULT_QUANTITY))
        .unwrap_or(DEFAULT_QUANTITY);

    let query_text = get(KEY_QUERY).unwrap_or_default().to_string();

    let sort_key = get(KEY_SORT)
        .map(|raw| coerce(KEY_SORT, raw, SortKey::parse, DEFAULT_SORT))
        .unwrap_or(DEFAULT_SORT);

    let status_filter = get(KEY_STATUS)
        .map(decode_status)
        .unwrap_or_else(|| BTreeSet::from([DEFAULT_STATUS]));

    let page_index = get(KEY_PAGE)
        .map(|raw| coerce(KEY_PAGE, raw, parse_number, 0))
        .unwrap_or(0);

    let page_size = get(KEY_PAGE_SIZE)
        .map(|raw| {
            coerce(
                KEY_PAGE_SIZE,
                raw,
                |value| parse_number(value).and_then(PageSize::from_value),
                DEFAULT_PAGE_SIZE,
            )
        })
        .unwrap_or(DEFAULT_PAGE_SIZE);

    SearchCriteria {
        sale_type,
        item_type,
        min_cost,
        max_cost,
        quantity_available,
        query_text,
        sort_key,
        status_filter,
        page_index,
        page_size,
    }
    .normalized()
}

/// Minimal query parameters for `criteria`; default-valued fields are left out
pub fn encode(criteria: &SearchCriteria) -> QueryParams {
    let criteria = criteria.clone().normalized();
    let defaults = SearchCriteria::default();
    let mut params = QueryParams::new();

    if criteria.sale_type != defaults.sale_type {
        params.insert(KEY_SALE_TYPE.into(), criteria.sale_type.as_str().into());
    }
    if let Some(item_type) = &criteria.item_type {
        params.insert(KEY_ITEM_TYPE.into(), item_type.clone());
    }
    if criteria.min_cost != defaults.min_cost {
        params.insert(KEY_MIN_COST.into(), criteria.min_cost.to_string());
    }
    if let Some(max_cost) = criteria.max_cost {
        params.insert(KEY_MAX_COST.into(), max_cost.to_string());
    }
    if criteria.quantity_available != defaults.quantity_available {
        params.insert(KEY_QUANTITY.into(), criteria.quantity_available.to_string());
    }
    if !criteria.query_text.is_empty() {
        params.insert(KEY_QUERY.into(), criteria.query_text.clone());
    }
    if criteria.sort_key != defaults.sort_key {
        params.insert(KEY_SORT.into(), criteria.sort_key.as_str().into());
    }
    if criteria.status_filter != defaults.status_filter {
        params.insert(KEY_STATUS.into(), criteria.status_param());
    }
    if criteria.page_index != defaults.page_index {
        params.insert(KEY_PAGE.into(), criteria.page_index.to_string());
    }
    if criteria.page_size != defaults.page_size {
        params.insert(KEY_PAGE_SIZE.into(), criteria.page_size.get().to_string());
    }

    params
}

/// Decode a raw URL query string (without the leading `?`)
pub fn decode_query(query: &str) -> SearchCriteria {
    let query = query.trim_start_matches('?');
    let pairs: Vec<(String, String)> = serde_html_form::from_str(query).unwrap_or_else(|err| {
        debug!(error = %err, "Unreadable query string, using defaults");
        Vec::new()
    });
    // later duplicates win
    decode(&pairs.into_iter().collect())
}

/// Encode criteria as a URL query string (without the leading `?`)
pub fn encode_query(criteria: &SearchCriteria) -> String {
    let params = encode(criteria);
    serde_html_form::to_string(&params).unwrap_or_default()
}

impl SearchCriteria {
    /// Shareable deep link for this search
    pub fn to_url(&self, base: &str) -> String {
        let query = encode_query(self);
        if query.is_empty() {
            base.to_string()
        } else {
            format!("{base}?{query}")
        }
    }

    /// Every parameter spelled out, for requests to the backend
    pub fn to_request_params(&self) -> Vec<(String, String)> {
        let criteria = self.clone().normalized();
        let mut params = vec![
            (KEY_SALE_TYPE.to_string(), criteria.sale_type.as_str().to_string()),
            (KEY_MIN_COST.to_string(), criteria.min_cost.to_string()),
            (KEY_QUANTITY.to_string(), criteria.quantity_available.to_string()),
            (KEY_QUERY.to_string(), criteria.query_text.clone()),
            (KEY_SORT.to_string(), criteria.sort_key.as_str().to_string()),
            (KEY_STATUS.to_string(), criteria.status_param()),
            (KEY_PAGE.to_string(), criteria.page_index.to_string()),
            (KEY_PAGE_SIZE.to_string(), criteria.page_size.get().to_string()),
        ];
        if let Some(item_type) = &criteria.item_type {
            params.push((KEY_ITEM_TYPE.to_string(), item_type.clone()));
        }
        if let Some(max_cost) = criteria.max_cost {
            params.push((KEY_MAX_COST.to_string(), max_cost.to_string()));
        }
        params
    }
}

/// Whole numbers as-is, non-negative decimals rounded the same way listing
/// amounts are (`10.5` -> `11`)
fn parse_number(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    u64::from_str(raw).ok().or_else(|| {
        f64::from_str(raw)
            .ok()
            .filter(|f| f.is_finite() && *f >= 0.0)
            .map(|f| f.round() as u64)
    })
}

fn coerce<T>(key: &str, raw: &str, parse: impl Fn(&str) -> Option<T>, default: T) -> T {
    parse(raw).unwrap_or_else(|| {
        debug!(key, value = raw, "Coercing malformed search parameter to default");
        default
    })
}

fn decode_status(raw: &str) -> BTreeSet<ListingStatus> {
    if raw.trim().is_empty() {
        return BTreeSet::new();
    }
    let parsed: BTreeSet<ListingStatus> = raw.split(',').filter_map(ListingStatus::parse).collect();
    if parsed.is_empty() {
        debug!(key = KEY_STATUS, value = raw, "Coercing malformed search parameter to default");
        BTreeSet::from([DEFAULT_STATUS])
    } else {
        parsed
    }
}
