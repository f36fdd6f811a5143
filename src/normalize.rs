//! Conversion of raw market records into [`ListingResult`]s.
//!
//! The page envelope is checked with serde on the way in. Individual records
//! are read leniently: a bad field degrades to a default instead of dropping
//! the whole page.

use crate::models::{
    ContractorSeller, ListingResult, ListingStatus, ListingSummary, PagedResults, Price, SaleKind,
    Seller, UserSeller,
};
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// Search response envelope as sent by the market backend
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPage {
    #[serde(default)]
    pub total: u64,
    #[serde(default, alias = "listings")]
    pub items: Vec<Value>,
}

/// Normalize every record of a page
pub fn normalize_page(raw: RawPage) -> PagedResults {
    let items: Vec<ListingResult> = raw.items.iter().map(normalize_item).collect();
    PagedResults {
        // a backend that under-reports its total still accounts for what it sent
        total: raw.total.max(items.len() as u64),
        items,
    }
}

/// Convert one raw record. Never fails.
pub fn normalize_item(raw: &Value) -> ListingResult {
    let kind = text(raw, &["listing_type", "type"]).unwrap_or_default();
    let summary = read_summary(raw);

    match kind.to_ascii_lowercase().as_str() {
        "aggregate" => {
            let seller_count = number(raw, &["seller_count"])
                .or_else(|| array_len(raw, "listings"))
                .unwrap_or(0);
            ListingResult::Aggregate {
                summary,
                seller_count,
            }
        }
        "multiple" => ListingResult::Multiple {
            summary,
            listing_ids: member_ids(raw),
        },
        other => {
            if other != "unique" {
                debug!(kind = other, id = %summary.id, "Unknown listing type, treating as unique");
            }
            let sale_kind = match text(raw, &["sale_type"]).as_deref() {
                Some("auction") => SaleKind::Auction,
                _ => SaleKind::Sale,
            };
            ListingResult::Unique {
                summary,
                sale_kind,
                auction_end: field(raw, &["auction_end_time", "auction_end"]).and_then(timestamp),
            }
        }
    }
}

fn read_summary(raw: &Value) -> ListingSummary {
    let details = raw.get("details").unwrap_or(&Value::Null);

    let id = text(raw, &["listing_id", "aggregate_id", "multiple_id", "id"]).unwrap_or_default();
    let title = text(raw, &["title"])
        .or_else(|| text(details, &["title"]))
        .unwrap_or_default();
    let item_type = text(raw, &["item_type"])
        .or_else(|| text(details, &["item_type"]))
        .filter(|item| !item.is_empty());
    let photo = text(raw, &["photo"])
        .or_else(|| {
            raw.get("photos")
                .and_then(Value::as_array)
                .and_then(|photos| photos.first())
                .and_then(scalar_text)
        })
        .filter(|url| !url.is_empty());

    ListingSummary {
        id,
        title,
        item_type,
        photo,
        seller: read_seller(raw),
        price: read_price(raw),
        quantity: number(raw, &["quantity_available", "quantity"]).unwrap_or(0),
        timestamp: field(raw, &["timestamp", "date"])
            .and_then(timestamp)
            .unwrap_or_default(),
        status: text(raw, &["status"]).and_then(|status| ListingStatus::parse(&status)),
    }
}

fn read_seller(raw: &Value) -> Seller {
    let contractor = raw.get("contractor_seller").filter(|v| !v.is_null());
    let user = raw.get("user_seller").filter(|v| !v.is_null());

    if contractor.is_some() && user.is_some() {
        debug!("Record names both a user and a contractor seller, keeping the contractor");
    }

    if let Some(org) = contractor {
        return Seller::Contractor(match org {
            Value::Object(_) => ContractorSeller {
                spectrum_id: text(org, &["spectrum_id", "id"]).unwrap_or_default(),
                name: text(org, &["name"]).unwrap_or_default(),
                rating: rating(org),
            },
            other => ContractorSeller {
                spectrum_id: scalar_text(other).unwrap_or_default(),
                ..Default::default()
            },
        });
    }

    match user {
        Some(user @ Value::Object(_)) => Seller::User(UserSeller {
            username: text(user, &["username"]).unwrap_or_default(),
            display_name: text(user, &["display_name"]).unwrap_or_default(),
            rating: rating(user),
        }),
        Some(other) => Seller::User(UserSeller {
            username: scalar_text(other).unwrap_or_default(),
            ..Default::default()
        }),
        None => Seller::default(),
    }
}

fn read_price(raw: &Value) -> Price {
    let min = number(raw, &["minimum_price", "min_price"]);
    let max = number(raw, &["maximum_price", "max_price"]);
    match (min, max) {
        (Some(min), Some(max)) => Price::range(min, max),
        _ => Price::Fixed {
            amount: number(raw, &["price"]).or(min).or(max).unwrap_or(0),
        },
    }
}

fn rating(value: &Value) -> Option<f64> {
    let rating = field(value, &["rating", "avg_rating"])?;
    let parsed = match rating {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.filter(|r| r.is_finite())
}

fn member_ids(raw: &Value) -> Vec<String> {
    raw.get("listings")
        .and_then(Value::as_array)
        .map(|members| {
            members
                .iter()
                .filter_map(|member| match member {
                    Value::Object(_) => text(member, &["listing_id", "id"]),
                    other => scalar_text(other),
                })
                .filter(|id| !id.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn field<'a>(raw: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| raw.get(*key))
        .find(|value| !value.is_null())
}

fn text(raw: &Value, keys: &[&str]) -> Option<String> {
    field(raw, keys).and_then(scalar_text)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn number(raw: &Value, keys: &[&str]) -> Option<u64> {
    match field(raw, keys)? {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(|f| f.round() as u64)
        }),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<u64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite() && *f >= 0.0)
                    .map(|f| f.round() as u64)
            })
        }
        _ => None,
    }
}

fn array_len(raw: &Value, key: &str) -> Option<u64> {
    raw.get(key)
        .and_then(Value::as_array)
        .map(|items| items.len() as u64)
}

fn timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        _ => None,
    }
}
