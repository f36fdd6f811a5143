use crate::models::ListingStatus;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Sort applied when the URL carries none
pub const DEFAULT_SORT: SortKey = SortKey::Activity;
/// Page size applied when the URL carries none or an unsupported one
pub const DEFAULT_PAGE_SIZE: PageSize = PageSize::FortyEight;
/// Minimum quantity a listing must have available
pub const DEFAULT_QUANTITY: u64 = 1;
pub const DEFAULT_MIN_COST: u64 = 0;
pub const DEFAULT_STATUS: ListingStatus = ListingStatus::Active;

/// Which listing shapes a search covers
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SaleType {
    #[default]
    Any,
    Sale,
    Aggregate,
    Auction,
}

impl SaleType {
    const ALL: [SaleType; 4] = [Self::Any, Self::Sale, Self::Aggregate, Self::Auction];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Sale => "sale",
            Self::Aggregate => "aggregate",
            Self::Auction => "auction",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(value.trim()))
    }
}

/// Result ordering
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    #[default]
    Activity,
    Title,
    PriceLow,
    PriceHigh,
    QuantityLow,
    QuantityHigh,
    DateNew,
    DateOld,
}

impl SortKey {
    const ALL: [SortKey; 8] = [
        Self::Activity,
        Self::Title,
        Self::PriceLow,
        Self::PriceHigh,
        Self::QuantityLow,
        Self::QuantityHigh,
        Self::DateNew,
        Self::DateOld,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Activity => "activity",
            Self::Title => "title",
            Self::PriceLow => "price-low",
            Self::PriceHigh => "price-high",
            Self::QuantityLow => "quantity-low",
            Self::QuantityHigh => "quantity-high",
            Self::DateNew => "date-new",
            Self::DateOld => "date-old",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str().eq_ignore_ascii_case(value.trim()))
    }
}

/// Supported page sizes
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(into = "u64", try_from = "u64")]
pub enum PageSize {
    Twelve,
    TwentyFour,
    #[default]
    FortyEight,
    NinetySix,
}

impl PageSize {
    pub const ALL: [PageSize; 4] = [
        Self::Twelve,
        Self::TwentyFour,
        Self::FortyEight,
        Self::NinetySix,
    ];

    pub fn get(self) -> u64 {
        match self {
            Self::Twelve => 12,
            Self::TwentyFour => 24,
            Self::FortyEight => 48,
            Self::NinetySix => 96,
        }
    }

    pub fn from_value(value: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|size| size.get() == value)
    }
}

impl From<PageSize> for u64 {
    fn from(size: PageSize) -> u64 {
        size.get()
    }
}

impl TryFrom<u64> for PageSize {
    type Error = String;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        PageSize::from_value(value).ok_or_else(|| format!("unsupported page size {value}"))
    }
}

/// Every filter, sort and paging choice active in a listing view
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchCriteria {
    pub sale_type: SaleType,
    pub item_type: Option<String>,
    pub min_cost: u64,
    pub max_cost: Option<u64>,
    pub quantity_available: u64,
    pub query_text: String,
    pub sort_key: SortKey,
    pub status_filter: BTreeSet<ListingStatus>,
    pub page_index: u64,
    pub page_size: PageSize,
}

impl Default for SearchCriteria {
    fn default() -> Self {
        Self {
            sale_type: SaleType::Any,
            item_type: None,
            min_cost: DEFAULT_MIN_COST,
            max_cost: None,
            quantity_available: DEFAULT_QUANTITY,
            query_text: String::new(),
            sort_key: DEFAULT_SORT,
            status_filter: BTreeSet::from([DEFAULT_STATUS]),
            page_index: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl SearchCriteria {
    /// Canonical form: blank item type dropped, cost bounds ordered.
    pub fn normalized(mut self) -> Self {
        if self
            .item_type
            .as_deref()
            .map_or(false, |item| item.trim().is_empty())
        {
            self.item_type = None;
        }
        if let Some(max) = self.max_cost {
            if max < self.min_cost {
                self.max_cost = Some(self.min_cost);
                self.min_cost = max;
            }
        }
        self
    }

    /// Apply `next` on top of `self`. Changing anything other than the page
    /// index sends the view back to the first page.
    pub fn transition(&self, next: SearchCriteria) -> SearchCriteria {
        let next = next.normalized();
        if self.same_filters(&next) {
            next
        } else {
            SearchCriteria {
                page_index: 0,
                ..next
            }
        }
    }

    /// True when both criteria differ at most in their page index
    pub fn same_filters(&self, other: &SearchCriteria) -> bool {
        SearchCriteria {
            page_index: 0,
            ..self.clone()
        } == SearchCriteria {
            page_index: 0,
            ..other.clone()
        }
    }

    pub fn with_page(&self, page_index: u64) -> SearchCriteria {
        SearchCriteria {
            page_index,
            ..self.clone()
        }
    }

    /// Offset of the first item on the current page
    pub fn offset(&self) -> u64 {
        self.page_index.saturating_mul(self.page_size.get())
    }

    pub fn status_param(&self) -> String {
        self.status_filter
            .iter()
            .map(|status| status.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_orders_cost_bounds() {
        let criteria = SearchCriteria {
            min_cost: 500,
            max_cost: Some(100),
            item_type: Some("  ".into()),
            ..Default::default()
        }
        .normalized();
        assert_eq!(criteria.min_cost, 100);
        assert_eq!(criteria.max_cost, Some(500));
        assert_eq!(criteria.item_type, None);
    }

    #[test]
    fn transition_resets_page_on_filter_change() {
        let current = SearchCriteria {
            page_index: 4,
            ..Default::default()
        };
        let next = SearchCriteria {
            query_text: "laser".into(),
            ..current.clone()
        };
        assert_eq!(current.transition(next).page_index, 0);
    }

    #[test]
    fn transition_keeps_page_when_only_page_changes() {
        let current = SearchCriteria::default();
        assert_eq!(current.transition(current.with_page(3)).page_index, 3);
    }

    #[test]
    fn page_size_change_resets_page() {
        let current = SearchCriteria {
            page_index: 2,
            ..Default::default()
        };
        let next = SearchCriteria {
            page_size: PageSize::Twelve,
            ..current.clone()
        };
        assert_eq!(current.transition(next).page_index, 0);
    }

    #[test]
    fn page_size_rejects_unsupported_values() {
        assert_eq!(PageSize::from_value(24), Some(PageSize::TwentyFour));
        assert_eq!(PageSize::from_value(50), None);
        assert_eq!(serde_json::to_string(&PageSize::NinetySix).unwrap(), "96");
    }

    #[test]
    fn offset_uses_page_size() {
        let criteria = SearchCriteria {
            page_index: 2,
            page_size: PageSize::TwentyFour,
            ..Default::default()
        };
        assert_eq!(criteria.offset(), 48);
    }
}
