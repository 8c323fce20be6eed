//! Wishlist item records produced by one scrape run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Price of a wishlist item as encoded on the page.
///
/// Pages leave the price attribute empty or show a placeholder for
/// out-of-stock and variable-price items, so only values carrying a decimal
/// point are treated as amounts.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Price {
    Amount(f64),
    #[default]
    Unknown,
}

impl Price {
    /// Interpret a raw `data-price` value.
    ///
    /// Returns `None` when the value looks numeric (has a decimal point) but
    /// does not parse, which callers treat as a malformed item.
    pub fn from_raw(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if !raw.contains('.') {
            return Some(Price::Unknown);
        }
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Price::Amount)
    }

    pub fn amount(&self) -> Option<f64> {
        match self {
            Price::Amount(v) => Some(*v),
            Price::Unknown => None,
        }
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Price::Amount(v) => write!(f, "{}", v),
            Price::Unknown => f.write_str("n/a"),
        }
    }
}

/// One row of wishlist history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    /// Capture time of the run; shared by every record of that run.
    pub timestamp: DateTime<Utc>,
    /// Wishlist label parsed from the page.
    pub list_name: String,
    /// 1-based position among the page's item containers.
    pub rank: u32,
    pub item_id: String,
    pub item_name: String,
    pub price: Price,
    pub requested: u32,
    /// Quantity already bought by others; may exceed `requested`.
    pub purchased: u32,
}

impl ItemRecord {
    pub fn is_fulfilled(&self) -> bool {
        self.requested == self.purchased
    }

    /// Storage/report representation of the fulfilled flag.
    pub fn fulfilled_label(&self) -> &'static str {
        if self.is_fulfilled() {
            "YES"
        } else {
            "NO"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(requested: u32, purchased: u32) -> ItemRecord {
        ItemRecord {
            timestamp: Utc::now(),
            list_name: "Classroom".to_string(),
            rank: 1,
            item_id: "I2ABC".to_string(),
            item_name: "Crayons".to_string(),
            price: Price::Unknown,
            requested,
            purchased,
        }
    }

    #[test]
    fn test_price_with_decimal_point() {
        assert_eq!(Price::from_raw("19.99"), Some(Price::Amount(19.99)));
        assert_eq!(Price::from_raw(" 0.5 "), Some(Price::Amount(0.5)));
    }

    #[test]
    fn test_price_without_decimal_point_is_unknown() {
        assert_eq!(Price::from_raw("5"), Some(Price::Unknown));
        assert_eq!(Price::from_raw(""), Some(Price::Unknown));
        assert_eq!(Price::from_raw("-Infinity"), Some(Price::Unknown));
    }

    #[test]
    fn test_price_malformed_decimal() {
        assert_eq!(Price::from_raw("1.2.3"), None);
        assert_eq!(Price::from_raw("$.99x"), None);
    }

    #[test]
    fn test_unknown_price_has_no_amount() {
        assert_eq!(Price::Amount(0.0).amount(), Some(0.0));
        assert_eq!(Price::Amount(12.5).amount(), Some(12.5));
        assert_eq!(Price::Unknown.amount(), None);
    }

    #[test]
    fn test_price_display() {
        assert_eq!(Price::Amount(19.99).to_string(), "19.99");
        assert_eq!(Price::Unknown.to_string(), "n/a");
    }

    #[test]
    fn test_fulfilled_only_when_equal() {
        assert!(record(0, 0).is_fulfilled());
        assert!(record(3, 3).is_fulfilled());
        assert!(!record(3, 1).is_fulfilled());
        assert!(!record(1, 2).is_fulfilled());
        assert_eq!(record(1, 2).fulfilled_label(), "NO");
        assert_eq!(record(2, 2).fulfilled_label(), "YES");
    }
}
