//! Source catalog records as exported by the billing provider.
//!
//! Fields the engine requires are still `Option` here: the loader only checks
//! document shape, and business validation happens where the record is used.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Free-form key/value annotations attached to items and prices.
pub type Metadata = BTreeMap<String, String>;

/// A sellable product in the provider's catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// Category tag, e.g. `service` or `good`.
    #[serde(default, rename = "type")]
    pub kind: Option<String>,

    /// Absent means active; an explicit `null` means inactive.
    #[serde(default = "default_true", deserialize_with = "null_as_inactive")]
    pub active: bool,

    #[serde(default, deserialize_with = "lenient_metadata")]
    pub metadata: Option<Metadata>,
}

/// A pricing record attached to exactly one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    pub id: String,

    /// Owning item identifier in the source account.
    #[serde(default, rename = "product")]
    pub item: Option<String>,

    #[serde(default)]
    pub currency: Option<String>,

    /// Amount in minor currency units.
    #[serde(default)]
    pub unit_amount: Option<i64>,

    #[serde(default, rename = "type")]
    pub billing_mode: Option<BillingMode>,

    #[serde(default)]
    pub recurring: Option<Recurring>,

    #[serde(default)]
    pub nickname: Option<String>,

    /// Absent means active; an explicit `null` means inactive.
    #[serde(default = "default_true", deserialize_with = "null_as_inactive")]
    pub active: bool,

    #[serde(default, deserialize_with = "lenient_metadata")]
    pub metadata: Option<Metadata>,
}

/// Whether a price is charged once or on a cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingMode {
    OneTime,
    Recurring,
}

/// Recurring cadence of a price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recurring {
    #[serde(default)]
    pub interval: Option<Interval>,

    #[serde(default)]
    pub interval_count: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interval {
    Day,
    Week,
    Month,
    Year,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Day => "day",
            Interval::Week => "week",
            Interval::Month => "month",
            Interval::Year => "year",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Price {
    /// Human-readable amount for log lines only, e.g. `19.99 USD`.
    pub fn display_amount(&self) -> String {
        let currency = self.currency.as_deref().unwrap_or("???").to_uppercase();
        match self.unit_amount {
            Some(amount) => format!("{:.2} {}", amount as f64 / 100.0, currency),
            None => format!("? {}", currency),
        }
    }
}

fn default_true() -> bool {
    true
}

fn null_as_inactive<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

/// Metadata values are strings at the provider, but exports sometimes carry
/// numbers or booleans. Other values are stringified; null entries are dropped.
fn lenient_metadata<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Metadata>, D::Error> {
    let raw = Option::<BTreeMap<String, serde_json::Value>>::deserialize(deserializer)?;
    Ok(raw.map(|entries| {
        entries
            .into_iter()
            .filter_map(|(key, value)| match value {
                serde_json::Value::Null => None,
                serde_json::Value::String(s) => Some((key, s)),
                other => Some((key, other.to_string())),
            })
            .collect()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_defaults() {
        let item: Item = serde_json::from_str(r#"{"id": "prod_1", "name": "Widget"}"#).unwrap();
        assert!(item.active);
        assert_eq!(item.kind, None);
        assert_eq!(item.metadata, None);
    }

    #[test]
    fn test_price_from_export() {
        let json = r#"{
            "id": "price_1",
            "object": "price",
            "product": "prod_1",
            "currency": "usd",
            "unit_amount": 1999,
            "type": "recurring",
            "recurring": {"interval": "month", "interval_count": 3, "usage_type": "licensed"},
            "nickname": null,
            "active": false,
            "metadata": {"tier": "pro"}
        }"#;
        let price: Price = serde_json::from_str(json).unwrap();
        assert_eq!(price.item.as_deref(), Some("prod_1"));
        assert_eq!(price.billing_mode, Some(BillingMode::Recurring));
        let recurring = price.recurring.as_ref().unwrap();
        assert_eq!(recurring.interval, Some(Interval::Month));
        assert_eq!(recurring.interval_count, Some(3));
        assert!(!price.active);
        assert_eq!(price.metadata.unwrap().get("tier").map(String::as_str), Some("pro"));
    }

    #[test]
    fn test_null_active_is_inactive() {
        let item: Item = serde_json::from_str(r#"{"id": "prod_1", "active": null}"#).unwrap();
        assert!(!item.active);

        let price: Price = serde_json::from_str(r#"{"id": "price_1", "active": null}"#).unwrap();
        assert!(!price.active);
    }

    #[test]
    fn test_metadata_scalars_are_stringified() {
        let item: Item = serde_json::from_str(
            r#"{"id": "prod_1", "metadata": {"n": 1, "flag": false, "ratio": 0.5, "gone": null, "sku": "W-1"}}"#,
        )
        .unwrap();
        let metadata = item.metadata.unwrap();
        assert_eq!(metadata.get("n").map(String::as_str), Some("1"));
        assert_eq!(metadata.get("flag").map(String::as_str), Some("false"));
        assert_eq!(metadata.get("ratio").map(String::as_str), Some("0.5"));
        assert_eq!(metadata.get("sku").map(String::as_str), Some("W-1"));
        assert!(!metadata.contains_key("gone"));
    }

    #[test]
    fn test_display_amount() {
        let price: Price = serde_json::from_str(
            r#"{"id": "p", "currency": "eur", "unit_amount": 1050}"#,
        )
        .unwrap();
        assert_eq!(price.display_amount(), "10.50 EUR");
    }
}
