//! Catalog data model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Physical condition of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    #[default]
    New,
    Used,
    Refurbished,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::New => "new",
            Condition::Used => "used",
            Condition::Refurbished => "refurbished",
        }
    }

    /// Parse a stored condition string. Unknown values read back as `New`,
    /// matching the column default.
    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "used" => Condition::Used,
            "refurbished" => Condition::Refurbished,
            _ => Condition::New,
        }
    }
}

/// A sellable product. Never physically deleted; `active = false` marks a
/// soft delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub category_id: Option<String>,
    pub brand_id: Option<String>,
    /// Joined category name (reads only).
    pub category_name: Option<String>,
    /// Joined brand name (reads only).
    pub brand_name: Option<String>,
    pub price: Decimal,
    pub description: String,
    /// Free-text specification blob; empty means none stored.
    pub specs: String,
    pub condition: Condition,
    pub stock: u32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields accepted when creating or updating a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDraft {
    pub name: String,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub brand_id: Option<String>,
    #[serde(default)]
    pub price: Decimal,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub specs: String,
    #[serde(default)]
    pub condition: Condition,
    #[serde(default)]
    pub stock: u32,
}

/// A product category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A product brand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Brand {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condition_round_trips_through_str() {
        for c in [Condition::New, Condition::Used, Condition::Refurbished] {
            assert_eq!(Condition::from_str_lossy(c.as_str()), c);
        }
    }

    #[test]
    fn unknown_condition_reads_as_new() {
        assert_eq!(Condition::from_str_lossy("novo"), Condition::New);
    }

    #[test]
    fn draft_deserializes_with_defaults() {
        let draft: ProductDraft = serde_json::from_str(r#"{"name":"iPhone 12"}"#).unwrap();
        assert_eq!(draft.name, "iPhone 12");
        assert_eq!(draft.price, Decimal::ZERO);
        assert_eq!(draft.condition, Condition::New);
        assert_eq!(draft.stock, 0);
        assert!(draft.specs.is_empty());
    }
}
