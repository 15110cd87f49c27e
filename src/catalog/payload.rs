//! Catalog Payloads
//!
//! Typed views over the upstream JSON. Fields the catalog does not model are
//! kept in `extra` so a round-trip through the cache loses nothing.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A product as it appears in listings and detail responses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brands: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nutrition_grades_tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_scans_n: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Product {
    /// First nutrition grade tag without a language prefix, e.g. `"a"`.
    pub fn nutrition_grade(&self) -> Option<&str> {
        self.nutrition_grades_tags
            .first()
            .map(|tag| tag.rsplit(':').next().unwrap_or(tag.as_str()))
    }
}

/// One page of products: the home listing, name search and category results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductPage {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProductPage {
    pub fn page(&self) -> Option<u64> {
        self.extra.get("page").and_then(as_count)
    }

    pub fn page_count(&self) -> Option<u64> {
        self.extra.get("page_count").and_then(as_count)
    }

    pub fn count(&self) -> Option<u64> {
        self.extra.get("count").and_then(as_count)
    }
}

/// Products of one category, sorted by the catalog after retrieval.
pub type CategoryListing = ProductPage;

/// Single-product lookup by barcode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductDetail {
    /// 1 when the product exists, 0 otherwise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<Product>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProductDetail {
    pub fn found(&self) -> bool {
        self.status == Some(1) && self.product.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub products: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Every known category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryIndex {
    #[serde(default)]
    pub tags: Vec<Category>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// == Payload ==
/// Result of any catalog query. Serializes as the bare upstream shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Page(ProductPage),
    Detail(ProductDetail),
    Categories(CategoryIndex),
}

impl From<ProductPage> for Payload {
    fn from(page: ProductPage) -> Self {
        Payload::Page(page)
    }
}

impl From<ProductDetail> for Payload {
    fn from(detail: ProductDetail) -> Self {
        Payload::Detail(detail)
    }
}

impl From<CategoryIndex> for Payload {
    fn from(index: CategoryIndex) -> Self {
        Payload::Categories(index)
    }
}

/// Upstream sends counts as numbers or numeric strings.
fn as_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_product_keeps_unknown_fields() {
        let raw = json!({
            "_id": "737628064502",
            "product_name": "Rice Noodles",
            "nutrition_grades_tags": ["en:c"],
            "nutriments": {"fat": 1.2}
        });

        let product: Product = serde_json::from_value(raw.clone()).unwrap();

        assert_eq!(product.id.as_deref(), Some("737628064502"));
        assert_eq!(product.nutrition_grade(), Some("c"));
        assert_eq!(product.extra["nutriments"], json!({"fat": 1.2}));
        assert_eq!(serde_json::to_value(&product).unwrap(), raw);
    }

    #[test]
    fn test_page_counts_accept_strings() {
        let page: ProductPage = serde_json::from_value(json!({
            "count": 1200,
            "page": "2",
            "page_count": 24,
            "products": []
        }))
        .unwrap();

        assert_eq!(page.page(), Some(2));
        assert_eq!(page.page_count(), Some(24));
        assert_eq!(page.count(), Some(1200));
    }

    #[test]
    fn test_missing_products_defaults_empty() {
        let page: ProductPage = serde_json::from_value(json!({"count": 0})).unwrap();
        assert!(page.products.is_empty());
    }

    #[test]
    fn test_detail_found() {
        let detail: ProductDetail = serde_json::from_value(json!({
            "status": 1,
            "code": "3017620422003",
            "product": {"product_name": "Nutella"}
        }))
        .unwrap();
        assert!(detail.found());

        let missing: ProductDetail =
            serde_json::from_value(json!({"status": 0, "status_verbose": "product not found"})).unwrap();
        assert!(!missing.found());
    }

    #[test]
    fn test_payload_serializes_untagged() {
        let index = CategoryIndex {
            tags: vec![Category {
                name: Some("Snacks".to_string()),
                products: Some(42),
                ..Category::default()
            }],
            extra: Map::new(),
        };

        let value = serde_json::to_value(Payload::from(index)).unwrap();
        assert_eq!(value, json!({"tags": [{"name": "Snacks", "products": 42}]}));
    }
}
