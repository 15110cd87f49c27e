//! Request DTOs for the product cache API
//!
//! Query strings of the pass-through routes and bodies of the management
//! routes.

use serde::Deserialize;

use crate::catalog::{CatalogQuery, SortField, SortOrder};
use crate::error::{CacheError, Result};

/// Query for `GET /api/home`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HomeParams {
    #[serde(default)]
    pub page: Option<u32>,
}

impl HomeParams {
    pub fn into_query(self) -> CatalogQuery {
        CatalogQuery::Home {
            page: self.page.unwrap_or(1),
        }
    }
}

/// Query for `GET /api/product` and `GET /api/search/barcode`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BarcodeParams {
    #[serde(default)]
    pub barcode: Option<String>,
}

impl BarcodeParams {
    pub fn into_query(self) -> Result<CatalogQuery> {
        Ok(CatalogQuery::Product {
            barcode: required("barcode", self.barcode)?,
        })
    }
}

/// Query for `GET /api/search/name`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchNameParams {
    #[serde(default)]
    pub search_term: Option<String>,
}

impl SearchNameParams {
    pub fn into_query(self) -> Result<CatalogQuery> {
        Ok(CatalogQuery::SearchName {
            term: required("searchTerm", self.search_term)?,
        })
    }
}

/// Query for `GET /api/search/category`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryParams {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub order: Option<String>,
}

impl CategoryParams {
    pub fn into_query(self) -> Result<CatalogQuery> {
        let sort = match self.sort_by.as_deref() {
            Some(field) => field.parse()?,
            None => SortField::default(),
        };
        let order = match self.order.as_deref() {
            Some(order) => order.parse()?,
            None => SortOrder::default(),
        };
        Ok(CatalogQuery::Category {
            name: required("category", self.category)?,
            sort,
            order,
        })
    }
}

/// Query for `GET /cache/entry`
#[derive(Debug, Clone, Deserialize)]
pub struct EntryParams {
    pub key: String,
}

/// Body of `POST /cache/invalidate`
#[derive(Debug, Clone, Deserialize)]
pub struct InvalidateRequest {
    pub pattern: String,
}

impl InvalidateRequest {
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.pattern.is_empty() {
            return Some("Pattern cannot be empty".to_string());
        }
        None
    }
}

fn required(name: &str, value: Option<String>) -> Result<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| CacheError::InvalidRequest(format!("Missing query parameter '{}'", name)))
}
