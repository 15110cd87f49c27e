//! Product Catalog
//!
//! The queries the product UI issues, each with a fixed cache key shape and
//! TTL tier, served through the [`CachedFetcher`].
//!
//! | Query | Key | Tier |
//! |---|---|---|
//! | home page | `home_products:<page>` | Medium |
//! | product | `product:<barcode>` | Long |
//! | name search | `search_name:<term>` | Medium |
//! | category | `category:<name>:<sort>:<order>` | Medium |
//! | all categories | `categories:all` | VeryLong |

mod payload;
mod sort;

pub use payload::{Category, CategoryIndex, CategoryListing, Payload, Product, ProductDetail, ProductPage};
pub use sort::{sort_products, SortField, SortOrder};

use url::form_urlencoded;

use crate::cache::TtlTier;
use crate::cache_key;
use crate::error::{CacheError, Result};
use crate::fetch::{CachedFetcher, FetchOptions, Upstream};

/// A catalog query, dispatched by [`ProductCatalog::query`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogQuery {
    Home { page: u32 },
    Product { barcode: String },
    SearchName { term: String },
    Category { name: String, sort: SortField, order: SortOrder },
    Categories,
}

#[derive(Debug)]
pub struct ProductCatalog<U> {
    fetcher: CachedFetcher<U>,
}

impl<U: Upstream> ProductCatalog<U> {
    pub fn new(fetcher: CachedFetcher<U>) -> Self {
        Self { fetcher }
    }

    pub fn fetcher(&self) -> &CachedFetcher<U> {
        &self.fetcher
    }

    pub async fn query(&self, query: CatalogQuery) -> Result<Payload> {
        match query {
            CatalogQuery::Home { page } => self.home_page(page).await.map(Payload::from),
            CatalogQuery::Product { barcode } => self.product(&barcode).await.map(Payload::from),
            CatalogQuery::SearchName { term } => self.search_by_name(&term).await.map(Payload::from),
            CatalogQuery::Category { name, sort, order } => {
                self.category(&name, sort, order).await.map(Payload::from)
            }
            CatalogQuery::Categories => self.categories().await.map(Payload::from),
        }
    }

    // == Queries ==
    pub async fn home_page(&self, page: u32) -> Result<ProductPage> {
        let options = options(cache_key!("home_products", page), TtlTier::Medium);
        self.fetcher
            .fetch_as(&format!("products.json?page={}", page), options)
            .await
    }

    pub async fn product(&self, barcode: &str) -> Result<ProductDetail> {
        let options = options(cache_key!("product", barcode), TtlTier::Long);
        let identifier = format!("api/v0/product/{}.json", path_segment(barcode)?);
        self.fetcher.fetch_as(&identifier, options).await
    }

    pub async fn search_by_name(&self, term: &str) -> Result<ProductPage> {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("search_terms", term)
            .append_pair("json", "true")
            .finish();
        let options = options(cache_key!("search_name", term), TtlTier::Medium);
        self.fetcher
            .fetch_as(&format!("cgi/search.pl?{}", query), options)
            .await
    }

    /// Products of category `name`, ordered by `sort`.
    ///
    /// The upstream listing is cached per sort/order combination and sorted
    /// on every read.
    pub async fn category(&self, name: &str, sort: SortField, order: SortOrder) -> Result<CategoryListing> {
        let options = options(cache_key!("category", name, sort, order), TtlTier::Medium);
        let identifier = format!("category/{}.json", path_segment(name)?);
        let mut listing: CategoryListing = self.fetcher.fetch_as(&identifier, options).await?;
        sort_products(&mut listing.products, sort, order);
        Ok(listing)
    }

    pub async fn categories(&self) -> Result<CategoryIndex> {
        let options = options(cache_key!("categories", "all"), TtlTier::VeryLong);
        self.fetcher.fetch_as("categories.json", options).await
    }
}

fn options(key: String, tier: TtlTier) -> FetchOptions {
    FetchOptions::new().key(key).ttl(tier)
}

/// Percent-encodes a single path segment.
fn path_segment(value: &str) -> Result<String> {
    if value.trim().is_empty() {
        return Err(CacheError::InvalidRequest("Path segment cannot be empty".to_string()));
    }
    Ok(form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20"))
}
