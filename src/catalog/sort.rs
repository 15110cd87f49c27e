//! Category Sorting
//!
//! Orders category results after retrieval. Sorting is stable, so products
//! comparing equal keep their upstream order in both directions.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::catalog::Product;
use crate::error::CacheError;

const GRADE_ORDER: [&str; 5] = ["a", "b", "c", "d", "e"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    Name,
    NutritionGrade,
    #[default]
    UniqueScans,
}

impl SortField {
    pub const fn as_str(self) -> &'static str {
        match self {
            SortField::Name => "name",
            SortField::NutritionGrade => "nutrition_grade",
            SortField::UniqueScans => "unique_scans_n",
        }
    }
}

impl FromStr for SortField {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(SortField::Name),
            "nutrition_grade" => Ok(SortField::NutritionGrade),
            "unique_scans_n" => Ok(SortField::UniqueScans),
            other => Err(CacheError::InvalidRequest(format!("Unknown sort field '{}'", other))),
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub const fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(CacheError::InvalidRequest(format!("Unknown sort order '{}'", other))),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position of a product's grade in `a..e`. Missing or unrecognised grades
/// rank as `e`.
fn grade_rank(product: &Product) -> usize {
    product
        .nutrition_grade()
        .and_then(|grade| GRADE_ORDER.iter().position(|g| *g == grade))
        .unwrap_or(GRADE_ORDER.len() - 1)
}

fn compare(a: &Product, b: &Product, field: SortField) -> Ordering {
    match field {
        SortField::Name => {
            let a = a.product_name.as_deref().unwrap_or("");
            let b = b.product_name.as_deref().unwrap_or("");
            a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
        }
        SortField::NutritionGrade => grade_rank(a).cmp(&grade_rank(b)),
        SortField::UniqueScans => a.unique_scans_n.unwrap_or(0).cmp(&b.unique_scans_n.unwrap_or(0)),
    }
}

/// Sorts `products` in place.
pub fn sort_products(products: &mut [Product], field: SortField, order: SortOrder) {
    match order {
        SortOrder::Asc => products.sort_by(|a, b| compare(a, b, field)),
        SortOrder::Desc => products.sort_by(|a, b| compare(b, a, field)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(name: &str, grade: Option<&str>, scans: Option<u64>) -> Product {
        Product {
            product_name: Some(name.to_string()),
            nutrition_grades_tags: grade.map(|g| vec![g.to_string()]).unwrap_or_default(),
            unique_scans_n: scans,
            ..Product::default()
        }
    }

    fn names(products: &[Product]) -> Vec<&str> {
        products
            .iter()
            .map(|p| p.product_name.as_deref().unwrap_or(""))
            .collect()
    }

    #[test]
    fn test_sort_by_name_ignores_case() {
        let mut products = vec![
            product("crackers", None, None),
            product("Apple juice", None, None),
            product("biscuits", None, None),
        ];

        sort_products(&mut products, SortField::Name, SortOrder::Asc);
        assert_eq!(names(&products), vec!["Apple juice", "biscuits", "crackers"]);

        sort_products(&mut products, SortField::Name, SortOrder::Desc);
        assert_eq!(names(&products), vec!["crackers", "biscuits", "Apple juice"]);
    }

    #[test]
    fn test_sort_by_grade_missing_ranks_as_e() {
        let mut products = vec![
            product("none", None, None),
            product("d", Some("d"), None),
            product("a", Some("en:a"), None),
            product("e", Some("e"), None),
        ];

        sort_products(&mut products, SortField::NutritionGrade, SortOrder::Asc);

        assert_eq!(names(&products), vec!["a", "d", "none", "e"]);
    }

    #[test]
    fn test_sort_by_scans_missing_is_zero() {
        let mut products = vec![
            product("popular", None, Some(900)),
            product("unknown", None, None),
            product("niche", None, Some(3)),
        ];

        sort_products(&mut products, SortField::UniqueScans, SortOrder::Desc);

        assert_eq!(names(&products), vec!["popular", "niche", "unknown"]);
    }

    #[test]
    fn test_parse_sort_params() {
        assert_eq!("nutrition_grade".parse::<SortField>().unwrap(), SortField::NutritionGrade);
        assert_eq!("desc".parse::<SortOrder>().unwrap(), SortOrder::Desc);
        assert!("price".parse::<SortField>().is_err());
        assert!("sideways".parse::<SortOrder>().is_err());
        assert_eq!(SortField::default().to_string(), "unique_scans_n");
        assert_eq!(SortOrder::default().to_string(), "asc");
    }
}
