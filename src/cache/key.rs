//! Cache Key Module
//!
//! Deterministic key derivation from a logical prefix and ordered parameters.

use std::fmt::Display;

/// Separator reserved between the prefix and every parameter.
pub const KEY_SEPARATOR: char = ':';

// == Derive Key ==
/// Builds `prefix:param1:param2:...` from the canonical string form of each
/// parameter. Order-sensitive and pure.
///
/// A prefix with no parameters still carries the trailing separator, so
/// `derive_key("categories", &[] as &[&str])` is `"categories:"`.
pub fn derive_key<P: Display>(prefix: &str, params: &[P]) -> String {
    let mut key = String::with_capacity(prefix.len() + 1 + params.len() * 8);
    key.push_str(prefix);
    key.push(KEY_SEPARATOR);

    for (i, param) in params.iter().enumerate() {
        if i > 0 {
            key.push(KEY_SEPARATOR);
        }
        key.push_str(&param.to_string());
    }

    key
}

/// Variadic form of [`derive_key`] for heterogeneous parameters.
///
/// ```
/// use product_cache::cache_key;
/// assert_eq!(cache_key!("category", "snacks", "name", "asc"), "category:snacks:name:asc");
/// assert_eq!(cache_key!("home_products", 3), "home_products:3");
/// ```
#[macro_export]
macro_rules! cache_key {
    ($prefix:expr $(, $param:expr)* $(,)?) => {
        $crate::cache::derive_key(
            $prefix,
            &[$(::std::string::ToString::to_string(&$param)),*] as &[::std::string::String],
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_derive_key_joins_params() {
        assert_eq!(derive_key("home_products", &[1]), "home_products:1");
        assert_eq!(
            derive_key("category", &["snacks", "name", "asc"]),
            "category:snacks:name:asc"
        );
    }

    #[test]
    fn test_derive_key_no_params() {
        let empty: [&str; 0] = [];
        assert_eq!(derive_key("categories", &empty), "categories:");
    }

    #[test]
    fn test_macro_mixes_types() {
        assert_eq!(cache_key!("page", 2, "en", true), "page:2:en:true");
    }

    proptest! {
        #[test]
        fn prop_key_is_deterministic(prefix in "[a-z_]{1,16}", params in prop::collection::vec("[a-z0-9]{0,12}", 0..6)) {
            prop_assert_eq!(derive_key(&prefix, &params), derive_key(&prefix, &params));
        }

        #[test]
        fn prop_key_is_order_sensitive(prefix in "[a-z_]{1,16}", a in "[a-z0-9]{1,12}", b in "[a-z0-9]{1,12}") {
            prop_assume!(a != b);
            prop_assert_ne!(
                derive_key(&prefix, &[a.as_str(), b.as_str()]),
                derive_key(&prefix, &[b.as_str(), a.as_str()])
            );
        }

        #[test]
        fn prop_distinct_params_do_not_collide(
            prefix in "[a-z_]{1,16}",
            left in prop::collection::vec("[a-z0-9]{1,8}", 1..5),
            right in prop::collection::vec("[a-z0-9]{1,8}", 1..5),
        ) {
            prop_assume!(left != right);
            prop_assert_ne!(derive_key(&prefix, &left), derive_key(&prefix, &right));
        }
    }
}
