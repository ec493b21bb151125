//! Food listing query builder
//!
//! Turns the optional `search`, `page`/`size` and `filter` parameters of
//! `GET /foods` into one store query. The three axes are independent and
//! any subset may be combined.

use serde::Deserialize;

use crate::database::store::{Filter, FindOptions, Sort};

/// Sort token for cheapest first
pub const LOW_TO_HIGH: &str = "low-to-high";
/// Sort token for most expensive first
pub const HIGH_TO_LOW: &str = "high-to-low";

/// Raw query string of `GET /foods`. Kept as strings so malformed numbers
/// degrade to "no pagination" instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FoodListingParams {
    pub page: Option<String>,
    pub size: Option<String>,
    pub search: Option<String>,
    pub filter: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub skip: u64,
    pub limit: u64,
}

/// A ready-to-run store query
#[derive(Debug, Clone, PartialEq)]
pub struct ListingQuery {
    pub filter: Filter,
    pub options: FindOptions,
}

/// Case-insensitive name filter, or everything when no search was given.
/// Whitespace only decides blankness; the needle is matched as sent.
pub fn search_filter(search: Option<&str>) -> Filter {
    match search {
        Some(needle) if !needle.trim().is_empty() => Filter::contains("name", needle),
        _ => Filter::All,
    }
}

/// Both numbers must parse and `size` must be positive; anything else
/// means the caller gets the whole result set.
pub fn pagination(page: Option<&str>, size: Option<&str>) -> Option<Pagination> {
    let page: u64 = page?.trim().parse().ok()?;
    let size: u64 = size?.trim().parse().ok()?;
    if size == 0 {
        return None;
    }
    let skip = page.checked_mul(size)?;
    Some(Pagination { skip, limit: size })
}

pub fn price_sort(filter: Option<&str>) -> Option<Sort> {
    match filter? {
        LOW_TO_HIGH => Some(Sort::ascending("price")),
        HIGH_TO_LOW => Some(Sort::descending("price")),
        _ => None,
    }
}

impl FoodListingParams {
    pub fn build(&self) -> ListingQuery {
        let mut options = FindOptions {
            sort: price_sort(self.filter.as_deref()),
            ..FindOptions::default()
        };

        if let Some(Pagination { skip, limit }) = pagination(self.page.as_deref(), self.size.as_deref()) {
            options.skip = Some(skip);
            options.limit = Some(limit);
        }

        ListingQuery {
            filter: search_filter(self.search.as_deref()),
            options,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(page: Option<&str>, size: Option<&str>, search: Option<&str>, filter: Option<&str>) -> FoodListingParams {
        FoodListingParams {
            page: page.map(Into::into),
            size: size.map(Into::into),
            search: search.map(Into::into),
            filter: filter.map(Into::into),
        }
    }

    #[test]
    fn no_parameters_means_everything_unsorted() {
        let query = FoodListingParams::default().build();
        assert_eq!(query.filter, Filter::All);
        assert_eq!(query.options, FindOptions::default());
    }

    #[test]
    fn search_builds_name_filter() {
        assert_eq!(search_filter(Some("Rice")), Filter::contains("name", "Rice"));
        assert_eq!(search_filter(Some("   ")), Filter::All);
        assert_eq!(search_filter(Some("rice ")), Filter::contains("name", "rice "));
        assert_eq!(search_filter(None), Filter::All);
    }

    #[test]
    fn pagination_needs_both_numbers() {
        assert_eq!(pagination(Some("2"), Some("10")), Some(Pagination { skip: 20, limit: 10 }));
        assert_eq!(pagination(Some("0"), Some("6")), Some(Pagination { skip: 0, limit: 6 }));
        assert_eq!(pagination(Some("2"), None), None);
        assert_eq!(pagination(None, Some("10")), None);
    }

    #[test]
    fn malformed_pagination_falls_back_to_unpaginated() {
        assert_eq!(pagination(Some("two"), Some("10")), None);
        assert_eq!(pagination(Some("1"), Some("-5")), None);
        assert_eq!(pagination(Some("1"), Some("0")), None);
        assert_eq!(pagination(Some(&u64::MAX.to_string()), Some("2")), None);
    }

    #[test]
    fn only_known_sort_tokens_sort() {
        assert_eq!(price_sort(Some(LOW_TO_HIGH)), Some(Sort::ascending("price")));
        assert_eq!(price_sort(Some(HIGH_TO_LOW)), Some(Sort::descending("price")));
        assert_eq!(price_sort(Some("highToLow")), None);
        assert_eq!(price_sort(None), None);
    }

    #[test]
    fn axes_compose() {
        let query = params(Some("1"), Some("4"), Some("chicken"), Some(HIGH_TO_LOW)).build();
        assert_eq!(query.filter, Filter::contains("name", "chicken"));
        assert_eq!(
            query.options,
            FindOptions { sort: Some(Sort::descending("price")), skip: Some(4), limit: Some(4) }
        );

        let query = params(Some("x"), Some("4"), None, Some(LOW_TO_HIGH)).build();
        assert_eq!(query.filter, Filter::All);
        assert_eq!(query.options, FindOptions { sort: Some(Sort::ascending("price")), skip: None, limit: None });
    }
}
