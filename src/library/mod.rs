//! Pure filter, sort and paginate pipeline over an in-memory item list.

mod filter;
mod page;
mod sort;

pub use filter::{filter_items, Bounds, FilterDescriptor, SearchMode};
pub use page::{clamp_page, paginate, total_pages, PageView, Pagination};
pub use sort::{sort_items, SortDescriptor, SortField, SortOrder};

use crate::models::MediaItem;
use crate::store::UserOverlay;
use std::collections::BTreeSet;

/// Filter, then sort, then cut out one page.
pub fn derive_view<'a>(
    items: &'a [MediaItem],
    filter: &FilterDescriptor,
    sort: &SortDescriptor,
    pagination: Pagination,
    overlay: Option<&UserOverlay>,
) -> PageView<&'a MediaItem> {
    let mut matching = filter_items(items, filter, overlay);
    sort_items(&mut matching, sort);
    paginate(&matching, pagination)
}

/// Distinct values present in a list, for building filter choices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Facets {
    pub genres: BTreeSet<String>,
    pub studios: BTreeSet<String>,
    pub years: BTreeSet<i32>,
    pub official_ratings: BTreeSet<String>,
}

pub fn facets(items: &[MediaItem]) -> Facets {
    let mut facets = Facets::default();
    for item in items {
        facets.genres.extend(item.genres.iter().cloned());
        facets
            .studios
            .extend(item.studios.iter().map(|s| s.name.clone()));
        facets.years.extend(item.production_year);
        facets.official_ratings.extend(item.official_rating.clone());
    }
    facets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(title: &str, year: i32, rating: f64) -> MediaItem {
        MediaItem {
            id: title.to_lowercase(),
            name: title.to_string(),
            production_year: Some(year),
            community_rating: Some(rating),
            genres: vec!["Drama".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_view_filters_sorts_and_pages() {
        let items = vec![
            movie("A", 1999, 8.7),
            movie("B", 2010, 8.8),
            movie("C", 2015, 7.1),
            movie("D", 2019, 9.0),
        ];
        let filter = FilterDescriptor {
            years: Some(Bounds::new(2000, 2020)),
            ..Default::default()
        };
        let sort = SortDescriptor::new(SortField::Rating, SortOrder::Descending);
        let view = derive_view(&items, &filter, &sort, Pagination::new(1, 2), None);

        let titles: Vec<&str> = view.items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(titles, vec!["D", "B"]);
        assert_eq!(view.total_count, 3);
        assert_eq!(view.total_pages, 2);
    }

    #[test]
    fn test_facets_are_distinct_and_sorted() {
        let mut b = movie("B", 2010, 8.8);
        b.genres.push("Crime".to_string());
        let items = vec![movie("A", 1999, 8.7), b];
        let facets = facets(&items);
        assert_eq!(
            facets.genres.into_iter().collect::<Vec<_>>(),
            vec!["Crime".to_string(), "Drama".to_string()]
        );
        assert_eq!(facets.years.into_iter().collect::<Vec<_>>(), vec![1999, 2010]);
    }
}
