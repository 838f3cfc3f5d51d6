use crate::models::MediaItem;
use crate::store::UserOverlay;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Title, original title and year.
    #[default]
    Basic,
    /// Basic fields plus overview, genres and people.
    Enhanced,
}

/// Inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds<T> {
    pub min: T,
    pub max: T,
}

impl<T: PartialOrd + Copy> Bounds<T> {
    pub fn new(min: T, max: T) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: T) -> bool {
        self.min <= value && value <= self.max
    }
}

/// Every populated predicate must hold (AND); multi-value predicates match
/// when any one of their values does (OR).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterDescriptor {
    pub query: Option<String>,
    pub search_mode: SearchMode,
    pub genres: Vec<String>,
    pub years: Option<Bounds<i32>>,
    pub rating: Option<Bounds<f64>>,
    pub runtime_minutes: Option<Bounds<f64>>,
    pub watched: Option<bool>,
    pub favorite: Option<bool>,
    pub studios: Vec<String>,
    pub countries: Vec<String>,
    pub official_ratings: Vec<String>,
}

impl FilterDescriptor {
    pub fn is_empty(&self) -> bool {
        self.normalized_query().is_none()
            && self.genres.is_empty()
            && self.years.is_none()
            && self.rating.is_none()
            && self.runtime_minutes.is_none()
            && self.watched.is_none()
            && self.favorite.is_none()
            && self.studios.is_empty()
            && self.countries.is_empty()
            && self.official_ratings.is_empty()
    }

    /// Lowercased query, or `None` when it is blank.
    fn normalized_query(&self) -> Option<String> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase)
    }

    pub fn matches(&self, item: &MediaItem, overlay: Option<&UserOverlay>) -> bool {
        if let Some(needle) = self.normalized_query() {
            if !matches_text(item, &needle, self.search_mode) {
                return false;
            }
        }

        if !self.genres.is_empty() && !any_ci(&self.genres, item.genres.iter().map(String::as_str)) {
            return false;
        }

        if let Some(years) = self.years {
            if !item.production_year.is_some_and(|y| years.contains(y)) {
                return false;
            }
        }

        if let Some(rating) = self.rating {
            if !item.community_rating.is_some_and(|r| rating.contains(r)) {
                return false;
            }
        }

        if let Some(runtime) = self.runtime_minutes {
            if !item.runtime_minutes().is_some_and(|m| runtime.contains(m)) {
                return false;
            }
        }

        if let Some(watched) = self.watched {
            let local = overlay.is_some_and(|o| o.has_watched(&item.id));
            if (item.is_played() || local) != watched {
                return false;
            }
        }

        if let Some(favorite) = self.favorite {
            let local = overlay.is_some_and(|o| o.is_favorite(&item.id));
            if (item.is_favorite() || local) != favorite {
                return false;
            }
        }

        if !self.studios.is_empty()
            && !any_ci(&self.studios, item.studios.iter().map(|s| s.name.as_str()))
        {
            return false;
        }

        if !self.countries.is_empty()
            && !any_ci(&self.countries, item.production_locations.iter().map(String::as_str))
        {
            return false;
        }

        if !self.official_ratings.is_empty()
            && !any_ci(&self.official_ratings, item.official_rating.as_deref())
        {
            return false;
        }

        true
    }
}

fn any_ci<'a>(wanted: &[String], candidates: impl IntoIterator<Item = &'a str>) -> bool {
    candidates
        .into_iter()
        .any(|c| wanted.iter().any(|w| w.eq_ignore_ascii_case(c)))
}

fn matches_text(item: &MediaItem, needle: &str, mode: SearchMode) -> bool {
    let contains = |haystack: &str| haystack.to_lowercase().contains(needle);

    if contains(item.name.as_str())
        || item.original_title.as_deref().is_some_and(contains)
        || item.production_year.is_some_and(|y| y.to_string().contains(needle))
    {
        return true;
    }

    if mode == SearchMode::Enhanced {
        return item.overview.as_deref().is_some_and(contains)
            || item.genres.iter().any(|g| contains(g.as_str()))
            || item.people.iter().any(|p| contains(p.name.as_str()));
    }

    false
}

/// Keeps the items every predicate accepts, in their original order.
pub fn filter_items<'a>(
    items: &'a [MediaItem],
    descriptor: &FilterDescriptor,
    overlay: Option<&UserOverlay>,
) -> Vec<&'a MediaItem> {
    if descriptor.is_empty() {
        return items.iter().collect();
    }
    items
        .iter()
        .filter(|item| descriptor.matches(item, overlay))
        .collect()
}
