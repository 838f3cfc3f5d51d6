//! Library state: the fetched list, how it is being viewed, and the user's
//! local overlay of favorites, history and ratings.

mod persist;

pub use persist::{load_state, save_state, PersistedOverlay, PersistedState};

use crate::catalog::Catalog;
use crate::error::{ApiError, ApiResult};
use crate::library::{
    clamp_page, derive_view, total_pages, FilterDescriptor, PageView, Pagination, SortDescriptor,
};
use crate::models::{ItemKind, MediaItem};
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

/// Login state for a media server, persisted between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerSession {
    pub server_url: String,
    pub device_id: String,
    pub access_token: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Grid,
    List,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DisplayPreferences {
    pub page_size: usize,
    pub sort: SortDescriptor,
    pub view_mode: ViewMode,
}

impl Default for DisplayPreferences {
    fn default() -> Self {
        Self {
            page_size: 24,
            sort: SortDescriptor::default(),
            view_mode: ViewMode::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchRecord {
    pub watched_at: DateTime<Utc>,
    /// Fraction watched, `0.0..=1.0`.
    pub progress: f64,
}

/// Local opinion layered over the server's `UserData`. Never merged back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserOverlay {
    favorites: HashSet<String>,
    watch_history: HashMap<String, WatchRecord>,
    ratings: HashMap<String, f32>,
}

impl UserOverlay {
    pub fn is_favorite(&self, item_id: &str) -> bool {
        self.favorites.contains(item_id)
    }

    pub fn set_favorite(&mut self, item_id: &str, favorite: bool) {
        if favorite {
            self.favorites.insert(item_id.to_string());
        } else {
            self.favorites.remove(item_id);
        }
    }

    pub fn favorites(&self) -> impl Iterator<Item = &str> {
        self.favorites.iter().map(String::as_str)
    }

    pub fn has_watched(&self, item_id: &str) -> bool {
        self.watch_history.contains_key(item_id)
    }

    pub fn record_watch(&mut self, item_id: &str, progress: f64) {
        self.watch_history.insert(
            item_id.to_string(),
            WatchRecord {
                watched_at: Utc::now(),
                progress: progress.clamp(0.0, 1.0),
            },
        );
    }

    pub fn forget_watch(&mut self, item_id: &str) -> bool {
        self.watch_history.remove(item_id).is_some()
    }

    pub fn watch_record(&self, item_id: &str) -> Option<&WatchRecord> {
        self.watch_history.get(item_id)
    }

    /// Most recent first.
    pub fn history(&self) -> Vec<(&str, &WatchRecord)> {
        let mut entries: Vec<(&str, &WatchRecord)> = self
            .watch_history
            .iter()
            .map(|(id, record)| (id.as_str(), record))
            .collect();
        entries.sort_by(|a, b| b.1.watched_at.cmp(&a.1.watched_at));
        entries
    }

    pub fn rate(&mut self, item_id: &str, rating: f32) -> ApiResult<()> {
        if !(0.0..=10.0).contains(&rating) {
            return Err(ApiError::InvalidInput(format!(
                "rating must be between 0 and 10, got {}",
                rating
            )));
        }
        self.ratings.insert(item_id.to_string(), rating);
        Ok(())
    }

    pub fn clear_rating(&mut self, item_id: &str) -> bool {
        self.ratings.remove(item_id).is_some()
    }

    pub fn rating(&self, item_id: &str) -> Option<f32> {
        self.ratings.get(item_id).copied()
    }
}

/// Explicit state container for one library list. Passed by `&mut`
/// wherever it is updated.
#[derive(Debug, Clone, Default)]
pub struct LibraryStore {
    items: Vec<MediaItem>,
    filter: FilterDescriptor,
    pagination: Pagination,
    preferences: DisplayPreferences,
    overlay: UserOverlay,
    last_error: Option<String>,
}

impl LibraryStore {
    pub fn new(preferences: DisplayPreferences, overlay: UserOverlay) -> Self {
        Self {
            items: Vec::new(),
            filter: FilterDescriptor::default(),
            pagination: Pagination::new(1, preferences.page_size),
            preferences,
            overlay,
            last_error: None,
        }
    }

    pub fn from_persisted(state: &PersistedState) -> Self {
        Self::new(state.preferences.clone(), state.overlay.clone().into())
    }

    /// Writes the persistable slice of this store into `state`, leaving the
    /// session untouched.
    pub fn persist_into(&self, state: &mut PersistedState) {
        state.preferences = self.preferences.clone();
        state.overlay = PersistedOverlay::from(&self.overlay);
    }

    pub fn items(&self) -> &[MediaItem] {
        &self.items
    }

    pub fn item(&self, item_id: &str) -> Option<&MediaItem> {
        self.items.iter().find(|i| i.id == item_id)
    }

    /// Replaces the list wholesale and pulls the page back into range.
    pub fn set_items(&mut self, items: Vec<MediaItem>) {
        self.items = items;
        let pages = self.total_pages();
        self.pagination.page = clamp_page(self.pagination.page, pages);
    }

    pub fn filter(&self) -> &FilterDescriptor {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: FilterDescriptor) {
        self.filter = filter;
        self.pagination.page = 1;
    }

    pub fn sort(&self) -> SortDescriptor {
        self.preferences.sort
    }

    pub fn set_sort(&mut self, sort: SortDescriptor) {
        self.preferences.sort = sort;
    }

    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        let page_size = page_size.max(1);
        self.preferences.page_size = page_size;
        self.pagination = Pagination::new(1, page_size);
    }

    /// Moves to `page`, clamped to the pages the current filter produces.
    pub fn set_page(&mut self, page: usize) -> usize {
        self.pagination.page = clamp_page(page, self.total_pages());
        self.pagination.page
    }

    pub fn total_pages(&self) -> usize {
        total_pages(self.filtered_count(), self.pagination.page_size)
    }

    pub fn filtered_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| self.filter.matches(item, Some(&self.overlay)))
            .count()
    }

    pub fn view(&self) -> PageView<&MediaItem> {
        derive_view(
            &self.items,
            &self.filter,
            &self.preferences.sort,
            self.pagination,
            Some(&self.overlay),
        )
    }

    pub fn preferences(&self) -> &DisplayPreferences {
        &self.preferences
    }

    pub fn preferences_mut(&mut self) -> &mut DisplayPreferences {
        &mut self.preferences
    }

    pub fn overlay(&self) -> &UserOverlay {
        &self.overlay
    }

    pub fn overlay_mut(&mut self) -> &mut UserOverlay {
        &mut self.overlay
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Fetches the list for `kind` through the catalog and swaps it in.
    pub async fn load(&mut self, catalog: &mut Catalog, kind: ItemKind, refresh: bool) -> ApiResult<()> {
        let result = match kind {
            ItemKind::Series => catalog.series(refresh).await,
            _ => catalog.movies(refresh).await,
        };
        match result {
            Ok(items) => {
                info!("Loaded {} {} items", items.len(), kind.api_name());
                self.set_items(items);
                self.last_error = None;
                Ok(())
            }
            Err(e) => {
                self.last_error = Some(format!("Failed to load library: {}", e));
                Err(e)
            }
        }
    }

    pub fn is_favorite(&self, item_id: &str) -> bool {
        self.overlay.is_favorite(item_id) || self.item(item_id).is_some_and(|i| i.is_favorite())
    }

    fn apply_favorite(&mut self, item_id: &str, favorite: bool) {
        self.overlay.set_favorite(item_id, favorite);
        if let Some(item) = self.items.iter_mut().find(|i| i.id == item_id) {
            item.user_data_mut().is_favorite = favorite;
        }
    }

    /// Flips the favorite flag immediately, then asks the server. On failure
    /// the flip is undone and the message kept in `last_error`.
    pub async fn toggle_favorite(&mut self, catalog: &mut Catalog, item_id: &str) -> ApiResult<bool> {
        let desired = !self.is_favorite(item_id);
        let overlay_before = self.overlay.is_favorite(item_id);
        let item_before = self.item(item_id).map(|i| i.user_data.clone());
        self.apply_favorite(item_id, desired);

        match catalog.set_favorite(item_id, desired).await {
            Ok(user_data) => {
                self.overlay.set_favorite(item_id, user_data.is_favorite);
                if let Some(item) = self.items.iter_mut().find(|i| i.id == item_id) {
                    item.user_data = Some(user_data);
                }
                self.last_error = None;
                Ok(desired)
            }
            Err(e) => {
                warn!("Reverting favorite toggle for {}: {}", item_id, e);
                self.overlay.set_favorite(item_id, overlay_before);
                if let (Some(user_data), Some(item)) =
                    (item_before, self.items.iter_mut().find(|i| i.id == item_id))
                {
                    item.user_data = user_data;
                }
                self.last_error = Some(format!("Failed to update favorite: {}", e));
                Err(e)
            }
        }
    }

    /// Marks an item played on the server and records it in local history.
    pub async fn mark_watched(&mut self, catalog: &mut Catalog, item_id: &str) -> ApiResult<()> {
        match catalog.set_played(item_id, true).await {
            Ok(user_data) => {
                if let Some(item) = self.items.iter_mut().find(|i| i.id == item_id) {
                    item.user_data = Some(user_data);
                }
                self.overlay.record_watch(item_id, 1.0);
                self.last_error = None;
                Ok(())
            }
            Err(e) => {
                self.last_error = Some(format!("Failed to mark as watched: {}", e));
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::{Bounds, SortField, SortOrder};
    use crate::testing::FakeServer;
    use std::sync::Arc;
    use std::time::Duration;

    fn movie(id: &str, year: i32) -> MediaItem {
        MediaItem {
            id: id.to_string(),
            name: format!("Movie {}", id),
            production_year: Some(year),
            kind: Some(ItemKind::Movie),
            ..Default::default()
        }
    }

    fn store_with(count: usize, page_size: usize) -> LibraryStore {
        let mut store = LibraryStore::new(
            DisplayPreferences {
                page_size,
                ..Default::default()
            },
            UserOverlay::default(),
        );
        store.set_items((0..count).map(|i| movie(&i.to_string(), 2000 + i as i32)).collect());
        store
    }

    fn catalog(server: Arc<FakeServer>) -> Catalog {
        Catalog::new(server, Duration::from_secs(60), Duration::from_secs(60))
    }

    #[test]
    fn test_filter_change_resets_page() {
        let mut store = store_with(30, 10);
        assert_eq!(store.set_page(3), 3);
        store.set_filter(FilterDescriptor {
            years: Some(Bounds::new(2000, 2004)),
            ..Default::default()
        });
        assert_eq!(store.pagination().page, 1);
        assert_eq!(store.view().total_count, 5);
    }

    #[test]
    fn test_page_size_change_resets_page() {
        let mut store = store_with(30, 10);
        store.set_page(2);
        store.set_page_size(5);
        assert_eq!(store.pagination(), Pagination::new(1, 5));
        assert_eq!(store.preferences().page_size, 5);
        assert_eq!(store.total_pages(), 6);
    }

    #[test]
    fn test_set_page_clamps() {
        let mut store = store_with(25, 10);
        assert_eq!(store.set_page(99), 3);
        assert_eq!(store.set_page(0), 1);
    }

    #[test]
    fn test_shrinking_list_pulls_page_back() {
        let mut store = store_with(30, 10);
        store.set_page(3);
        store.set_items(vec![movie("only", 2020)]);
        assert_eq!(store.pagination().page, 1);
    }

    #[test]
    fn test_view_uses_sort_preference() {
        let mut store = store_with(3, 10);
        store.set_sort(SortDescriptor::new(SortField::Year, SortOrder::Descending));
        let years: Vec<i32> = store
            .view()
            .items
            .iter()
            .filter_map(|i| i.production_year)
            .collect();
        assert_eq!(years, vec![2002, 2001, 2000]);
    }

    #[test]
    fn test_rating_bounds() {
        let mut overlay = UserOverlay::default();
        assert!(overlay.rate("a", 11.0).is_err());
        overlay.rate("a", 8.0).unwrap();
        assert_eq!(overlay.rating("a"), Some(8.0));
        assert!(overlay.clear_rating("a"));
        assert_eq!(overlay.rating("a"), None);
    }

    #[test]
    fn test_history_is_most_recent_first() {
        let mut overlay = UserOverlay::default();
        overlay.record_watch("old", 0.2);
        std::thread::sleep(Duration::from_millis(5));
        overlay.record_watch("new", 2.0);
        let history = overlay.history();
        assert_eq!(history[0].0, "new");
        assert_eq!(history[0].1.progress, 1.0);
        assert_eq!(history[1].0, "old");
    }

    #[tokio::test]
    async fn test_load_swaps_in_server_list() {
        let server = Arc::new(FakeServer::with_items(vec![movie("a", 1999), movie("b", 2010)]));
        let mut catalog = catalog(server);
        let mut store = store_with(0, 10);
        store.load(&mut catalog, ItemKind::Movie, false).await.unwrap();
        assert_eq!(store.items().len(), 2);
        assert!(store.last_error().is_none());
    }

    #[tokio::test]
    async fn test_toggle_favorite_confirms_with_server() {
        let server = Arc::new(FakeServer::with_items(vec![movie("a", 1999)]));
        let mut catalog = catalog(server.clone());
        let mut store = store_with(0, 10);
        store.load(&mut catalog, ItemKind::Movie, false).await.unwrap();

        assert!(store.toggle_favorite(&mut catalog, "a").await.unwrap());
        assert!(store.is_favorite("a"));
        assert!(store.item("a").unwrap().is_favorite());
        assert_eq!(server.favorite_calls(), vec![("a".to_string(), true)]);

        assert!(!store.toggle_favorite(&mut catalog, "a").await.unwrap());
        assert!(!store.is_favorite("a"));
    }

    #[tokio::test]
    async fn test_toggle_favorite_reverts_on_error() {
        let server = Arc::new(FakeServer::with_items(vec![movie("a", 1999)]));
        let mut catalog = catalog(server.clone());
        let mut store = store_with(0, 10);
        store.load(&mut catalog, ItemKind::Movie, false).await.unwrap();

        server.fail_writes(true);
        let err = store.toggle_favorite(&mut catalog, "a").await.unwrap_err();
        assert_eq!(err.status(), 500);
        assert!(!store.is_favorite("a"));
        assert!(!store.overlay().is_favorite("a"));
        assert!(store.last_error().unwrap().contains("favorite"));
    }

    #[tokio::test]
    async fn test_failed_unfavorite_leaves_overlay_untouched() {
        let mut server_favorite = movie("a", 1999);
        server_favorite.user_data_mut().is_favorite = true;
        let server = Arc::new(FakeServer::with_items(vec![server_favorite]));
        let mut catalog = catalog(server.clone());
        let mut store = store_with(0, 10);
        store.load(&mut catalog, ItemKind::Movie, false).await.unwrap();
        let before = store.item("a").unwrap().user_data.clone();

        server.fail_writes(true);
        assert!(store.toggle_favorite(&mut catalog, "a").await.is_err());
        assert!(!store.overlay().is_favorite("a"));
        assert!(store.is_favorite("a"));
        assert_eq!(store.item("a").unwrap().user_data, before);

        let mut state = PersistedState::default();
        store.persist_into(&mut state);
        assert!(state.overlay.favorites.is_empty());
    }

    #[tokio::test]
    async fn test_mark_watched_records_history() {
        let server = Arc::new(FakeServer::with_items(vec![movie("a", 1999)]));
        let mut catalog = catalog(server);
        let mut store = store_with(0, 10);
        store.load(&mut catalog, ItemKind::Movie, false).await.unwrap();

        store.mark_watched(&mut catalog, "a").await.unwrap();
        assert!(store.item("a").unwrap().is_played());
        assert!(store.overlay().has_watched("a"));
    }
}
