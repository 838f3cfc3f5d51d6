use crate::cache::{MediaCache, LATEST_MOVIES_KEY, MOVIES_KEY, SERIES_KEY};
use crate::error::ApiResult;
use crate::media_server::{ItemQuery, MediaServer};
use crate::models::{ItemKind, MediaItem, UserData};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// Cached view of the media server's library. A miss or an explicit refresh
/// goes to the server; writes drop the affected details entry.
pub struct Catalog {
    server: Arc<dyn MediaServer>,
    cache: MediaCache,
}

impl Catalog {
    pub fn new(server: Arc<dyn MediaServer>, list_ttl: Duration, details_ttl: Duration) -> Self {
        Self {
            server,
            cache: MediaCache::new(list_ttl, details_ttl),
        }
    }

    pub fn server(&self) -> Arc<dyn MediaServer> {
        Arc::clone(&self.server)
    }

    pub async fn movies(&mut self, refresh: bool) -> ApiResult<Vec<MediaItem>> {
        self.list(MOVIES_KEY, ItemQuery::movies(), refresh).await
    }

    pub async fn series(&mut self, refresh: bool) -> ApiResult<Vec<MediaItem>> {
        self.list(SERIES_KEY, ItemQuery::series(), refresh).await
    }

    #[instrument(skip(self))]
    pub async fn latest_movies(&mut self, limit: usize, refresh: bool) -> ApiResult<Vec<MediaItem>> {
        if !refresh {
            if let Some(items) = self.cache.list(LATEST_MOVIES_KEY) {
                return Ok(items);
            }
        }
        let items = self.server.latest_items(ItemKind::Movie, limit).await?;
        self.cache.store_list(LATEST_MOVIES_KEY, items.clone());
        Ok(items)
    }

    #[instrument(skip(self, query))]
    async fn list(&mut self, key: &str, query: ItemQuery, refresh: bool) -> ApiResult<Vec<MediaItem>> {
        if !refresh {
            if let Some(items) = self.cache.list(key) {
                return Ok(items);
            }
        }
        let response = self.server.list_items(&query).await?;
        debug!("Caching {} items under {}", response.items.len(), key);
        self.cache.store_list(key, response.items.clone());
        Ok(response.items)
    }

    #[instrument(skip(self))]
    pub async fn details(&mut self, item_id: &str, refresh: bool) -> ApiResult<MediaItem> {
        if !refresh {
            if let Some(item) = self.cache.details(item_id) {
                return Ok(item);
            }
        }
        let item = self.server.get_details(item_id).await?;
        self.cache.store_details(item.clone());
        Ok(item)
    }

    pub async fn set_favorite(&mut self, item_id: &str, favorite: bool) -> ApiResult<UserData> {
        let user_data = self.server.set_favorite(item_id, favorite).await?;
        self.cache.invalidate_details(item_id);
        Ok(user_data)
    }

    pub async fn set_played(&mut self, item_id: &str, played: bool) -> ApiResult<UserData> {
        let user_data = self.server.set_played(item_id, played).await?;
        self.cache.invalidate_details(item_id);
        Ok(user_data)
    }

    /// Drops every cached list and details entry.
    pub fn refresh_all(&mut self) {
        self.cache.clear();
    }

    pub fn invalidate_list(&mut self, kind: ItemKind) {
        let key = match kind {
            ItemKind::Series => SERIES_KEY,
            _ => MOVIES_KEY,
        };
        self.cache.invalidate_list(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeServer;

    fn movie(id: &str) -> MediaItem {
        MediaItem {
            id: id.to_string(),
            name: id.to_uppercase(),
            ..Default::default()
        }
    }

    fn catalog(server: Arc<FakeServer>) -> Catalog {
        Catalog::new(server, Duration::from_secs(60), Duration::from_secs(60))
    }

    #[tokio::test]
    async fn test_second_list_call_hits_cache() {
        let server = Arc::new(FakeServer::with_items(vec![movie("a")]));
        let mut catalog = catalog(server.clone());

        catalog.movies(false).await.unwrap();
        catalog.movies(false).await.unwrap();
        assert_eq!(server.list_calls(), 1);

        catalog.movies(true).await.unwrap();
        assert_eq!(server.list_calls(), 2);
    }

    #[tokio::test]
    async fn test_favorite_invalidates_details() {
        let server = Arc::new(FakeServer::with_items(vec![movie("a")]));
        let mut catalog = catalog(server.clone());

        let before = catalog.details("a", false).await.unwrap();
        assert!(!before.is_favorite());
        catalog.set_favorite("a", true).await.unwrap();

        let after = catalog.details("a", false).await.unwrap();
        assert!(after.is_favorite());
        assert_eq!(server.detail_calls(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_list_forces_refetch() {
        let server = Arc::new(FakeServer::with_items(vec![movie("a")]));
        let mut catalog = catalog(server.clone());
        catalog.series(false).await.unwrap();
        catalog.invalidate_list(ItemKind::Series);
        catalog.series(false).await.unwrap();
        assert_eq!(server.list_calls(), 2);

        catalog.refresh_all();
        catalog.latest_movies(5, false).await.unwrap();
        catalog.latest_movies(5, false).await.unwrap();
        assert_eq!(server.latest_calls(), 1);
    }
}
