//! In-memory `MediaServer` for unit tests.

use crate::error::{ApiError, ApiResult};
use crate::media_server::{Dialect, ItemQuery, MediaServer, PlayMethod, PlaybackInfoRequest};
use crate::models::{
    ItemKind, ItemsResponse, MediaItem, MediaSource, PlaybackInfo, PlaybackReport, UserData,
};
use async_trait::async_trait;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub enum Reported {
    Start(PlaybackReport),
    Progress(PlaybackReport),
    Stopped(PlaybackReport),
}

#[derive(Default)]
struct State {
    items: Vec<MediaItem>,
    sources: Vec<MediaSource>,
    fail_writes: bool,
    list_calls: usize,
    detail_calls: usize,
    latest_calls: usize,
    favorite_calls: Vec<(String, bool)>,
    reports: Vec<Reported>,
}

#[derive(Default)]
pub struct FakeServer {
    state: Mutex<State>,
}

impl FakeServer {
    pub fn with_items(items: Vec<MediaItem>) -> Self {
        let server = Self::default();
        server.state.lock().unwrap().items = items;
        server
    }

    pub fn with_sources(self, sources: Vec<MediaSource>) -> Self {
        self.state.lock().unwrap().sources = sources;
        self
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().unwrap().fail_writes = fail;
    }

    pub fn list_calls(&self) -> usize {
        self.state.lock().unwrap().list_calls
    }

    pub fn detail_calls(&self) -> usize {
        self.state.lock().unwrap().detail_calls
    }

    pub fn latest_calls(&self) -> usize {
        self.state.lock().unwrap().latest_calls
    }

    pub fn favorite_calls(&self) -> Vec<(String, bool)> {
        self.state.lock().unwrap().favorite_calls.clone()
    }

    pub fn reports(&self) -> Vec<Reported> {
        self.state.lock().unwrap().reports.clone()
    }

    fn write_failure() -> ApiError {
        ApiError::Http {
            status: 500,
            status_text: "Internal Server Error".to_string(),
            body: String::new(),
        }
    }

    fn update_user_data(&self, item_id: &str, apply: impl FnOnce(&mut UserData)) -> ApiResult<UserData> {
        let mut state = self.state.lock().unwrap();
        if state.fail_writes {
            return Err(Self::write_failure());
        }
        let item = state
            .items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or_else(|| ApiError::Http {
                status: 404,
                status_text: "Not Found".to_string(),
                body: String::new(),
            })?;
        let user_data = item.user_data_mut();
        apply(user_data);
        Ok(user_data.clone())
    }

    fn record(&self, report: Reported) -> ApiResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_writes {
            return Err(Self::write_failure());
        }
        state.reports.push(report);
        Ok(())
    }
}

#[async_trait]
impl MediaServer for FakeServer {
    fn dialect(&self) -> Dialect {
        Dialect::Jellyfin
    }

    async fn list_items(&self, query: &ItemQuery) -> ApiResult<ItemsResponse> {
        let mut state = self.state.lock().unwrap();
        state.list_calls += 1;
        let items: Vec<MediaItem> = state
            .items
            .iter()
            .filter(|i| query.kinds.is_empty() || i.kind.is_none() || i.kind.is_some_and(|k| query.kinds.contains(&k)))
            .cloned()
            .collect();
        Ok(ItemsResponse {
            total_record_count: items.len(),
            items,
        })
    }

    async fn latest_items(&self, _kind: ItemKind, limit: usize) -> ApiResult<Vec<MediaItem>> {
        let mut state = self.state.lock().unwrap();
        state.latest_calls += 1;
        Ok(state.items.iter().take(limit).cloned().collect())
    }

    async fn get_details(&self, item_id: &str) -> ApiResult<MediaItem> {
        let mut state = self.state.lock().unwrap();
        state.detail_calls += 1;
        state
            .items
            .iter()
            .find(|i| i.id == item_id)
            .cloned()
            .ok_or_else(|| ApiError::Http {
                status: 404,
                status_text: "Not Found".to_string(),
                body: String::new(),
            })
    }

    async fn playback_info(
        &self,
        _item_id: &str,
        _request: &PlaybackInfoRequest,
    ) -> ApiResult<PlaybackInfo> {
        let state = self.state.lock().unwrap();
        Ok(PlaybackInfo {
            media_sources: state.sources.clone(),
            play_session_id: Some("session-1".to_string()),
            error_code: None,
        })
    }

    fn stream_url(
        &self,
        item_id: &str,
        source: &MediaSource,
        method: PlayMethod,
        _play_session_id: Option<&str>,
    ) -> ApiResult<String> {
        Ok(format!("fake://{}/{}/{}", item_id, source.id, method.api_name()))
    }

    async fn set_favorite(&self, item_id: &str, favorite: bool) -> ApiResult<UserData> {
        let result = self.update_user_data(item_id, |u| u.is_favorite = favorite);
        if result.is_ok() {
            self.state
                .lock()
                .unwrap()
                .favorite_calls
                .push((item_id.to_string(), favorite));
        }
        result
    }

    async fn set_played(&self, item_id: &str, played: bool) -> ApiResult<UserData> {
        self.update_user_data(item_id, |u| u.played = played)
    }

    async fn report_playback_start(&self, report: &PlaybackReport) -> ApiResult<()> {
        self.record(Reported::Start(report.clone()))
    }

    async fn report_playback_progress(&self, report: &PlaybackReport) -> ApiResult<()> {
        self.record(Reported::Progress(report.clone()))
    }

    async fn report_playback_stopped(&self, report: &PlaybackReport) -> ApiResult<()> {
        self.record(Reported::Stopped(report.clone()))
    }
}
