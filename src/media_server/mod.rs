//! Jellyfin and Emby behind one capability trait.

mod client;

pub use client::{Dialect, EmbyCompatClient};

use crate::config::MediaServerConfig;
use crate::error::ApiResult;
use crate::http::HttpClient;
use crate::models::{
    ItemKind, ItemsResponse, MediaItem, MediaSource, PlaybackInfo, PlaybackReport, UserData,
};
use crate::store::ServerSession;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Fields requested on list/detail calls beyond the server defaults.
pub const DEFAULT_FIELDS: &[&str] = &[
    "Overview",
    "Genres",
    "Studios",
    "People",
    "ProductionLocations",
    "OriginalTitle",
    "SortName",
    "DateCreated",
    "PremiereDate",
    "OfficialRating",
    "CriticRating",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayMethod {
    DirectPlay,
    DirectStream,
    Transcode,
}

impl PlayMethod {
    pub fn api_name(&self) -> &'static str {
        match self {
            PlayMethod::DirectPlay => "DirectPlay",
            PlayMethod::DirectStream => "DirectStream",
            PlayMethod::Transcode => "Transcode",
        }
    }
}

/// Request body for the playback negotiation call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlaybackInfoRequest {
    pub user_id: Option<String>,
    pub max_streaming_bitrate: u64,
    pub start_time_ticks: i64,
    pub enable_direct_play: bool,
    pub enable_direct_stream: bool,
    pub enable_transcoding: bool,
    pub auto_open_live_stream: bool,
}

/// Query for item list endpoints. Only set fields are sent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemQuery {
    pub kinds: Vec<ItemKind>,
    pub recursive: bool,
    pub search_term: Option<String>,
    pub sort_by: Option<String>,
    pub descending: bool,
    pub start_index: Option<usize>,
    pub limit: Option<usize>,
    pub is_favorite: Option<bool>,
    pub parent_id: Option<String>,
}

impl ItemQuery {
    pub fn of_kind(kind: ItemKind) -> Self {
        Self {
            kinds: vec![kind],
            recursive: true,
            sort_by: Some("SortName".to_string()),
            ..Default::default()
        }
    }

    pub fn movies() -> Self {
        Self::of_kind(ItemKind::Movie)
    }

    pub fn series() -> Self {
        Self::of_kind(ItemKind::Series)
    }

    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if !self.kinds.is_empty() {
            let kinds: Vec<&str> = self.kinds.iter().map(|k| k.api_name()).collect();
            params.push(("IncludeItemTypes".to_string(), kinds.join(",")));
        }
        if self.recursive {
            params.push(("Recursive".to_string(), "true".to_string()));
        }
        if let Some(term) = self.search_term.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            params.push(("SearchTerm".to_string(), term.to_string()));
        }
        if let Some(sort_by) = &self.sort_by {
            params.push(("SortBy".to_string(), sort_by.clone()));
            let order = if self.descending { "Descending" } else { "Ascending" };
            params.push(("SortOrder".to_string(), order.to_string()));
        }
        if let Some(start) = self.start_index {
            params.push(("StartIndex".to_string(), start.to_string()));
        }
        if let Some(limit) = self.limit {
            params.push(("Limit".to_string(), limit.to_string()));
        }
        if let Some(favorite) = self.is_favorite {
            params.push(("IsFavorite".to_string(), favorite.to_string()));
        }
        if let Some(parent) = &self.parent_id {
            params.push(("ParentId".to_string(), parent.clone()));
        }
        params.push(("Fields".to_string(), DEFAULT_FIELDS.join(",")));
        params.push(("EnableUserData".to_string(), "true".to_string()));
        params
    }
}

/// What the dashboard needs from a media server, whichever family it is.
#[async_trait]
pub trait MediaServer: Send + Sync {
    fn dialect(&self) -> Dialect;

    async fn list_items(&self, query: &ItemQuery) -> ApiResult<ItemsResponse>;

    async fn latest_items(&self, kind: ItemKind, limit: usize) -> ApiResult<Vec<MediaItem>>;

    async fn get_details(&self, item_id: &str) -> ApiResult<MediaItem>;

    async fn playback_info(
        &self,
        item_id: &str,
        request: &PlaybackInfoRequest,
    ) -> ApiResult<PlaybackInfo>;

    /// Playable URL for a negotiated media source.
    fn stream_url(
        &self,
        item_id: &str,
        source: &MediaSource,
        method: PlayMethod,
        play_session_id: Option<&str>,
    ) -> ApiResult<String>;

    async fn set_favorite(&self, item_id: &str, favorite: bool) -> ApiResult<UserData>;

    async fn set_played(&self, item_id: &str, played: bool) -> ApiResult<UserData>;

    async fn report_playback_start(&self, report: &PlaybackReport) -> ApiResult<()>;

    async fn report_playback_progress(&self, report: &PlaybackReport) -> ApiResult<()>;

    async fn report_playback_stopped(&self, report: &PlaybackReport) -> ApiResult<()>;
}

/// Builds the client for whichever server family is configured. A saved
/// login session supplies the token and user id the config leaves out.
pub fn connect(
    http: HttpClient,
    config: &MediaServerConfig,
    session: Option<&ServerSession>,
    device_id: &str,
) -> Arc<dyn MediaServer> {
    let dialect = match config {
        MediaServerConfig::Jellyfin(_) => Dialect::Jellyfin,
        MediaServerConfig::Emby(_) => Dialect::Emby,
    };
    let settings = config.settings();
    let session = session.filter(|s| s.server_url == settings.base_url);

    let token = settings
        .api_key
        .clone()
        .or_else(|| session.and_then(|s| s.access_token.clone()));
    let user_id = settings
        .user_id
        .clone()
        .or_else(|| session.and_then(|s| s.user_id.clone()));

    Arc::new(EmbyCompatClient::new(
        http,
        dialect,
        &settings.base_url,
        token,
        user_id,
        device_id.to_string(),
        settings
            .device_name
            .clone()
            .unwrap_or_else(|| "mediadash".to_string()),
    ))
}
