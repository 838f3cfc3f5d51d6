use super::{ItemQuery, MediaServer, PlayMethod, PlaybackInfoRequest, DEFAULT_FIELDS};
use crate::error::{ApiError, ApiResult};
use crate::http::HttpClient;
use crate::models::{
    AuthenticationResult, ItemKind, ItemsResponse, MediaItem, MediaSource, PlaybackInfo,
    PlaybackReport, UserData,
};
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, instrument};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Jellyfin,
    Emby,
}

impl Dialect {
    pub fn name(&self) -> &'static str {
        match self {
            Dialect::Jellyfin => "Jellyfin",
            Dialect::Emby => "Emby",
        }
    }
}

/// Client for the item API shared by Jellyfin and Emby.
#[derive(Debug, Clone)]
pub struct EmbyCompatClient {
    http: HttpClient,
    dialect: Dialect,
    base_url: String,
    token: Option<String>,
    user_id: Option<String>,
    device_id: String,
    device_name: String,
}

#[derive(Debug, Serialize)]
struct AuthenticateByName<'a> {
    #[serde(rename = "Username")]
    username: &'a str,
    #[serde(rename = "Pw")]
    password: &'a str,
}

impl EmbyCompatClient {
    pub fn new(
        http: HttpClient,
        dialect: Dialect,
        base_url: &str,
        token: Option<String>,
        user_id: Option<String>,
        device_id: String,
        device_name: String,
    ) -> Self {
        Self {
            http,
            dialect,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            user_id,
            device_id,
            device_name,
        }
    }

    fn authorization(&self) -> String {
        let mut value = format!(
            "MediaBrowser Client=\"mediadash\", Device=\"{}\", DeviceId=\"{}\", Version=\"{}\"",
            self.device_name,
            self.device_id,
            env!("CARGO_PKG_VERSION")
        );
        if let Some(token) = &self.token {
            value.push_str(&format!(", Token=\"{}\"", token));
        }
        value
    }

    fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = Vec::new();
        if let Some(token) = &self.token {
            headers.push(("X-Emby-Token", token.clone()));
        }
        if self.dialect == Dialect::Jellyfin {
            headers.push(("X-Emby-Authorization", self.authorization()));
        }
        headers
    }

    fn user_id(&self) -> ApiResult<&str> {
        self.user_id
            .as_deref()
            .ok_or(ApiError::NotConfigured("media server user id"))
    }

    fn url(&self, path: &str, params: &[(String, String)]) -> ApiResult<String> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, path))?;
        if !params.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        Ok(url.to_string())
    }

    /// Path and parameters of the item listing endpoint in this dialect.
    pub fn items_url(&self, query: &ItemQuery) -> ApiResult<String> {
        let user_id = self.user_id()?;
        match self.dialect {
            Dialect::Jellyfin => self.url(&format!("/Users/{}/Items", user_id), &query.to_params()),
            Dialect::Emby => {
                let mut params = vec![("UserId".to_string(), user_id.to_string())];
                params.extend(query.to_params());
                self.url("/Items", &params)
            }
        }
    }

    /// Signs in with a username and password, returning the access token and
    /// user id to persist.
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, username: &str, password: &str) -> ApiResult<AuthenticationResult> {
        let url = self.url("/Users/AuthenticateByName", &[])?;
        let body = AuthenticateByName { username, password };
        // the login call carries the device identity but no token yet
        let headers = vec![("X-Emby-Authorization", self.authorization())];
        let result: AuthenticationResult = self.http.post_json(&url, &headers, &body).await?;
        info!("Signed in to {} as {}", self.dialect.name(), result.user.name);
        Ok(result)
    }

    async fn post_report(&self, path: &str, report: &PlaybackReport) -> ApiResult<()> {
        let url = self.url(path, &[])?;
        self.http.post_json::<(), _>(&url, &self.headers(), report).await
    }
}

#[async_trait]
impl MediaServer for EmbyCompatClient {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    #[instrument(skip(self))]
    async fn list_items(&self, query: &ItemQuery) -> ApiResult<ItemsResponse> {
        let url = self.items_url(query)?;
        let response: ItemsResponse = self.http.get_json(&url, &self.headers()).await?;
        debug!(
            "Fetched {} of {} items",
            response.items.len(),
            response.total_record_count
        );
        Ok(response)
    }

    #[instrument(skip(self))]
    async fn latest_items(&self, kind: ItemKind, limit: usize) -> ApiResult<Vec<MediaItem>> {
        let user_id = self.user_id()?;
        let params = vec![
            ("IncludeItemTypes".to_string(), kind.api_name().to_string()),
            ("Limit".to_string(), limit.to_string()),
            ("Fields".to_string(), DEFAULT_FIELDS.join(",")),
            ("EnableUserData".to_string(), "true".to_string()),
        ];
        let url = self.url(&format!("/Users/{}/Items/Latest", user_id), &params)?;
        self.http.get_json(&url, &self.headers()).await
    }

    #[instrument(skip(self))]
    async fn get_details(&self, item_id: &str) -> ApiResult<MediaItem> {
        let user_id = self.user_id()?;
        let url = self.url(&format!("/Users/{}/Items/{}", user_id, item_id), &[])?;
        self.http.get_json(&url, &self.headers()).await
    }

    #[instrument(skip(self, request))]
    async fn playback_info(
        &self,
        item_id: &str,
        request: &PlaybackInfoRequest,
    ) -> ApiResult<PlaybackInfo> {
        let user_id = self.user_id()?;
        let url = self.url(
            &format!("/Items/{}/PlaybackInfo", item_id),
            &[("UserId".to_string(), user_id.to_string())],
        )?;
        self.http.post_json(&url, &self.headers(), request).await
    }

    fn stream_url(
        &self,
        item_id: &str,
        source: &MediaSource,
        method: PlayMethod,
        play_session_id: Option<&str>,
    ) -> ApiResult<String> {
        if method == PlayMethod::Transcode {
            if let Some(path) = source.transcoding_url.as_deref() {
                // server-built URLs are relative and already carry their parameters
                return Ok(format!("{}{}", self.base_url, path));
            }
        }

        let mut params = vec![
            ("MediaSourceId".to_string(), source.id.clone()),
            ("DeviceId".to_string(), self.device_id.clone()),
        ];
        if let Some(token) = &self.token {
            params.push(("api_key".to_string(), token.clone()));
        }
        if let Some(session) = play_session_id {
            params.push(("PlaySessionId".to_string(), session.to_string()));
        }

        match method {
            PlayMethod::DirectPlay => {
                params.push(("Static".to_string(), "true".to_string()));
                let container = source.container.as_deref().unwrap_or("mp4");
                // containers can be reported as lists, e.g. "mov,mp4,m4a"
                let extension = container.split(',').next().unwrap_or("mp4");
                self.url(&format!("/Videos/{}/stream.{}", item_id, extension), &params)
            }
            PlayMethod::DirectStream | PlayMethod::Transcode => {
                let copy = if method == PlayMethod::DirectStream { "true" } else { "false" };
                params.extend([
                    ("VideoCodec".to_string(), "h264".to_string()),
                    ("AudioCodec".to_string(), "aac".to_string()),
                    ("SegmentContainer".to_string(), "ts".to_string()),
                    ("TranscodingMaxAudioChannels".to_string(), "2".to_string()),
                    ("AllowVideoStreamCopy".to_string(), copy.to_string()),
                    ("AllowAudioStreamCopy".to_string(), copy.to_string()),
                ]);
                self.url(&format!("/Videos/{}/master.m3u8", item_id), &params)
            }
        }
    }

    #[instrument(skip(self))]
    async fn set_favorite(&self, item_id: &str, favorite: bool) -> ApiResult<UserData> {
        let user_id = self.user_id()?;
        let url = self.url(&format!("/Users/{}/FavoriteItems/{}", user_id, item_id), &[])?;
        if favorite {
            self.http.post_json(&url, &self.headers(), &serde_json::json!({})).await
        } else {
            self.http.delete_json(&url, &self.headers()).await
        }
    }

    #[instrument(skip(self))]
    async fn set_played(&self, item_id: &str, played: bool) -> ApiResult<UserData> {
        let user_id = self.user_id()?;
        let url = self.url(&format!("/Users/{}/PlayedItems/{}", user_id, item_id), &[])?;
        if played {
            self.http.post_json(&url, &self.headers(), &serde_json::json!({})).await
        } else {
            self.http.delete_json(&url, &self.headers()).await
        }
    }

    async fn report_playback_start(&self, report: &PlaybackReport) -> ApiResult<()> {
        self.post_report("/Sessions/Playing", report).await
    }

    async fn report_playback_progress(&self, report: &PlaybackReport) -> ApiResult<()> {
        self.post_report("/Sessions/Playing/Progress", report).await
    }

    async fn report_playback_stopped(&self, report: &PlaybackReport) -> ApiResult<()> {
        self.post_report("/Sessions/Playing/Stopped", report).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(dialect: Dialect) -> EmbyCompatClient {
        EmbyCompatClient::new(
            HttpClient::new().unwrap(),
            dialect,
            "http://media.local:8096/",
            Some("tok".to_string()),
            Some("u1".to_string()),
            "dev-1".to_string(),
            "test".to_string(),
        )
    }

    fn source(container: &str) -> MediaSource {
        MediaSource {
            id: "src-1".to_string(),
            container: Some(container.to_string()),
            supports_direct_play: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_items_path_differs_by_dialect() {
        let jellyfin = client(Dialect::Jellyfin).items_url(&ItemQuery::movies()).unwrap();
        assert!(jellyfin.starts_with("http://media.local:8096/Users/u1/Items?"));

        let emby = client(Dialect::Emby).items_url(&ItemQuery::movies()).unwrap();
        assert!(emby.starts_with("http://media.local:8096/Items?UserId=u1&"));
    }

    #[test]
    fn test_missing_user_id_is_reported() {
        let mut c = client(Dialect::Jellyfin);
        c.user_id = None;
        let err = c.items_url(&ItemQuery::movies()).unwrap_err();
        assert!(matches!(err, ApiError::NotConfigured(_)));
    }

    #[test]
    fn test_jellyfin_sends_authorization_header() {
        let headers = client(Dialect::Jellyfin).headers();
        assert!(headers.iter().any(|(k, v)| *k == "X-Emby-Token" && v == "tok"));
        let auth = headers
            .iter()
            .find(|(k, _)| *k == "X-Emby-Authorization")
            .map(|(_, v)| v.clone())
            .unwrap();
        assert!(auth.contains("DeviceId=\"dev-1\""));
        assert!(auth.contains("Token=\"tok\""));

        let emby_headers = client(Dialect::Emby).headers();
        assert_eq!(emby_headers.len(), 1);
    }

    #[test]
    fn test_direct_play_url_uses_first_container() {
        let url = client(Dialect::Jellyfin)
            .stream_url("item9", &source("mkv,webm"), PlayMethod::DirectPlay, None)
            .unwrap();
        assert!(url.starts_with("http://media.local:8096/Videos/item9/stream.mkv?"));
        assert!(url.contains("Static=true"));
        assert!(url.contains("api_key=tok"));
    }

    #[test]
    fn test_hls_urls() {
        let c = client(Dialect::Emby);
        let remux = c
            .stream_url("item9", &source("mkv"), PlayMethod::DirectStream, Some("ps1"))
            .unwrap();
        assert!(remux.contains("/Videos/item9/master.m3u8?"));
        assert!(remux.contains("AllowVideoStreamCopy=true"));
        assert!(remux.contains("PlaySessionId=ps1"));

        let forced = c
            .stream_url("item9", &source("mkv"), PlayMethod::Transcode, None)
            .unwrap();
        assert!(forced.contains("AllowVideoStreamCopy=false"));

        let mut server_built = source("mkv");
        server_built.transcoding_url = Some("/videos/item9/master.m3u8?x=1".to_string());
        let url = c
            .stream_url("item9", &server_built, PlayMethod::Transcode, None)
            .unwrap();
        assert_eq!(url, "http://media.local:8096/videos/item9/master.m3u8?x=1");
    }
}
