//! Plumbing shared by the Radarr and Sonarr v3 clients: URL building with the
//! `apikey` query parameter and the endpoints both services expose.

use crate::error::{ApiError, ApiResult};
use crate::http::HttpClient;
use crate::models::{
    CommandStatus, DiskSpace, HealthCheck, QualityProfile, QueuePage, RootFolder, SystemStatus,
    Tag,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{instrument, warn};

const QUEUE_PAGE_SIZE: u32 = 50;

#[derive(Debug, Clone)]
pub struct ArrClient {
    http: HttpClient,
    service: &'static str,
    base_url: String,
    api_key: String,
}

impl ArrClient {
    pub fn new(http: HttpClient, service: &'static str, base_url: &str, api_key: &str) -> Self {
        Self {
            http,
            service,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    pub fn service(&self) -> &'static str {
        self.service
    }

    /// `{base}/api/v3/{path}?{query}&apikey={key}` with every query value
    /// percent-encoded.
    pub fn url(&self, path: &str, query: &[(&str, String)]) -> String {
        let mut url = format!("{}/api/v3/{}?", self.base_url, path.trim_start_matches('/'));
        for (name, value) in query {
            url.push_str(name);
            url.push('=');
            url.push_str(&urlencoding::encode(value));
            url.push('&');
        }
        url.push_str("apikey=");
        url.push_str(&urlencoding::encode(&self.api_key));
        url
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> ApiResult<T> {
        self.http.get_json(&self.url(path, query), &[]).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> ApiResult<T> {
        self.http.post_json(&self.url(path, &[]), &[], body).await
    }

    pub async fn delete(&self, path: &str, query: &[(&str, String)]) -> ApiResult<()> {
        self.http.delete(&self.url(path, query), &[]).await
    }

    #[instrument(skip(self), fields(service = self.service))]
    pub async fn quality_profiles(&self) -> ApiResult<Vec<QualityProfile>> {
        self.get("qualityprofile", &[]).await
    }

    #[instrument(skip(self), fields(service = self.service))]
    pub async fn root_folders(&self) -> ApiResult<Vec<RootFolder>> {
        self.get("rootfolder", &[]).await
    }

    #[instrument(skip(self), fields(service = self.service))]
    pub async fn tags(&self) -> ApiResult<Vec<Tag>> {
        self.get("tag", &[]).await
    }

    #[instrument(skip(self), fields(service = self.service))]
    pub async fn system_status(&self) -> ApiResult<SystemStatus> {
        self.get("system/status", &[]).await
    }

    #[instrument(skip(self), fields(service = self.service))]
    pub async fn disk_space(&self) -> ApiResult<Vec<DiskSpace>> {
        self.get("diskspace", &[]).await
    }

    #[instrument(skip(self), fields(service = self.service))]
    pub async fn health(&self) -> ApiResult<Vec<HealthCheck>> {
        self.get("health", &[]).await
    }

    /// First page of the download queue. `include` names the flag that
    /// embeds the owning movie or series (`includeMovie` / `includeSeries`).
    #[instrument(skip(self), fields(service = self.service))]
    pub async fn queue(&self, include: &str) -> ApiResult<QueuePage> {
        self.get(
            "queue",
            &[
                ("page", "1".to_string()),
                ("pageSize", QUEUE_PAGE_SIZE.to_string()),
                (include, "true".to_string()),
            ],
        )
        .await
    }

    #[instrument(skip(self, body), fields(service = self.service))]
    pub async fn command<B: Serialize>(&self, body: &B) -> ApiResult<CommandStatus> {
        self.post("command", body).await
    }

    /// Maps tag labels onto ids, dropping labels the service does not know.
    pub async fn resolve_tag_ids(&self, labels: &[String]) -> ApiResult<Vec<i32>> {
        if labels.is_empty() {
            return Ok(Vec::new());
        }
        let tags = self.tags().await?;
        Ok(tag_ids(&tags, labels))
    }

    /// Tag ids for an add request. A failed lookup is logged and the item is
    /// added untagged.
    pub async fn configured_tag_ids(&self, labels: Option<&[String]>) -> Vec<i32> {
        let Some(labels) = labels else {
            return Vec::new();
        };
        match self.resolve_tag_ids(labels).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(
                    "Failed to resolve {} tags {:?}, adding without them: {}",
                    self.service, labels, e
                );
                Vec::new()
            }
        }
    }
}

pub fn require_term(term: &str) -> ApiResult<&str> {
    let term = term.trim();
    if term.is_empty() {
        return Err(ApiError::InvalidInput("search term must not be empty".to_string()));
    }
    Ok(term)
}

/// Profile named `wanted`, else the first one, else id `1`.
pub fn quality_profile_id(profiles: &[QualityProfile], wanted: Option<&str>) -> i32 {
    let first = || profiles.first().map(|p| p.id).unwrap_or(1);
    match wanted {
        Some(name) => profiles
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.id)
            .unwrap_or_else(|| {
                warn!("Quality profile '{}' not found, using first available", name);
                first()
            }),
        None => first(),
    }
}

pub fn root_folder_path(folders: &[RootFolder], configured: Option<&str>, fallback: &str) -> String {
    match configured {
        Some(folder) => folder.to_string(),
        None => folders
            .first()
            .map(|f| f.path.clone())
            .unwrap_or_else(|| fallback.to_string()),
    }
}

pub fn tag_ids(tags: &[Tag], labels: &[String]) -> Vec<i32> {
    labels
        .iter()
        .filter_map(|name| tags.iter().find(|t| t.label == *name).map(|t| t.id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ArrClient {
        ArrClient::new(HttpClient::new().unwrap(), "radarr", "http://localhost:7878/", "k&y")
    }

    #[tokio::test]
    async fn test_unreachable_tag_lookup_adds_untagged() {
        let offline = ArrClient::new(HttpClient::new().unwrap(), "sonarr", "http://127.0.0.1:9", "k");
        let labels = vec!["4k".to_string()];
        assert!(offline.resolve_tag_ids(&labels).await.is_err());
        assert!(offline.configured_tag_ids(Some(&labels)).await.is_empty());
        assert!(offline.configured_tag_ids(None).await.is_empty());
    }

    #[test]
    fn test_url_encodes_query_and_key() {
        let url = client().url("movie/lookup", &[("term", "alien 1979".to_string())]);
        assert_eq!(
            url,
            "http://localhost:7878/api/v3/movie/lookup?term=alien%201979&apikey=k%26y"
        );
        assert_eq!(client().url("/health", &[]), "http://localhost:7878/api/v3/health?apikey=k%26y");
    }

    #[test]
    fn test_quality_profile_resolution() {
        let profiles = vec![
            QualityProfile { id: 4, name: "Any".into() },
            QualityProfile { id: 6, name: "HD-1080p".into() },
        ];
        assert_eq!(quality_profile_id(&profiles, Some("HD-1080p")), 6);
        assert_eq!(quality_profile_id(&profiles, Some("Missing")), 4);
        assert_eq!(quality_profile_id(&profiles, None), 4);
        assert_eq!(quality_profile_id(&[], None), 1);
    }

    #[test]
    fn test_root_folder_and_tags() {
        let folders = vec![RootFolder {
            id: 1,
            path: "/data/movies".into(),
            accessible: true,
            free_space: None,
        }];
        assert_eq!(root_folder_path(&folders, None, "/movies"), "/data/movies");
        assert_eq!(root_folder_path(&folders, Some("/other"), "/movies"), "/other");
        assert_eq!(root_folder_path(&[], None, "/movies"), "/movies");

        let tags = vec![Tag { id: 2, label: "kids".into() }, Tag { id: 3, label: "4k".into() }];
        assert_eq!(tag_ids(&tags, &["4k".into(), "nope".into()]), vec![3]);
    }

    #[test]
    fn test_blank_term_rejected() {
        assert!(matches!(require_term("  "), Err(ApiError::InvalidInput(_))));
        assert_eq!(require_term(" dune ").unwrap(), "dune");
    }
}
