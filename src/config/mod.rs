use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    pub media_server: Option<MediaServerConfig>,
    pub radarr: Option<RadarrConfig>,
    pub sonarr: Option<SonarrConfig>,
    pub cache: Option<CacheConfig>,
    pub library: Option<LibraryConfig>,
    pub playback: Option<PlaybackConfig>,
    pub dashboard: Option<DashboardConfig>,
    pub state_path: Option<PathBuf>,
}

/// Which media server family to talk to. Both speak the same item API with
/// small dialect differences.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MediaServerConfig {
    Jellyfin(EmbyCompatConfig),
    Emby(EmbyCompatConfig),
}

impl MediaServerConfig {
    pub fn settings(&self) -> &EmbyCompatConfig {
        match self {
            MediaServerConfig::Jellyfin(c) | MediaServerConfig::Emby(c) => c,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbyCompatConfig {
    pub base_url: String,
    /// Static API key. When absent the token saved by `login` is used.
    pub api_key: Option<String>,
    pub user_id: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub device_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RadarrConfig {
    #[serde(rename = "baseUrl")]
    pub base_url: String,
    #[serde(rename = "apikey")]
    pub api_key: String,
    #[serde(rename = "qualityProfile")]
    pub quality_profile: Option<String>,
    #[serde(rename = "rootFolder")]
    pub root_folder: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SonarrConfig {
    #[serde(rename = "baseUrl")]
    pub base_url: String,
    #[serde(rename = "apikey")]
    pub api_key: String,
    #[serde(rename = "qualityProfile")]
    pub quality_profile: Option<String>,
    #[serde(rename = "rootFolder")]
    pub root_folder: Option<String>,
    #[serde(rename = "seasonMonitoring")]
    pub season_monitoring: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheConfig {
    pub list_ttl_seconds: Option<u64>,
    pub details_ttl_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryConfig {
    pub page_size: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackConfig {
    pub report_interval_seconds: Option<u64>,
    /// External player command, e.g. `mpv`.
    pub player: Option<String>,
    pub max_streaming_bitrate: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardConfig {
    pub queue_interval_seconds: Option<u64>,
}

impl Configuration {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let config: Configuration = serde_yaml::from_str(content)?;
        Ok(config)
    }

    pub fn list_ttl(&self) -> Duration {
        Duration::from_secs(
            self.cache
                .as_ref()
                .and_then(|c| c.list_ttl_seconds)
                .unwrap_or(5 * 60),
        )
    }

    pub fn details_ttl(&self) -> Duration {
        Duration::from_secs(
            self.cache
                .as_ref()
                .and_then(|c| c.details_ttl_seconds)
                .unwrap_or(10 * 60),
        )
    }

    pub fn page_size(&self) -> usize {
        self.library
            .as_ref()
            .and_then(|l| l.page_size)
            .filter(|size| *size > 0)
            .unwrap_or(24)
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(
            self.playback
                .as_ref()
                .and_then(|p| p.report_interval_seconds)
                .unwrap_or(30),
        )
    }

    pub fn player_command(&self) -> Option<&str> {
        self.playback.as_ref().and_then(|p| p.player.as_deref())
    }

    pub fn max_streaming_bitrate(&self) -> u64 {
        self.playback
            .as_ref()
            .and_then(|p| p.max_streaming_bitrate)
            .unwrap_or(120_000_000)
    }

    pub fn queue_interval(&self) -> Duration {
        Duration::from_secs(
            self.dashboard
                .as_ref()
                .and_then(|d| d.queue_interval_seconds)
                .unwrap_or(5),
        )
    }

    /// Location of the persisted overlay state.
    pub fn state_path(&self) -> PathBuf {
        self.state_path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("mediadash")
                .join("state.json")
        })
    }
}
