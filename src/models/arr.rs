//! Shapes shared by the Radarr and Sonarr v3 APIs.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityProfile {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootFolder {
    pub id: i32,
    pub path: String,
    #[serde(default)]
    pub accessible: bool,
    pub free_space: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: i32,
    pub label: String,
}

/// A movie as Radarr tracks it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrMovie {
    #[serde(default)]
    pub id: i32,
    pub title: String,
    pub year: Option<i32>,
    pub tmdb_id: Option<i32>,
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub monitored: bool,
    #[serde(default)]
    pub has_file: bool,
    pub size_on_disk: Option<i64>,
    pub status: Option<String>,
}

/// A series as Sonarr tracks it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrSeries {
    #[serde(default)]
    pub id: i32,
    pub title: String,
    pub year: Option<i32>,
    pub tvdb_id: Option<i32>,
    pub tmdb_id: Option<i32>,
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub monitored: bool,
    pub status: Option<String>,
    pub statistics: Option<SeriesStatistics>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesStatistics {
    #[serde(default)]
    pub episode_file_count: i32,
    #[serde(default)]
    pub episode_count: i32,
    #[serde(default)]
    pub size_on_disk: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuePage {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub page_size: u32,
    #[serde(default)]
    pub total_records: u32,
    #[serde(default)]
    pub records: Vec<QueueRecord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueRecord {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    pub status: Option<String>,
    pub tracked_download_status: Option<String>,
    pub download_client: Option<String>,
    /// Bytes; the API reports these as floating point.
    #[serde(default)]
    pub size: f64,
    #[serde(default)]
    pub sizeleft: f64,
    pub timeleft: Option<String>,
    pub error_message: Option<String>,
}

impl QueueRecord {
    /// Download progress in percent, `0` when the size is unknown.
    pub fn progress_percent(&self) -> f64 {
        if self.size <= 0.0 {
            return 0.0;
        }
        ((self.size - self.sizeleft) / self.size * 100.0).clamp(0.0, 100.0)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    #[serde(default)]
    pub version: String,
    pub app_name: Option<String>,
    pub instance_name: Option<String>,
    pub os_name: Option<String>,
    pub start_time: Option<String>,
}

/// One mount point from `/api/v3/diskspace`. Both values are bytes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskSpace {
    #[serde(default)]
    pub path: String,
    pub label: Option<String>,
    #[serde(default)]
    pub free_space: i64,
    #[serde(default)]
    pub total_space: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheck {
    pub source: Option<String>,
    #[serde(rename = "type")]
    pub level: Option<String>,
    #[serde(default)]
    pub message: String,
    pub wiki_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandStatus {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_progress() {
        let record = QueueRecord {
            id: 1,
            size: 1000.0,
            sizeleft: 250.0,
            ..Default::default()
        };
        assert_eq!(record.progress_percent(), 75.0);

        let unknown = QueueRecord::default();
        assert_eq!(unknown.progress_percent(), 0.0);
    }

    #[test]
    fn test_health_check_type_field() {
        let check: HealthCheck = serde_json::from_str(
            r#"{"source":"IndexerStatusCheck","type":"warning","message":"Indexers unavailable"}"#,
        )
        .unwrap();
        assert_eq!(check.level.as_deref(), Some("warning"));
    }
}
