use crate::arr::{self, ArrClient};
use crate::config::SonarrConfig;
use crate::error::ApiResult;
use crate::http::HttpClient;
use crate::models::{ArrSeries, CommandStatus, QueuePage};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

pub const QUEUE_INCLUDE: &str = "includeSeries";

pub struct SonarrClient {
    arr: ArrClient,
    config: SonarrConfig,
}

#[derive(Debug, Serialize)]
struct SonarrSeries {
    title: String,
    #[serde(rename = "sortTitle")]
    sort_title: String,
    year: i32,
    #[serde(rename = "tvdbId")]
    tvdb_id: Option<i32>,
    #[serde(rename = "imdbId")]
    imdb_id: Option<String>,
    #[serde(rename = "tmdbId")]
    tmdb_id: Option<i32>,
    #[serde(rename = "qualityProfileId")]
    quality_profile_id: i32,
    #[serde(rename = "rootFolderPath")]
    root_folder_path: String,
    #[serde(rename = "addOptions")]
    add_options: SonarrAddOptions,
    monitored: bool,
    tags: Vec<i32>,
}

#[derive(Debug, Serialize)]
struct SonarrAddOptions {
    monitor: String,
    #[serde(rename = "searchForMissingEpisodes")]
    search_for_missing_episodes: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesLookup {
    pub title: String,
    #[serde(default)]
    pub sort_title: Option<String>,
    pub year: Option<i32>,
    pub tvdb_id: Option<i32>,
    pub imdb_id: Option<String>,
    pub tmdb_id: Option<i32>,
    pub overview: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SeriesSearch {
    name: &'static str,
    series_id: i32,
}

#[derive(Debug, Clone)]
pub enum AddOutcome {
    Added(ArrSeries),
    AlreadyPresent(ArrSeries),
}

/// Existing series matching either external id.
fn find_existing(existing: Vec<ArrSeries>, lookup: &SeriesLookup) -> Option<ArrSeries> {
    existing.into_iter().find(|s| {
        (lookup.tvdb_id.is_some() && s.tvdb_id == lookup.tvdb_id)
            || (lookup.tmdb_id.is_some() && s.tmdb_id == lookup.tmdb_id)
    })
}

impl SonarrClient {
    pub fn new(http: HttpClient, config: SonarrConfig) -> Self {
        let arr = ArrClient::new(http, "sonarr", &config.base_url, &config.api_key);
        Self { arr, config }
    }

    pub fn arr(&self) -> &ArrClient {
        &self.arr
    }

    #[instrument(skip(self))]
    pub async fn get_series(&self) -> ApiResult<Vec<ArrSeries>> {
        self.arr.get("series", &[]).await
    }

    #[instrument(skip(self))]
    pub async fn lookup(&self, term: &str) -> ApiResult<Vec<SeriesLookup>> {
        let term = arr::require_term(term)?;
        info!("Looking up series: {}", term);
        self.arr.get("series/lookup", &[("term", term.to_string())]).await
    }

    #[instrument(skip(self, series), fields(title = %series.title))]
    pub async fn add_series(&self, series: &SeriesLookup) -> ApiResult<AddOutcome> {
        info!("Adding series to Sonarr: {}", series.title);

        let existing_series = self.get_series().await?;
        if let Some(existing) = find_existing(existing_series, series) {
            info!(
                "Series '{}' (TVDB: {:?}, TMDB: {:?}) already exists in Sonarr, skipping",
                series.title, series.tvdb_id, series.tmdb_id
            );
            return Ok(AddOutcome::AlreadyPresent(existing));
        }

        let quality_profiles = self.arr.quality_profiles().await?;
        let root_folders = self.arr.root_folders().await?;

        let quality_profile_id =
            arr::quality_profile_id(&quality_profiles, self.config.quality_profile.as_deref());
        let root_folder_path =
            arr::root_folder_path(&root_folders, self.config.root_folder.as_deref(), "/tv");
        let tag_ids = self.arr.configured_tag_ids(self.config.tags.as_deref()).await;

        info!("Using quality profile ID: {}, root folder: {}", quality_profile_id, root_folder_path);

        let body = SonarrSeries {
            title: series.title.clone(),
            sort_title: series
                .sort_title
                .clone()
                .unwrap_or_else(|| series.title.to_lowercase()),
            year: series.year.unwrap_or(0),
            tvdb_id: series.tvdb_id,
            imdb_id: series.imdb_id.clone(),
            tmdb_id: series.tmdb_id,
            quality_profile_id,
            root_folder_path,
            add_options: SonarrAddOptions {
                monitor: self
                    .config
                    .season_monitoring
                    .clone()
                    .unwrap_or_else(|| "all".to_string()),
                search_for_missing_episodes: true,
            },
            monitored: true,
            tags: tag_ids,
        };

        match self.arr.post::<ArrSeries, _>("series", &body).await {
            Ok(added) => {
                info!("Successfully added series: {}", series.title);
                Ok(AddOutcome::Added(added))
            }
            Err(e) => {
                error!("Failed to add series '{}': {}", series.title, e);
                Err(e)
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn delete_series(&self, id: i32, delete_files: bool) -> ApiResult<()> {
        self.arr
            .delete(
                &format!("series/{}", id),
                &[("deleteFiles", delete_files.to_string())],
            )
            .await?;
        info!("Removed series {} from Sonarr", id);
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn search_series(&self, series_id: i32) -> ApiResult<CommandStatus> {
        self.arr
            .command(&SeriesSearch {
                name: "SeriesSearch",
                series_id,
            })
            .await
    }

    pub async fn queue(&self) -> ApiResult<QueuePage> {
        self.arr.queue(QUEUE_INCLUDE).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(id: i32, tvdb: Option<i32>, tmdb: Option<i32>) -> ArrSeries {
        ArrSeries {
            id,
            title: format!("series-{}", id),
            tvdb_id: tvdb,
            tmdb_id: tmdb,
            ..Default::default()
        }
    }

    #[test]
    fn test_duplicate_detection_uses_either_id() {
        let existing = vec![series(1, Some(100), None), series(2, None, Some(200))];
        let by_tvdb = SeriesLookup {
            tvdb_id: Some(100),
            ..Default::default()
        };
        let by_tmdb = SeriesLookup {
            tmdb_id: Some(200),
            ..Default::default()
        };
        let unknown = SeriesLookup::default();

        assert_eq!(find_existing(existing.clone(), &by_tvdb).map(|s| s.id), Some(1));
        assert_eq!(find_existing(existing.clone(), &by_tmdb).map(|s| s.id), Some(2));
        assert!(find_existing(existing, &unknown).is_none());
    }

    #[test]
    fn test_search_command_shape() {
        let command = SeriesSearch {
            name: "SeriesSearch",
            series_id: 12,
        };
        assert_eq!(
            serde_json::to_value(&command).unwrap(),
            serde_json::json!({"name": "SeriesSearch", "seriesId": 12})
        );
    }
}
