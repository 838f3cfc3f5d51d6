use crate::arr::{self, ArrClient};
use crate::config::RadarrConfig;
use crate::error::ApiResult;
use crate::http::HttpClient;
use crate::models::{ArrMovie, CommandStatus, QueuePage};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

pub const QUEUE_INCLUDE: &str = "includeMovie";

pub struct RadarrClient {
    arr: ArrClient,
    config: RadarrConfig,
}

#[derive(Debug, Serialize)]
struct RadarrMovie {
    title: String,
    #[serde(rename = "originalTitle")]
    original_title: String,
    #[serde(rename = "sortTitle")]
    sort_title: String,
    year: i32,
    #[serde(rename = "tmdbId")]
    tmdb_id: Option<i32>,
    #[serde(rename = "imdbId")]
    imdb_id: Option<String>,
    #[serde(rename = "qualityProfileId")]
    quality_profile_id: i32,
    #[serde(rename = "rootFolderPath")]
    root_folder_path: String,
    #[serde(rename = "addOptions")]
    add_options: RadarrAddOptions,
    monitored: bool,
    tags: Vec<i32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RadarrAddOptions {
    #[serde(rename = "searchForMovie")]
    search_for_movie: bool,
}

/// One hit from `/movie/lookup`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieLookup {
    pub title: String,
    #[serde(default)]
    pub original_title: Option<String>,
    #[serde(default)]
    pub sort_title: Option<String>,
    pub year: Option<i32>,
    pub tmdb_id: Option<i32>,
    pub imdb_id: Option<String>,
    pub overview: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MoviesSearch {
    name: &'static str,
    movie_ids: Vec<i32>,
}

#[derive(Debug, Clone)]
pub enum AddOutcome {
    Added(ArrMovie),
    AlreadyPresent(ArrMovie),
}

impl RadarrClient {
    pub fn new(http: HttpClient, config: RadarrConfig) -> Self {
        let arr = ArrClient::new(http, "radarr", &config.base_url, &config.api_key);
        Self { arr, config }
    }

    pub fn arr(&self) -> &ArrClient {
        &self.arr
    }

    #[instrument(skip(self))]
    pub async fn get_movies(&self) -> ApiResult<Vec<ArrMovie>> {
        self.arr.get("movie", &[]).await
    }

    #[instrument(skip(self))]
    pub async fn lookup(&self, term: &str) -> ApiResult<Vec<MovieLookup>> {
        let term = arr::require_term(term)?;
        info!("Looking up movie: {}", term);
        self.arr.get("movie/lookup", &[("term", term.to_string())]).await
    }

    #[instrument(skip(self, movie), fields(title = %movie.title))]
    pub async fn add_movie(&self, movie: &MovieLookup) -> ApiResult<AddOutcome> {
        info!("Adding movie to Radarr: {}", movie.title);

        if let Some(tmdb_id) = movie.tmdb_id {
            let existing_movies = self.get_movies().await?;
            if let Some(existing) = existing_movies.into_iter().find(|m| m.tmdb_id == Some(tmdb_id)) {
                info!("Movie '{}' (TMDB: {}) already exists in Radarr, skipping", movie.title, tmdb_id);
                return Ok(AddOutcome::AlreadyPresent(existing));
            }
        }

        let quality_profiles = self.arr.quality_profiles().await?;
        let root_folders = self.arr.root_folders().await?;

        let quality_profile_id =
            arr::quality_profile_id(&quality_profiles, self.config.quality_profile.as_deref());
        let root_folder_path =
            arr::root_folder_path(&root_folders, self.config.root_folder.as_deref(), "/movies");
        let tag_ids = self.arr.configured_tag_ids(self.config.tags.as_deref()).await;

        info!("Using quality profile ID: {}, root folder: {}", quality_profile_id, root_folder_path);

        let body = RadarrMovie {
            title: movie.title.clone(),
            original_title: movie.original_title.clone().unwrap_or_else(|| movie.title.clone()),
            sort_title: movie
                .sort_title
                .clone()
                .unwrap_or_else(|| movie.title.to_lowercase()),
            year: movie.year.unwrap_or(0),
            tmdb_id: movie.tmdb_id,
            imdb_id: movie.imdb_id.clone(),
            quality_profile_id,
            root_folder_path,
            add_options: RadarrAddOptions {
                search_for_movie: true,
            },
            monitored: true,
            tags: tag_ids,
        };

        match self.arr.post::<ArrMovie, _>("movie", &body).await {
            Ok(added) => {
                info!("Successfully added movie: {}", movie.title);
                Ok(AddOutcome::Added(added))
            }
            Err(e) => {
                error!("Failed to add movie '{}': {}", movie.title, e);
                Err(e)
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn delete_movie(&self, id: i32, delete_files: bool) -> ApiResult<()> {
        self.arr
            .delete(
                &format!("movie/{}", id),
                &[
                    ("deleteFiles", delete_files.to_string()),
                    ("addImportExclusion", "false".to_string()),
                ],
            )
            .await?;
        info!("Removed movie {} from Radarr", id);
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn search_movies(&self, movie_ids: &[i32]) -> ApiResult<CommandStatus> {
        let command = MoviesSearch {
            name: "MoviesSearch",
            movie_ids: movie_ids.to_vec(),
        };
        self.arr.command(&command).await
    }

    pub async fn queue(&self) -> ApiResult<QueuePage> {
        self.arr.queue(QUEUE_INCLUDE).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_tolerates_sparse_results() {
        let hits: Vec<MovieLookup> = serde_json::from_str(
            r#"[{"title":"Alien","year":1979,"tmdbId":348,"images":[]},{"title":"Aliens"}]"#,
        )
        .unwrap();
        assert_eq!(hits[0].tmdb_id, Some(348));
        assert_eq!(hits[1].year, None);
    }

    #[test]
    fn test_search_command_shape() {
        let command = MoviesSearch {
            name: "MoviesSearch",
            movie_ids: vec![7, 9],
        };
        assert_eq!(
            serde_json::to_value(&command).unwrap(),
            serde_json::json!({"name": "MoviesSearch", "movieIds": [7, 9]})
        );
    }
}
