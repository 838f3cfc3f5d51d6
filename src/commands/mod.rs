mod arr;
mod library;
mod play;

use anyhow::{Context as _, Result};
use clap::{Args, Subcommand, ValueEnum};
use mediadash::catalog::Catalog;
use mediadash::config::{Configuration, MediaServerConfig};
use mediadash::error::ApiError;
use mediadash::http::HttpClient;
use mediadash::library::SortField;
use mediadash::media_server::{self, Dialect, EmbyCompatClient};
use mediadash::models::ItemKind;
use mediadash::playback::StreamPreference;
use mediadash::radarr::RadarrClient;
use mediadash::sonarr::SonarrClient;
use mediadash::store::{load_state, save_state, PersistedState, ServerSession, ViewMode};
use std::path::PathBuf;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Subcommand)]
pub enum Command {
    /// Sign in to the media server with a username and password
    Login {
        #[arg(short, long)]
        username: Option<String>,
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Browse the movie library
    Movies(ListArgs),
    /// Browse the series library
    Series(ListArgs),
    /// Recently added movies
    Latest {
        #[arg(short, long, default_value_t = 16)]
        limit: usize,
        #[arg(long)]
        refresh: bool,
    },
    /// Show one item in detail
    Show {
        id: String,
        #[arg(long)]
        refresh: bool,
    },
    /// Toggle an item's favorite flag
    Favorite { id: String },
    /// Rate an item from 0 to 10, or clear the rating
    Rate {
        id: String,
        rating: Option<f32>,
        #[arg(long, conflicts_with = "rating")]
        clear: bool,
    },
    /// Mark an item watched, or unwatched with --unset
    Watched {
        id: String,
        #[arg(long)]
        unset: bool,
    },
    /// Local watch history, most recent first
    History {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Play an item in the configured external player
    Play(PlayArgs),
    /// Radarr and Sonarr status, disk space, health and queue
    Dashboard,
    /// Download queue of Radarr and Sonarr
    Queue {
        /// Keep refreshing until interrupted
        #[arg(short, long)]
        watch: bool,
    },
    /// List what Radarr or Sonarr manages
    Managed {
        target: Target,
        /// Only items with files still to download
        #[arg(long)]
        missing: bool,
    },
    /// Search Radarr or Sonarr for something to add
    Lookup { target: Target, term: String },
    /// Add the best lookup match to Radarr or Sonarr
    Add {
        target: Target,
        term: String,
        /// Which lookup result to add, counting from 0
        #[arg(long, default_value_t = 0)]
        pick: usize,
    },
    /// Ask Radarr or Sonarr to search for releases
    Search { target: Target, id: i32 },
    /// Remove a movie or series from Radarr or Sonarr
    Remove {
        target: Target,
        id: i32,
        #[arg(long)]
        delete_files: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Target {
    Movie,
    Series,
}

#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// Text to match against titles and years
    #[arg(short, long)]
    query: Option<String>,
    /// Also match overview, genres and people
    #[arg(long)]
    enhanced: bool,
    #[arg(long = "genre")]
    genres: Vec<String>,
    #[arg(long = "studio")]
    studios: Vec<String>,
    #[arg(long = "country")]
    countries: Vec<String>,
    #[arg(long = "certification")]
    official_ratings: Vec<String>,
    #[arg(long)]
    year_min: Option<i32>,
    #[arg(long)]
    year_max: Option<i32>,
    #[arg(long)]
    rating_min: Option<f64>,
    #[arg(long)]
    rating_max: Option<f64>,
    #[arg(long)]
    runtime_min: Option<f64>,
    #[arg(long)]
    runtime_max: Option<f64>,
    #[arg(long, conflicts_with = "unwatched")]
    watched: bool,
    #[arg(long)]
    unwatched: bool,
    #[arg(long)]
    favorites: bool,
    #[arg(short, long)]
    sort: Option<SortField>,
    #[arg(long, conflicts_with = "asc")]
    desc: bool,
    #[arg(long)]
    asc: bool,
    #[arg(short, long, default_value_t = 1)]
    page: usize,
    #[arg(long)]
    page_size: Option<usize>,
    #[arg(long)]
    view: Option<ViewMode>,
    /// List the genres, studios and years present instead of items
    #[arg(long)]
    facets: bool,
    /// Bypass the cache
    #[arg(long)]
    refresh: bool,
}

#[derive(Args, Debug)]
pub struct PlayArgs {
    id: String,
    #[arg(long, value_enum, default_value_t = StreamPreference::Auto)]
    stream: StreamPreference,
    /// Start offset in seconds
    #[arg(long, conflicts_with = "resume")]
    start: Option<f64>,
    /// Continue from the server's saved position
    #[arg(long)]
    resume: bool,
    /// Print the stream URL instead of launching a player
    #[arg(long)]
    print_url: bool,
}

/// Everything a command needs, built once per invocation.
pub struct Context {
    config: Configuration,
    http: HttpClient,
    state: PersistedState,
    state_path: PathBuf,
}

impl Context {
    pub fn load(config: Configuration) -> Result<Self> {
        let http = HttpClient::new().context("Failed to build HTTP client")?;
        let state_path = config.state_path();
        let fresh = !state_path.exists();
        let mut state = load_state(&state_path)?;
        if fresh {
            state.preferences.page_size = config.page_size();
        }
        debug!("State file: {}", state_path.display());
        Ok(Self {
            config,
            http,
            state,
            state_path,
        })
    }

    pub fn save(&self) -> Result<()> {
        save_state(&self.state_path, &self.state)
    }

    /// Drops the stored access token, keeping the device id.
    pub fn forget_token(&mut self) {
        if let Some(session) = self.state.session.as_mut() {
            session.access_token = None;
            session.user_id = None;
        }
    }

    fn media_server_config(&self) -> Result<&MediaServerConfig> {
        self.config
            .media_server
            .as_ref()
            .ok_or_else(|| ApiError::NotConfigured("mediaServer").into())
    }

    /// Device id for the configured server, created on first use and kept
    /// in the session so the server sees one stable device.
    fn device_id(&mut self) -> Result<String> {
        let base_url = self.media_server_config()?.settings().base_url.clone();
        if let Some(session) = self
            .state
            .session
            .as_ref()
            .filter(|s| s.server_url == base_url)
        {
            return Ok(session.device_id.clone());
        }

        let device_id = Uuid::new_v4().to_string();
        info!("Registering new device id {}", device_id);
        self.state.session = Some(ServerSession {
            server_url: base_url,
            device_id: device_id.clone(),
            access_token: None,
            user_id: None,
        });
        Ok(device_id)
    }

    fn catalog(&mut self) -> Result<Catalog> {
        let device_id = self.device_id()?;
        let config = self.media_server_config()?;
        let server = media_server::connect(
            self.http.clone(),
            config,
            self.state.session.as_ref(),
            &device_id,
        );
        debug!("Using {:?} at {}", server.dialect(), config.settings().base_url);
        Ok(Catalog::new(
            server,
            self.config.list_ttl(),
            self.config.details_ttl(),
        ))
    }

    fn radarr(&self) -> Option<RadarrClient> {
        self.config
            .radarr
            .clone()
            .map(|c| RadarrClient::new(self.http.clone(), c))
    }

    fn sonarr(&self) -> Option<SonarrClient> {
        self.config
            .sonarr
            .clone()
            .map(|c| SonarrClient::new(self.http.clone(), c))
    }
}

pub async fn run(command: Command, ctx: &mut Context) -> Result<()> {
    match command {
        Command::Login { username, password } => login(ctx, username, password).await,
        Command::Movies(args) => library::list(ctx, ItemKind::Movie, args).await,
        Command::Series(args) => library::list(ctx, ItemKind::Series, args).await,
        Command::Latest { limit, refresh } => library::latest(ctx, limit, refresh).await,
        Command::Show { id, refresh } => library::show(ctx, &id, refresh).await,
        Command::Favorite { id } => library::favorite(ctx, &id).await,
        Command::Rate { id, rating, clear } => library::rate(ctx, &id, rating, clear),
        Command::Watched { id, unset } => library::watched(ctx, &id, unset).await,
        Command::History { limit } => library::history(ctx, limit).await,
        Command::Play(args) => play::play(ctx, args).await,
        Command::Dashboard => arr::dashboard(ctx).await,
        Command::Queue { watch } => arr::queue(ctx, watch).await,
        Command::Managed { target, missing } => arr::managed(ctx, target, missing).await,
        Command::Lookup { target, term } => arr::lookup(ctx, target, &term).await,
        Command::Add { target, term, pick } => arr::add(ctx, target, &term, pick).await,
        Command::Search { target, id } => arr::search(ctx, target, id).await,
        Command::Remove {
            target,
            id,
            delete_files,
        } => arr::remove(ctx, target, id, delete_files).await,
    }
}

async fn login(ctx: &mut Context, username: Option<String>, password: Option<String>) -> Result<()> {
    let device_id = ctx.device_id()?;
    let config = ctx.media_server_config()?.clone();
    let settings = config.settings();
    let dialect = match &config {
        MediaServerConfig::Jellyfin(_) => Dialect::Jellyfin,
        MediaServerConfig::Emby(_) => Dialect::Emby,
    };

    let username = username
        .or_else(|| settings.username.clone())
        .ok_or(ApiError::NotConfigured("media server username"))?;
    let password = password.or_else(|| settings.password.clone()).unwrap_or_default();

    let client = EmbyCompatClient::new(
        ctx.http.clone(),
        dialect,
        &settings.base_url,
        None,
        None,
        device_id.clone(),
        settings
            .device_name
            .clone()
            .unwrap_or_else(|| "mediadash".to_string()),
    );
    let result = client.authenticate(&username, &password).await?;

    ctx.state.session = Some(ServerSession {
        server_url: settings.base_url.clone(),
        device_id,
        access_token: Some(result.access_token),
        user_id: Some(result.user.id),
    });
    println!("Signed in to {} as {}", settings.base_url, result.user.name);
    Ok(())
}
