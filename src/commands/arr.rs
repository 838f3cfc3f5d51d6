use super::{Context, Target};
use anyhow::{bail, Result};
use mediadash::arr::ArrClient;
use mediadash::dashboard::{self, ServicePanels};
use mediadash::error::ApiError;
use mediadash::format;
use mediadash::radarr::{self, RadarrClient};
use mediadash::sonarr::{self, SonarrClient};
use tracing::warn;

fn require_radarr(ctx: &Context) -> Result<RadarrClient> {
    ctx.radarr()
        .ok_or_else(|| ApiError::NotConfigured("radarr").into())
}

fn require_sonarr(ctx: &Context) -> Result<SonarrClient> {
    ctx.sonarr()
        .ok_or_else(|| ApiError::NotConfigured("sonarr").into())
}

pub async fn dashboard(ctx: &mut Context) -> Result<()> {
    let radarr = ctx.radarr();
    let sonarr = ctx.sonarr();
    let mut targets: Vec<(&ArrClient, &str)> = Vec::new();
    if let Some(client) = &radarr {
        targets.push((client.arr(), radarr::QUEUE_INCLUDE));
    }
    if let Some(client) = &sonarr {
        targets.push((client.arr(), sonarr::QUEUE_INCLUDE));
    }
    if targets.is_empty() {
        bail!("neither radarr nor sonarr is configured");
    }

    let panels: Vec<ServicePanels> = dashboard::fetch_all(&targets).await;
    for panel in &panels {
        print!("{}", dashboard::render_panels(panel));
    }
    Ok(())
}

async fn print_queues(radarr: Option<&RadarrClient>, sonarr: Option<&SonarrClient>) {
    let radarr_queue = async {
        match radarr {
            Some(client) => Some(client.queue().await),
            None => None,
        }
    };
    let sonarr_queue = async {
        match sonarr {
            Some(client) => Some(client.queue().await),
            None => None,
        }
    };
    let (radarr_queue, sonarr_queue) = tokio::join!(radarr_queue, sonarr_queue);
    if let Some(queue) = radarr_queue {
        print!("{}", dashboard::render_queue("radarr", &queue));
    }
    if let Some(queue) = sonarr_queue {
        print!("{}", dashboard::render_queue("sonarr", &queue));
    }
}

pub async fn queue(ctx: &mut Context, watch: bool) -> Result<()> {
    let radarr = ctx.radarr();
    let sonarr = ctx.sonarr();
    if radarr.is_none() && sonarr.is_none() {
        bail!("neither radarr nor sonarr is configured");
    }

    if !watch {
        print_queues(radarr.as_ref(), sonarr.as_ref()).await;
        return Ok(());
    }

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    let (radarr, sonarr) = (radarr.as_ref(), sonarr.as_ref());
    dashboard::poll_until(ctx.config.queue_interval(), shutdown, move || async move {
        println!("--- {}", chrono::Local::now().format("%H:%M:%S"));
        print_queues(radarr, sonarr).await;
    })
    .await;
    Ok(())
}

pub async fn managed(ctx: &mut Context, target: Target, missing: bool) -> Result<()> {
    match target {
        Target::Movie => {
            let mut movies = require_radarr(ctx)?.get_movies().await?;
            movies.retain(|m| !missing || !m.has_file);
            movies.sort_by_key(|m| m.title.to_lowercase());
            for movie in &movies {
                println!("{}", format::movie_line(movie));
            }
            println!("-- {} movies", movies.len());
        }
        Target::Series => {
            let mut series = require_sonarr(ctx)?.get_series().await?;
            series.retain(|s| {
                !missing
                    || s.statistics
                        .as_ref()
                        .is_some_and(|stats| stats.episode_file_count < stats.episode_count)
            });
            series.sort_by_key(|s| s.title.to_lowercase());
            for show in &series {
                println!("{}", format::series_line(show));
            }
            println!("-- {} series", series.len());
        }
    }
    Ok(())
}

pub async fn lookup(ctx: &mut Context, target: Target, term: &str) -> Result<()> {
    match target {
        Target::Movie => {
            let hits = require_radarr(ctx)?.lookup(term).await?;
            for (index, hit) in hits.iter().enumerate() {
                println!(
                    "{:>2}. {} ({}) tmdb:{}",
                    index,
                    hit.title,
                    hit.year.map(|y| y.to_string()).unwrap_or_else(|| "?".into()),
                    hit.tmdb_id.map(|id| id.to_string()).unwrap_or_else(|| "-".into())
                );
            }
        }
        Target::Series => {
            let hits = require_sonarr(ctx)?.lookup(term).await?;
            for (index, hit) in hits.iter().enumerate() {
                println!(
                    "{:>2}. {} ({}) tvdb:{}",
                    index,
                    hit.title,
                    hit.year.map(|y| y.to_string()).unwrap_or_else(|| "?".into()),
                    hit.tvdb_id.map(|id| id.to_string()).unwrap_or_else(|| "-".into())
                );
            }
        }
    }
    Ok(())
}

pub async fn add(ctx: &mut Context, target: Target, term: &str, pick: usize) -> Result<()> {
    match target {
        Target::Movie => {
            let radarr = require_radarr(ctx)?;
            let hits = radarr.lookup(term).await?;
            let Some(hit) = hits.get(pick) else {
                bail!("no lookup result #{} for '{}'", pick, term);
            };
            match radarr.add_movie(hit).await? {
                radarr::AddOutcome::Added(movie) => println!("Added {} (id {})", movie.title, movie.id),
                radarr::AddOutcome::AlreadyPresent(movie) => {
                    println!("{} is already in Radarr (id {})", movie.title, movie.id)
                }
            }
        }
        Target::Series => {
            let sonarr = require_sonarr(ctx)?;
            let hits = sonarr.lookup(term).await?;
            let Some(hit) = hits.get(pick) else {
                bail!("no lookup result #{} for '{}'", pick, term);
            };
            match sonarr.add_series(hit).await? {
                sonarr::AddOutcome::Added(series) => println!("Added {} (id {})", series.title, series.id),
                sonarr::AddOutcome::AlreadyPresent(series) => {
                    println!("{} is already in Sonarr (id {})", series.title, series.id)
                }
            }
        }
    }
    Ok(())
}

pub async fn search(ctx: &mut Context, target: Target, id: i32) -> Result<()> {
    let command = match target {
        Target::Movie => require_radarr(ctx)?.search_movies(&[id]).await?,
        Target::Series => require_sonarr(ctx)?.search_series(id).await?,
    };
    println!(
        "Queued {} (command {}, {})",
        command.name,
        command.id,
        command.status.as_deref().unwrap_or("queued")
    );
    Ok(())
}

pub async fn remove(ctx: &mut Context, target: Target, id: i32, delete_files: bool) -> Result<()> {
    match target {
        Target::Movie => {
            let radarr = require_radarr(ctx)?;
            let movie = radarr.get_movies().await?.into_iter().find(|m| m.id == id);
            let Some(movie) = movie else {
                bail!("Radarr has no movie with id {}", id);
            };
            radarr.delete_movie(id, delete_files).await?;
            println!(
                "Removed {}{}",
                movie.title,
                movie
                    .size_on_disk
                    .filter(|_| delete_files)
                    .map(|size| format!(", freed {}", format::bytes(size)))
                    .unwrap_or_default()
            );
        }
        Target::Series => {
            let sonarr = require_sonarr(ctx)?;
            sonarr.delete_series(id, delete_files).await?;
            println!("Removed series {}", id);
        }
    }
    Ok(())
}
