//! Plain-text rendering helpers shared by the commands.

use crate::models::{ticks_to_seconds, ArrMovie, ArrSeries, MediaItem};

const UNITS: [&str; 6] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB"];

/// `1h 42m`, `45m`, or `0m` for anything under a minute.
pub fn runtime(ticks: i64) -> String {
    let minutes = (ticks_to_seconds(ticks.max(0)) / 60.0).round() as i64;
    let (hours, minutes) = (minutes / 60, minutes % 60);
    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

/// Binary-unit byte count. Input is always bytes.
pub fn bytes(value: i64) -> String {
    if value < 1024 {
        return format!("{} B", value.max(0));
    }
    let mut size = value as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", size, UNITS[unit])
}

pub fn rating(value: Option<f64>) -> String {
    value.map(|r| format!("{:.1}", r)).unwrap_or_else(|| "-".to_string())
}

/// `mm:ss` or `h:mm:ss`.
pub fn clock(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{:02}:{:02}", m, s)
    }
}

/// One line per item in list views.
pub fn item_line(item: &MediaItem, favorite: bool, watched: bool) -> String {
    let year = item
        .production_year
        .map(|y| format!(" ({})", y))
        .unwrap_or_default();
    let runtime = item.run_time_ticks.map(runtime).unwrap_or_else(|| "-".to_string());
    let marks = format!(
        "{}{}",
        if favorite { "*" } else { " " },
        if watched { "✓" } else { " " }
    );
    format!(
        "{} {:<36} {}{}  ★ {}  {}",
        marks,
        item.id,
        item.name,
        year,
        rating(item.community_rating),
        runtime
    )
}

/// One Radarr movie: id, title, year, file state and size.
pub fn movie_line(movie: &ArrMovie) -> String {
    let year = movie.year.map(|y| format!(" ({})", y)).unwrap_or_default();
    let file = if movie.has_file {
        movie.size_on_disk.map(bytes).unwrap_or_else(|| "on disk".to_string())
    } else {
        "missing".to_string()
    };
    format!(
        "{:>5}  {}{}  [{}]{}",
        movie.id,
        movie.title,
        year,
        file,
        if movie.monitored { "" } else { " unmonitored" }
    )
}

/// One Sonarr series: id, title, year, episodes on disk and size.
pub fn series_line(series: &ArrSeries) -> String {
    let year = series.year.map(|y| format!(" ({})", y)).unwrap_or_default();
    let files = match &series.statistics {
        Some(stats) => format!(
            "{}/{} episodes, {}",
            stats.episode_file_count,
            stats.episode_count,
            bytes(stats.size_on_disk)
        ),
        None => "no statistics".to_string(),
    };
    format!(
        "{:>5}  {}{}  [{}]{}",
        series.id,
        series.title,
        year,
        files,
        if series.monitored { "" } else { " unmonitored" }
    )
}
