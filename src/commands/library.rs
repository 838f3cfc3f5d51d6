use super::{Context, ListArgs};
use anyhow::{bail, Result};
use mediadash::format;
use mediadash::library::{facets, Bounds, FilterDescriptor, SearchMode, SortDescriptor, SortOrder};
use mediadash::models::{ticks_to_seconds, ItemKind, MediaItem};
use mediadash::store::{LibraryStore, UserOverlay, ViewMode};

fn bounds<T: PartialOrd + Copy>(min: Option<T>, max: Option<T>, lowest: T, highest: T) -> Option<Bounds<T>> {
    match (min, max) {
        (None, None) => None,
        (min, max) => Some(Bounds::new(min.unwrap_or(lowest), max.unwrap_or(highest))),
    }
}

impl ListArgs {
    fn filter(&self) -> FilterDescriptor {
        FilterDescriptor {
            query: self.query.clone(),
            search_mode: if self.enhanced {
                SearchMode::Enhanced
            } else {
                SearchMode::Basic
            },
            genres: self.genres.clone(),
            years: bounds(self.year_min, self.year_max, i32::MIN, i32::MAX),
            rating: bounds(self.rating_min, self.rating_max, f64::MIN, f64::MAX),
            runtime_minutes: bounds(self.runtime_min, self.runtime_max, 0.0, f64::MAX),
            watched: match (self.watched, self.unwatched) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            },
            favorite: self.favorites.then_some(true),
            studios: self.studios.clone(),
            countries: self.countries.clone(),
            official_ratings: self.official_ratings.clone(),
        }
    }

    /// Sort from the flags layered over the saved preference.
    fn sort(&self, saved: SortDescriptor) -> SortDescriptor {
        let order = if self.desc {
            SortOrder::Descending
        } else if self.asc {
            SortOrder::Ascending
        } else {
            saved.order
        };
        SortDescriptor::new(self.sort.unwrap_or(saved.field), order)
    }
}

fn print_items<'a>(items: impl IntoIterator<Item = &'a MediaItem>, overlay: &UserOverlay, mode: ViewMode) {
    match mode {
        ViewMode::List => {
            for item in items {
                let favorite = item.is_favorite() || overlay.is_favorite(&item.id);
                let watched = item.is_played() || overlay.has_watched(&item.id);
                println!("{}", format::item_line(item, favorite, watched));
            }
        }
        ViewMode::Grid => {
            let cells: Vec<String> = items
                .into_iter()
                .map(|item| {
                    let year = item.production_year.map(|y| y.to_string()).unwrap_or_default();
                    format!("{:.28} {}", item.name, year)
                })
                .collect();
            for row in cells.chunks(3) {
                let line: Vec<String> = row.iter().map(|c| format!("{:<34}", c)).collect();
                println!("{}", line.join("").trim_end());
            }
        }
    }
}

pub async fn list(ctx: &mut Context, kind: ItemKind, args: ListArgs) -> Result<()> {
    let mut catalog = ctx.catalog()?;
    let mut store = LibraryStore::from_persisted(&ctx.state);

    if let Some(page_size) = args.page_size {
        store.set_page_size(page_size);
    }
    if let Some(view) = args.view {
        store.preferences_mut().view_mode = view;
    }
    store.set_sort(args.sort(store.sort()));

    let loaded = store.load(&mut catalog, kind, args.refresh).await;
    store.persist_into(&mut ctx.state);
    loaded?;

    if args.facets {
        let facets = facets(store.items());
        println!("Genres:  {}", facets.genres.into_iter().collect::<Vec<_>>().join(", "));
        println!("Studios: {}", facets.studios.into_iter().collect::<Vec<_>>().join(", "));
        println!(
            "Years:   {}",
            facets.years.iter().map(|y| y.to_string()).collect::<Vec<_>>().join(", ")
        );
        println!(
            "Ratings: {}",
            facets.official_ratings.into_iter().collect::<Vec<_>>().join(", ")
        );
        return Ok(());
    }

    store.set_filter(args.filter());
    let page = store.set_page(args.page);
    if page != args.page {
        println!("(page {} is out of range, showing page {})", args.page, page);
    }

    let view = store.view();
    print_items(view.items.iter().copied(), store.overlay(), store.preferences().view_mode);
    println!(
        "-- page {}/{} · {} of {} {} match",
        view.page,
        view.total_pages.max(1),
        view.total_count,
        store.items().len(),
        kind.api_name()
    );
    Ok(())
}

pub async fn latest(ctx: &mut Context, limit: usize, refresh: bool) -> Result<()> {
    let mut catalog = ctx.catalog()?;
    let items = catalog.latest_movies(limit, refresh).await?;
    let store = LibraryStore::from_persisted(&ctx.state);
    print_items(items.iter(), store.overlay(), ViewMode::List);
    Ok(())
}

pub async fn show(ctx: &mut Context, id: &str, refresh: bool) -> Result<()> {
    let mut catalog = ctx.catalog()?;
    let item = catalog.details(id, refresh).await?;
    let store = LibraryStore::from_persisted(&ctx.state);
    let overlay = store.overlay();

    let year = item.production_year.map(|y| format!(" ({})", y)).unwrap_or_default();
    println!("{}{}", item.name, year);
    if let Some(original) = item.original_title.as_deref().filter(|t| *t != item.name) {
        println!("  original title: {}", original);
    }
    println!(
        "  {} · {} · ★ {} · critics {}",
        item.official_rating.as_deref().unwrap_or("unrated"),
        item.run_time_ticks.map(format::runtime).unwrap_or_else(|| "-".into()),
        format::rating(item.community_rating),
        format::rating(item.critic_rating)
    );
    if !item.genres.is_empty() {
        println!("  genres: {}", item.genres.join(", "));
    }
    if !item.studios.is_empty() {
        let studios: Vec<&str> = item.studios.iter().map(|s| s.name.as_str()).collect();
        println!("  studios: {}", studios.join(", "));
    }
    let cast: Vec<&str> = item.people.iter().take(8).map(|p| p.name.as_str()).collect();
    if !cast.is_empty() {
        println!("  people: {}", cast.join(", "));
    }
    if let Some(overview) = &item.overview {
        println!("\n{}\n", overview);
    }

    let favorite = item.is_favorite() || overlay.is_favorite(&item.id);
    println!("  favorite: {}", if favorite { "yes" } else { "no" });
    if let Some(user_data) = &item.user_data {
        if user_data.playback_position_ticks > 0 {
            println!(
                "  resume at {}",
                format::clock(ticks_to_seconds(user_data.playback_position_ticks))
            );
        }
    }
    if let Some(record) = overlay.watch_record(&item.id) {
        println!(
            "  watched {:.0}% on {}",
            record.progress * 100.0,
            record.watched_at.format("%Y-%m-%d")
        );
    } else if item.is_played() {
        println!("  watched");
    }
    if let Some(rating) = overlay.rating(&item.id) {
        println!("  your rating: {:.1}", rating);
    }
    Ok(())
}

pub async fn favorite(ctx: &mut Context, id: &str) -> Result<()> {
    let mut catalog = ctx.catalog()?;
    let mut store = LibraryStore::from_persisted(&ctx.state);
    let item = catalog.details(id, true).await?;
    let name = item.name.clone();
    store.set_items(vec![item]);

    let result = store.toggle_favorite(&mut catalog, id).await;
    store.persist_into(&mut ctx.state);
    let favorite = result?;
    println!(
        "{} {} favorites",
        name,
        if favorite { "added to" } else { "removed from" }
    );
    Ok(())
}

pub fn rate(ctx: &mut Context, id: &str, rating: Option<f32>, clear: bool) -> Result<()> {
    let mut store = LibraryStore::from_persisted(&ctx.state);
    match (rating, clear) {
        (_, true) => {
            if !store.overlay_mut().clear_rating(id) {
                println!("{} had no rating", id);
            }
        }
        (Some(rating), false) => {
            store.overlay_mut().rate(id, rating)?;
            println!("Rated {} {:.1}/10", id, rating);
        }
        (None, false) => bail!("give a rating between 0 and 10, or --clear"),
    }
    store.persist_into(&mut ctx.state);
    Ok(())
}

pub async fn watched(ctx: &mut Context, id: &str, unset: bool) -> Result<()> {
    let mut catalog = ctx.catalog()?;
    let mut store = LibraryStore::from_persisted(&ctx.state);
    let result = if unset {
        match catalog.set_played(id, false).await {
            Ok(_) => {
                store.overlay_mut().forget_watch(id);
                Ok(())
            }
            Err(e) => Err(e),
        }
    } else {
        store.mark_watched(&mut catalog, id).await
    };
    store.persist_into(&mut ctx.state);
    result?;
    println!("{} marked {}", id, if unset { "unwatched" } else { "watched" });
    Ok(())
}

pub async fn history(ctx: &mut Context, limit: usize) -> Result<()> {
    let store = LibraryStore::from_persisted(&ctx.state);
    let history = store.overlay().history();
    if history.is_empty() {
        println!("Nothing watched yet");
        return Ok(());
    }

    // names come from the cache-backed catalog; fall back to the id offline
    let mut catalog = ctx.catalog().ok();
    for (id, record) in history.into_iter().take(limit) {
        let name = match catalog.as_mut() {
            Some(catalog) => catalog.details(id, false).await.map(|i| i.name).unwrap_or_else(|_| id.to_string()),
            None => id.to_string(),
        };
        println!(
            "{}  {:>3.0}%  {}",
            record.watched_at.format("%Y-%m-%d %H:%M"),
            record.progress * 100.0,
            name
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediadash::library::SortField;

    #[test]
    fn test_one_sided_bounds_are_open() {
        let args = ListArgs {
            year_min: Some(2000),
            rating_max: Some(7.5),
            ..Default::default()
        };
        let filter = args.filter();
        assert_eq!(filter.years, Some(Bounds::new(2000, i32::MAX)));
        assert_eq!(filter.rating.map(|b| b.max), Some(7.5));
        assert!(filter.runtime_minutes.is_none());
        assert!(filter.watched.is_none());
    }

    #[test]
    fn test_sort_flags_override_saved_preference() {
        let saved = SortDescriptor::new(SortField::Year, SortOrder::Descending);
        let keep = ListArgs::default();
        assert_eq!(keep.sort(saved), saved);

        let flip = ListArgs {
            sort: Some(SortField::Rating),
            asc: true,
            ..Default::default()
        };
        assert_eq!(
            flip.sort(saved),
            SortDescriptor::new(SortField::Rating, SortOrder::Ascending)
        );
    }
}
