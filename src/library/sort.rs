use crate::models::MediaItem;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    #[default]
    Title,
    Year,
    Rating,
    Runtime,
    DateAdded,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortDescriptor {
    pub field: SortField,
    pub order: SortOrder,
}

impl SortDescriptor {
    pub fn new(field: SortField, order: SortOrder) -> Self {
        Self { field, order }
    }

    pub fn compare(&self, a: &MediaItem, b: &MediaItem) -> Ordering {
        let ordering = match self.field {
            SortField::Title => title_key(a).cmp(&title_key(b)),
            SortField::Year => a.production_year.unwrap_or(0).cmp(&b.production_year.unwrap_or(0)),
            SortField::Rating => a
                .community_rating
                .unwrap_or(0.0)
                .total_cmp(&b.community_rating.unwrap_or(0.0)),
            SortField::Runtime => a.run_time_ticks.unwrap_or(0).cmp(&b.run_time_ticks.unwrap_or(0)),
            // missing dates sort as the Unix epoch
            SortField::DateAdded => added_millis(a).cmp(&added_millis(b)),
        };
        match self.order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    }
}

fn title_key(item: &MediaItem) -> String {
    item.sort_name
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or(&item.name)
        .to_lowercase()
}

fn added_millis(item: &MediaItem) -> i64 {
    item.date_created.map(|d| d.timestamp_millis()).unwrap_or(0)
}

/// Stable sort by the descriptor's single field. Ties keep their input order.
pub fn sort_items(items: &mut [&MediaItem], descriptor: &SortDescriptor) {
    items.sort_by(|a, b| descriptor.compare(a, b));
}
