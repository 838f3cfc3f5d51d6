mod arr;

pub use arr::*;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Runtime unit used by Jellyfin and Emby.
pub const TICKS_PER_SECOND: i64 = 10_000_000;

pub fn ticks_to_seconds(ticks: i64) -> f64 {
    ticks as f64 / TICKS_PER_SECOND as f64
}

pub fn seconds_to_ticks(seconds: f64) -> i64 {
    (seconds * TICKS_PER_SECOND as f64).round() as i64
}

/// Parses the server date formats seen in the wild: RFC 3339, and the
/// zone-less `2023-05-01T10:00:00.0000000` that older Emby builds send.
pub fn parse_server_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Some(date.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn lenient_date<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_server_date))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    Movie,
    Series,
    Season,
    Episode,
    BoxSet,
    #[serde(other)]
    Other,
}

impl ItemKind {
    pub fn api_name(&self) -> &'static str {
        match self {
            ItemKind::Movie => "Movie",
            ItemKind::Series => "Series",
            ItemKind::Season => "Season",
            ItemKind::Episode => "Episode",
            ItemKind::BoxSet => "BoxSet",
            ItemKind::Other => "Other",
        }
    }
}

/// An item as reported by Jellyfin/Emby. The server owns this shape; anything
/// may be missing, so nearly everything is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MediaItem {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub original_title: Option<String>,
    pub sort_name: Option<String>,
    #[serde(rename = "Type")]
    pub kind: Option<ItemKind>,
    pub production_year: Option<i32>,
    pub run_time_ticks: Option<i64>,
    pub community_rating: Option<f64>,
    pub critic_rating: Option<f64>,
    pub official_rating: Option<String>,
    pub overview: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub studios: Vec<NamedRef>,
    #[serde(default)]
    pub production_locations: Vec<String>,
    #[serde(default)]
    pub people: Vec<Person>,
    #[serde(default)]
    pub image_tags: HashMap<String, String>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub date_created: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub premiere_date: Option<DateTime<Utc>>,
    pub user_data: Option<UserData>,
}

impl MediaItem {
    pub fn runtime_minutes(&self) -> Option<f64> {
        self.run_time_ticks.map(|t| ticks_to_seconds(t) / 60.0)
    }

    pub fn is_played(&self) -> bool {
        self.user_data.as_ref().map(|u| u.played).unwrap_or(false)
    }

    pub fn is_favorite(&self) -> bool {
        self.user_data.as_ref().map(|u| u.is_favorite).unwrap_or(false)
    }

    pub fn user_data_mut(&mut self) -> &mut UserData {
        self.user_data.get_or_insert_with(UserData::default)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NamedRef {
    #[serde(default)]
    pub name: String,
    pub id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Person {
    #[serde(default)]
    pub name: String,
    pub role: Option<String>,
    #[serde(rename = "Type")]
    pub person_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserData {
    #[serde(default)]
    pub played: bool,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub playback_position_ticks: i64,
    #[serde(default)]
    pub play_count: u32,
    pub played_percentage: Option<f64>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub last_played_date: Option<DateTime<Utc>>,
}

/// Envelope of item list endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ItemsResponse {
    #[serde(default)]
    pub items: Vec<MediaItem>,
    #[serde(default)]
    pub total_record_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AuthenticationResult {
    pub access_token: String,
    pub user: AuthenticatedUser,
    pub server_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AuthenticatedUser {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlaybackInfo {
    #[serde(default)]
    pub media_sources: Vec<MediaSource>,
    pub play_session_id: Option<String>,
    pub error_code: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MediaSource {
    #[serde(default)]
    pub id: String,
    pub container: Option<String>,
    #[serde(default)]
    pub supports_direct_play: bool,
    #[serde(default)]
    pub supports_direct_stream: bool,
    #[serde(default)]
    pub supports_transcoding: bool,
    pub transcoding_url: Option<String>,
    pub run_time_ticks: Option<i64>,
}

/// Body of the `/Sessions/Playing*` reports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlaybackReport {
    pub item_id: String,
    pub media_source_id: Option<String>,
    pub play_session_id: Option<String>,
    pub position_ticks: i64,
    pub is_paused: bool,
    pub is_muted: bool,
    pub volume_level: u8,
    pub play_method: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_decodes_pascal_case_json() {
        let json = r#"{
            "Id": "abc",
            "Name": "Heat",
            "Type": "Movie",
            "ProductionYear": 1995,
            "RunTimeTicks": 102000000000,
            "CommunityRating": 8.3,
            "Genres": ["Crime", "Drama"],
            "Studios": [{"Name": "Warner Bros.", "Id": "1"}],
            "ImageTags": {"Primary": "tag1"},
            "DateCreated": "2023-05-01T10:00:00.0000000Z",
            "UserData": {"Played": true, "IsFavorite": false, "PlaybackPositionTicks": 0, "PlayCount": 2}
        }"#;
        let item: MediaItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.name, "Heat");
        assert_eq!(item.kind, Some(ItemKind::Movie));
        assert_eq!(item.runtime_minutes(), Some(170.0));
        assert!(item.is_played());
        assert!(!item.is_favorite());
        assert_eq!(item.studios[0].name, "Warner Bros.");
        assert!(item.date_created.is_some());
    }

    #[test]
    fn test_unknown_kind_is_other() {
        let item: MediaItem = serde_json::from_str(r#"{"Id":"1","Name":"x","Type":"MusicAlbum"}"#).unwrap();
        assert_eq!(item.kind, Some(ItemKind::Other));
    }

    #[test]
    fn test_zone_less_and_garbage_dates() {
        let item: MediaItem = serde_json::from_str(
            r#"{"Id":"1","Name":"x","DateCreated":"2020-01-02T03:04:05.1234567","PremiereDate":"soon"}"#,
        )
        .unwrap();
        let expected = chrono::TimeZone::with_ymd_and_hms(&Utc, 2020, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(item.date_created.unwrap().timestamp(), expected.timestamp());
        assert!(item.premiere_date.is_none());
    }

    #[test]
    fn test_tick_conversion() {
        assert_eq!(seconds_to_ticks(1.5), 15_000_000);
        assert_eq!(ticks_to_seconds(TICKS_PER_SECOND * 90), 90.0);
    }
}
