use super::{DisplayPreferences, ServerSession, UserOverlay, WatchRecord};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const STATE_VERSION: u32 = 1;

/// On-disk form of the overlay: sets become arrays, maps become arrays of
/// pairs. Sorted so the file diffs cleanly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PersistedOverlay {
    pub favorites: Vec<String>,
    pub watch_history: Vec<(String, WatchRecord)>,
    pub ratings: Vec<(String, f32)>,
}

impl From<&UserOverlay> for PersistedOverlay {
    fn from(overlay: &UserOverlay) -> Self {
        let mut favorites: Vec<String> = overlay.favorites.iter().cloned().collect();
        favorites.sort();

        let mut watch_history: Vec<(String, WatchRecord)> = overlay
            .watch_history
            .iter()
            .map(|(id, record)| (id.clone(), record.clone()))
            .collect();
        watch_history.sort_by(|a, b| a.0.cmp(&b.0));

        let mut ratings: Vec<(String, f32)> = overlay
            .ratings
            .iter()
            .map(|(id, rating)| (id.clone(), *rating))
            .collect();
        ratings.sort_by(|a, b| a.0.cmp(&b.0));

        Self {
            favorites,
            watch_history,
            ratings,
        }
    }
}

impl From<PersistedOverlay> for UserOverlay {
    fn from(persisted: PersistedOverlay) -> Self {
        Self {
            favorites: persisted.favorites.into_iter().collect(),
            watch_history: persisted.watch_history.into_iter().collect(),
            ratings: persisted.ratings.into_iter().collect(),
        }
    }
}

/// Everything that survives a restart. The catalog itself never does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PersistedState {
    pub version: u32,
    pub session: Option<ServerSession>,
    pub preferences: DisplayPreferences,
    pub overlay: PersistedOverlay,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            session: None,
            preferences: DisplayPreferences::default(),
            overlay: PersistedOverlay::default(),
        }
    }
}

/// `state.json` -> `state.json.<suffix>`, next to the original.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

/// Reads the state file. A missing file is a fresh start. A file that does
/// not parse is moved to `<name>.bak` so the next save cannot overwrite it.
pub fn load_state(path: &Path) -> Result<PersistedState> {
    if !path.exists() {
        debug!("No state file at {:?}, starting fresh", path);
        return Ok(PersistedState::default());
    }

    let content = std::fs::read_to_string(path)?;
    match serde_json::from_str::<PersistedState>(&content) {
        Ok(state) => {
            debug!(
                "Loaded state: {} favorites, {} history entries, {} ratings",
                state.overlay.favorites.len(),
                state.overlay.watch_history.len(),
                state.overlay.ratings.len()
            );
            Ok(state)
        }
        Err(e) => {
            let backup = sibling(path, "bak");
            std::fs::rename(path, &backup)
                .with_context(|| format!("Failed to move unreadable state file {:?} aside", path))?;
            warn!(
                "State file {:?} could not be read ({}), kept it as {:?} and starting fresh",
                path, e, backup
            );
            Ok(PersistedState::default())
        }
    }
}

/// Writes to a temporary sibling and renames it over `path`, so a crash
/// leaves either the old file or the new one.
pub fn save_state(path: &Path, state: &PersistedState) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(state)?;
    let staging = sibling(path, "tmp");
    std::fs::write(&staging, json)
        .with_context(|| format!("Failed to write {:?}", staging))?;
    std::fs::rename(&staging, path)
        .with_context(|| format!("Failed to replace {:?}", path))?;
    info!("State saved to {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_overlay_survives_array_encoding() {
        let mut overlay = UserOverlay::default();
        overlay.set_favorite("b", true);
        overlay.set_favorite("a", true);
        overlay.record_watch("m1", 0.5);
        overlay.rate("m1", 7.5).unwrap();

        let persisted = PersistedOverlay::from(&overlay);
        assert_eq!(persisted.favorites, vec!["a".to_string(), "b".to_string()]);

        let json = serde_json::to_value(&persisted).unwrap();
        assert!(json["favorites"].is_array());
        assert!(json["watchHistory"][0].is_array());

        let restored: UserOverlay = serde_json::from_value::<PersistedOverlay>(json).unwrap().into();
        assert_eq!(restored, overlay);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let mut state = PersistedState::default();
        state.session = Some(ServerSession {
            server_url: "http://jf:8096".to_string(),
            device_id: "dev".to_string(),
            access_token: Some("tok".to_string()),
            user_id: Some("u".to_string()),
        });
        state.preferences.page_size = 48;
        state.overlay.favorites = vec!["x".to_string()];
        state.overlay.watch_history = vec![(
            "x".to_string(),
            WatchRecord {
                watched_at: Utc::now(),
                progress: 1.0,
            },
        )];

        save_state(&path, &state).unwrap();
        let loaded = load_state(&path).unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn test_missing_file_is_a_fresh_start() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        assert_eq!(load_state(&path).unwrap(), PersistedState::default());
    }

    #[test]
    fn test_unreadable_file_is_kept_aside_across_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let original = r#"{"version":1,"overlay":{"favorites":["x","y"],"ratings":[["x","9"]]}}"#;
        std::fs::write(&path, original).unwrap();

        let state = load_state(&path).unwrap();
        assert_eq!(state, PersistedState::default());
        save_state(&path, &state).unwrap();

        let backup = dir.path().join("state.json.bak");
        assert_eq!(std::fs::read_to_string(&backup).unwrap(), original);
        assert_eq!(load_state(&path).unwrap(), state);
    }

    #[test]
    fn test_save_leaves_no_staging_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        save_state(&path, &PersistedState::default()).unwrap();
        save_state(&path, &PersistedState::default()).unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![OsString::from("state.json")]);
    }
}
