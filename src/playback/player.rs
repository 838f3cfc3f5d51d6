use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const SKIP_SECONDS: f64 = 30.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlayerState {
    Loading,
    Playing,
    Paused,
    Ended,
    Error(String),
}

/// What the underlying media element reports.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    Playing,
    Pause,
    Play,
    TimeUpdate(f64),
    Ended,
    Error(String),
}

/// Playback session state. Transitions come only from `PlayerEvent`s;
/// transport controls change position, volume and display.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    state: PlayerState,
    position: f64,
    duration: Option<f64>,
    volume: f32,
    muted: bool,
    fullscreen: bool,
}

impl Player {
    pub fn new(duration: Option<f64>) -> Self {
        Self {
            state: PlayerState::Loading,
            position: 0.0,
            duration: duration.filter(|d| *d > 0.0),
            volume: 1.0,
            muted: false,
            fullscreen: false,
        }
    }

    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn is_paused(&self) -> bool {
        self.state == PlayerState::Paused
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, PlayerState::Playing | PlayerState::Paused)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, PlayerState::Ended | PlayerState::Error(_))
    }

    /// Fraction of the duration reached, when the duration is known.
    pub fn progress(&self) -> Option<f64> {
        self.duration.map(|d| (self.position / d).clamp(0.0, 1.0))
    }

    /// Applies an event. Returns `false` when it does not apply in the
    /// current state.
    pub fn handle(&mut self, event: PlayerEvent) -> bool {
        let next = match (&self.state, event) {
            (PlayerState::Loading, PlayerEvent::Playing) => PlayerState::Playing,
            (PlayerState::Paused, PlayerEvent::Play | PlayerEvent::Playing) => PlayerState::Playing,
            (PlayerState::Playing, PlayerEvent::Pause) => PlayerState::Paused,
            (PlayerState::Playing | PlayerState::Paused, PlayerEvent::Ended) => {
                if let Some(duration) = self.duration {
                    self.position = duration;
                }
                PlayerState::Ended
            }
            (PlayerState::Loading | PlayerState::Playing, PlayerEvent::Error(message)) => {
                warn!("Playback error: {}", message);
                PlayerState::Error(message)
            }
            (PlayerState::Playing | PlayerState::Paused, PlayerEvent::TimeUpdate(position)) => {
                self.position = self.clamp_position(position);
                return true;
            }
            (state, event) => {
                debug!("Ignoring {:?} while {:?}", event, state);
                return false;
            }
        };
        debug!("Player {:?} -> {:?}", self.state, next);
        self.state = next;
        true
    }

    fn clamp_position(&self, position: f64) -> f64 {
        let position = position.max(0.0);
        match self.duration {
            Some(duration) => position.min(duration),
            None => position,
        }
    }

    pub fn seek(&mut self, position: f64) {
        self.position = self.clamp_position(position);
    }

    pub fn skip_forward(&mut self) {
        self.seek(self.position + SKIP_SECONDS);
    }

    pub fn skip_back(&mut self) {
        self.seek(self.position - SKIP_SECONDS);
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        if self.volume > 0.0 {
            self.muted = false;
        }
    }

    pub fn toggle_mute(&mut self) {
        self.muted = !self.muted;
    }

    pub fn toggle_fullscreen(&mut self) {
        self.fullscreen = !self.fullscreen;
    }
}
