use super::player::{Player, PlayerEvent, PlayerState};
use super::ResolvedStream;
use crate::media_server::MediaServer;
use crate::models::{seconds_to_ticks, PlaybackReport};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Tells the server what is being watched: once when playback starts, on a
/// fixed interval while it runs, and once when it stops.
pub struct ProgressReporter {
    server: Arc<dyn MediaServer>,
    item_id: String,
    stream: ResolvedStream,
    interval: Duration,
    started: bool,
}

impl ProgressReporter {
    pub fn new(
        server: Arc<dyn MediaServer>,
        item_id: &str,
        stream: ResolvedStream,
        interval: Duration,
    ) -> Self {
        Self {
            server,
            item_id: item_id.to_string(),
            stream,
            interval,
            started: false,
        }
    }

    fn report(&self, player: &Player) -> PlaybackReport {
        PlaybackReport {
            item_id: self.item_id.clone(),
            media_source_id: Some(self.stream.media_source_id.clone()),
            play_session_id: self.stream.play_session_id.clone(),
            position_ticks: seconds_to_ticks(player.position()),
            is_paused: player.is_paused(),
            is_muted: player.is_muted(),
            volume_level: (player.volume() * 100.0).round() as u8,
            play_method: Some(self.stream.method.api_name().to_string()),
        }
    }

    async fn start(&mut self, player: &Player) {
        if self.started {
            return;
        }
        self.started = true;
        match self.server.report_playback_start(&self.report(player)).await {
            Ok(()) => info!("Reported playback start for {}", self.item_id),
            Err(e) => warn!("Failed to report playback start: {}", e),
        }
    }

    async fn progress(&self, player: &Player) {
        if let Err(e) = self.server.report_playback_progress(&self.report(player)).await {
            warn!("Failed to report playback progress: {}", e);
        }
    }

    async fn stopped(&self, player: &Player) {
        if !self.started {
            return;
        }
        match self.server.report_playback_stopped(&self.report(player)).await {
            Ok(()) => info!(
                "Reported playback stop for {} at {:.0}s",
                self.item_id,
                player.position()
            ),
            Err(e) => warn!("Failed to report playback stop: {}", e),
        }
    }

    /// Drives `player` from `events` until it reaches a terminal state or the
    /// sender goes away, then returns the final player.
    pub async fn run(mut self, mut player: Player, mut events: mpsc::Receiver<PlayerEvent>) -> Player {
        debug!("Reporting progress for {} every {:?}", self.item_id, self.interval);
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else {
                        debug!("Player event source closed");
                        break;
                    };
                    if !player.handle(event) {
                        continue;
                    }
                    match player.state() {
                        PlayerState::Playing => self.start(&player).await,
                        PlayerState::Paused => self.progress(&player).await,
                        PlayerState::Ended | PlayerState::Error(_) => break,
                        PlayerState::Loading => {}
                    }
                }
                _ = ticker.tick() => {
                    if player.is_active() {
                        self.progress(&player).await;
                    }
                }
            }
        }

        self.stopped(&player).await;
        player
    }
}
