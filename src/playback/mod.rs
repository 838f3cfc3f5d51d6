//! Stream resolution, the player state machine and progress reporting.

mod player;
mod reporter;

pub use player::{Player, PlayerEvent, PlayerState, SKIP_SECONDS};
pub use reporter::ProgressReporter;

use crate::error::{ApiError, ApiResult};
use crate::media_server::{MediaServer, PlayMethod, PlaybackInfoRequest};
use crate::models::{seconds_to_ticks, ticks_to_seconds};
use clap::ValueEnum;
use tracing::{info, instrument};

/// How hard to try to avoid server-side work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum StreamPreference {
    /// Direct play, then remux, then transcode, as the server allows.
    #[default]
    Auto,
    /// Never send the file as-is; remux when possible.
    DirectStream,
    /// Always re-encode.
    Transcode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStream {
    pub url: String,
    pub method: PlayMethod,
    pub media_source_id: String,
    pub play_session_id: Option<String>,
    pub duration_seconds: Option<f64>,
}

fn choose_method(
    preference: StreamPreference,
    direct_play: bool,
    direct_stream: bool,
    transcoding: bool,
) -> Option<PlayMethod> {
    match preference {
        StreamPreference::Auto if direct_play => Some(PlayMethod::DirectPlay),
        StreamPreference::Auto | StreamPreference::DirectStream if direct_stream => {
            Some(PlayMethod::DirectStream)
        }
        StreamPreference::Auto | StreamPreference::DirectStream if transcoding => {
            Some(PlayMethod::Transcode)
        }
        StreamPreference::Transcode => Some(PlayMethod::Transcode),
        _ => None,
    }
}

/// Negotiates playback with the server and builds the URL to hand to a
/// player.
#[instrument(skip(server))]
pub async fn resolve_stream(
    server: &dyn MediaServer,
    item_id: &str,
    preference: StreamPreference,
    max_streaming_bitrate: u64,
    start_seconds: f64,
) -> ApiResult<ResolvedStream> {
    let forced = preference != StreamPreference::Auto;
    let request = PlaybackInfoRequest {
        user_id: None,
        max_streaming_bitrate,
        start_time_ticks: seconds_to_ticks(start_seconds.max(0.0)),
        enable_direct_play: !forced,
        enable_direct_stream: preference != StreamPreference::Transcode,
        enable_transcoding: true,
        auto_open_live_stream: false,
    };
    let info = server.playback_info(item_id, &request).await?;

    if let Some(code) = info.error_code.as_deref() {
        return Err(ApiError::NoMediaSource(format!("{} ({})", item_id, code)));
    }
    let source = info
        .media_sources
        .first()
        .ok_or_else(|| ApiError::NoMediaSource(item_id.to_string()))?;

    let method = choose_method(
        preference,
        source.supports_direct_play,
        source.supports_direct_stream,
        source.supports_transcoding || source.transcoding_url.is_some(),
    )
    .ok_or_else(|| ApiError::NoMediaSource(item_id.to_string()))?;

    let url = server.stream_url(item_id, source, method, info.play_session_id.as_deref())?;
    info!("Resolved {} stream for {}", method.api_name(), item_id);

    Ok(ResolvedStream {
        url,
        method,
        media_source_id: source.id.clone(),
        play_session_id: info.play_session_id.clone(),
        duration_seconds: source.run_time_ticks.map(ticks_to_seconds),
    })
}
