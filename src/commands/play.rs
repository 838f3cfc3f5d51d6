use super::{Context, PlayArgs};
use anyhow::{Context as _, Result};
use mediadash::format;
use mediadash::models::ticks_to_seconds;
use mediadash::playback::{resolve_stream, Player, PlayerEvent, ProgressReporter};
use mediadash::store::LibraryStore;
use std::process::ExitStatus;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::time::{interval, Instant};
use tracing::{info, warn};

/// Fraction after which a session counts as a full watch.
const WATCHED_THRESHOLD: f64 = 0.9;
/// Closer than this to the end and the player exiting means it finished.
const ENDED_THRESHOLD: f64 = 0.97;

enum PlayerExit {
    Finished(ExitStatus),
    Interrupted,
    Lost(std::io::Error),
}

/// The event that closes the session once the player process is gone.
/// `None` leaves the reporter to treat it as a teardown.
fn closing_event(
    exit: &PlayerExit,
    program: &str,
    reached: f64,
    duration: Option<f64>,
) -> Option<PlayerEvent> {
    match exit {
        PlayerExit::Finished(status) if !status.success() => Some(PlayerEvent::Error(format!(
            "{} exited with {}",
            program, status
        ))),
        PlayerExit::Finished(_) if duration.is_some_and(|d| reached >= d * ENDED_THRESHOLD) => {
            Some(PlayerEvent::Ended)
        }
        PlayerExit::Lost(e) => Some(PlayerEvent::Error(format!(
            "failed waiting for {}: {}",
            program, e
        ))),
        _ => None,
    }
}

pub async fn play(ctx: &mut Context, args: PlayArgs) -> Result<()> {
    let mut catalog = ctx.catalog()?;
    let item = catalog.details(&args.id, false).await?;

    let start = if args.resume {
        item.user_data
            .as_ref()
            .map(|u| ticks_to_seconds(u.playback_position_ticks))
            .unwrap_or(0.0)
    } else {
        args.start.unwrap_or(0.0)
    };

    let server = catalog.server();
    let stream = resolve_stream(
        server.as_ref(),
        &item.id,
        args.stream,
        ctx.config.max_streaming_bitrate(),
        start,
    )
    .await?;

    let Some(player_command) = ctx.config.player_command().filter(|_| !args.print_url) else {
        println!("{}", stream.url);
        return Ok(());
    };
    let mut parts = player_command.split_whitespace();
    let program = parts.next().context("playback.player is empty")?;

    let duration = stream
        .duration_seconds
        .or_else(|| item.run_time_ticks.map(ticks_to_seconds));
    let reporter = ProgressReporter::new(
        server,
        &item.id,
        stream.clone(),
        ctx.config.report_interval(),
    );
    let (events, receiver) = mpsc::channel(16);
    let session = tokio::spawn(reporter.run(Player::new(duration), receiver));

    println!("Playing {} via {} ({})", item.name, program, stream.method.api_name());
    let mut child = Command::new(program)
        .args(parts)
        .arg(&stream.url)
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("Failed to launch {}", program))?;

    // the external player reports nothing back, so position is wall time
    let _ = events.send(PlayerEvent::Playing).await;
    if start > 0.0 {
        let _ = events.send(PlayerEvent::TimeUpdate(start)).await;
    }
    let launched = Instant::now();
    let mut ticker = interval(Duration::from_secs(1));
    let position = |at: Instant| start + at.duration_since(launched).as_secs_f64();

    let exit = loop {
        tokio::select! {
            status = child.wait() => break match status {
                Ok(status) => PlayerExit::Finished(status),
                Err(e) => PlayerExit::Lost(e),
            },
            _ = ticker.tick() => {
                let _ = events.send(PlayerEvent::TimeUpdate(position(Instant::now()))).await;
            }
            _ = tokio::signal::ctrl_c() => break PlayerExit::Interrupted,
        }
    };
    if let PlayerExit::Interrupted = exit {
        info!("Interrupted, stopping player");
        if let Err(e) = child.kill().await {
            warn!("Failed to stop player: {}", e);
        }
    }

    let reached = position(Instant::now());
    let _ = events.send(PlayerEvent::TimeUpdate(reached)).await;
    if let Some(event) = closing_event(&exit, program, reached, duration) {
        let _ = events.send(event).await;
    }
    drop(events);
    let player = session.await.context("Progress reporter panicked")?;
    if let PlayerExit::Lost(e) = exit {
        return Err(e).with_context(|| format!("Lost track of {}", program));
    }

    let progress = player.progress().unwrap_or(0.0);
    println!(
        "Stopped at {} ({:.0}%)",
        format::clock(player.position()),
        progress * 100.0
    );

    let mut store = LibraryStore::from_persisted(&ctx.state);
    let result = if progress >= WATCHED_THRESHOLD {
        store.mark_watched(&mut catalog, &item.id).await
    } else {
        store.overlay_mut().record_watch(&item.id, progress);
        Ok(())
    };
    store.persist_into(&mut ctx.state);
    if let Err(e) = result {
        warn!("Failed to mark {} watched: {}", item.name, e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[cfg(unix)]
    fn status(code: i32) -> ExitStatus {
        use std::os::unix::process::ExitStatusExt;
        ExitStatus::from_raw(code << 8)
    }

    #[test]
    fn test_lost_player_closes_with_error() {
        let exit = PlayerExit::Lost(io::Error::new(io::ErrorKind::Other, "wait failed"));
        match closing_event(&exit, "mpv", 12.0, Some(100.0)) {
            Some(PlayerEvent::Error(message)) => assert!(message.contains("wait failed")),
            other => panic!("expected an error event, got {other:?}"),
        }
    }

    #[test]
    fn test_interrupt_is_a_teardown() {
        assert_eq!(closing_event(&PlayerExit::Interrupted, "mpv", 99.0, Some(100.0)), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_clean_exit_near_the_end_is_ended() {
        let done = PlayerExit::Finished(status(0));
        assert_eq!(closing_event(&done, "mpv", 98.0, Some(100.0)), Some(PlayerEvent::Ended));
        assert_eq!(closing_event(&done, "mpv", 50.0, Some(100.0)), None);
        assert_eq!(closing_event(&done, "mpv", 50.0, None), None);

        let failed = PlayerExit::Finished(status(2));
        assert!(matches!(
            closing_event(&failed, "mpv", 98.0, Some(100.0)),
            Some(PlayerEvent::Error(_))
        ));
    }
}
