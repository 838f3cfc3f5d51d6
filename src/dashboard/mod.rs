//! Service overview for Radarr and Sonarr. Each panel is fetched
//! concurrently and keeps its own `Result`, so one failing endpoint only
//! blanks its own section.

use crate::arr::ArrClient;
use crate::error::ApiResult;
use crate::format;
use crate::models::{DiskSpace, HealthCheck, QueuePage, SystemStatus};
use futures::future::join_all;
use std::fmt::Write;
use std::future::Future;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, instrument};

#[derive(Debug)]
pub struct ServicePanels {
    pub service: &'static str,
    pub status: ApiResult<SystemStatus>,
    pub disk_space: ApiResult<Vec<DiskSpace>>,
    pub health: ApiResult<Vec<HealthCheck>>,
    pub queue: ApiResult<QueuePage>,
}

/// Fetches every panel of one service, waiting for all of them to settle.
#[instrument(skip(arr), fields(service = arr.service()))]
pub async fn fetch_panels(arr: &ArrClient, queue_include: &str) -> ServicePanels {
    let (status, disk_space, health, queue) = tokio::join!(
        arr.system_status(),
        arr.disk_space(),
        arr.health(),
        arr.queue(queue_include),
    );
    debug!(
        "Panels settled: status={} disk={} health={} queue={}",
        status.is_ok(),
        disk_space.is_ok(),
        health.is_ok(),
        queue.is_ok()
    );
    ServicePanels {
        service: arr.service(),
        status,
        disk_space,
        health,
        queue,
    }
}

/// Panels for several services at once; each service settles independently.
pub async fn fetch_all(targets: &[(&ArrClient, &str)]) -> Vec<ServicePanels> {
    join_all(
        targets
            .iter()
            .map(|(arr, include)| fetch_panels(arr, include)),
    )
    .await
}

fn error_line(out: &mut String, panel: &str, err: &crate::error::ApiError) {
    let _ = writeln!(out, "  {:<8} unavailable: {}", panel, err);
}

pub fn render_panels(panels: &ServicePanels) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {} ==", panels.service);

    match &panels.status {
        Ok(status) => {
            let _ = writeln!(
                out,
                "  status   v{} on {}",
                status.version,
                status.os_name.as_deref().unwrap_or("unknown OS")
            );
        }
        Err(e) => error_line(&mut out, "status", e),
    }

    match &panels.disk_space {
        Ok(disks) if disks.is_empty() => {
            let _ = writeln!(out, "  disk     no mounts reported");
        }
        Ok(disks) => {
            for disk in disks {
                let _ = writeln!(
                    out,
                    "  disk     {:<24} {} free of {}",
                    disk.label.as_deref().unwrap_or(&disk.path),
                    format::bytes(disk.free_space),
                    format::bytes(disk.total_space)
                );
            }
        }
        Err(e) => error_line(&mut out, "disk", e),
    }

    match &panels.health {
        Ok(checks) if checks.is_empty() => {
            let _ = writeln!(out, "  health   ok");
        }
        Ok(checks) => {
            for check in checks {
                let _ = writeln!(
                    out,
                    "  health   [{}] {}",
                    check.level.as_deref().unwrap_or("notice"),
                    check.message
                );
            }
        }
        Err(e) => error_line(&mut out, "health", e),
    }

    match &panels.queue {
        Ok(queue) => {
            let _ = writeln!(out, "  queue    {} item(s)", queue.total_records);
            render_queue_records(&mut out, queue);
        }
        Err(e) => error_line(&mut out, "queue", e),
    }

    out
}

fn render_queue_records(out: &mut String, queue: &QueuePage) {
    for record in &queue.records {
        let _ = writeln!(
            out,
            "    {:>5.1}%  {:<40} {} {}",
            record.progress_percent(),
            record.title,
            record.status.as_deref().unwrap_or("-"),
            record.timeleft.as_deref().unwrap_or("")
        );
        if let Some(message) = &record.error_message {
            let _ = writeln!(out, "           ! {}", message);
        }
    }
}

/// Queue-only rendering used by the polling view.
pub fn render_queue(service: &str, queue: &ApiResult<QueuePage>) -> String {
    let mut out = String::new();
    match queue {
        Ok(queue) => {
            let _ = writeln!(out, "{}: {} item(s)", service, queue.total_records);
            render_queue_records(&mut out, queue);
        }
        Err(e) => {
            let _ = writeln!(out, "{}: unavailable: {}", service, e);
        }
    }
    out
}

/// Runs `poll_once` immediately and then every `period` until `shutdown`
/// resolves. A poll already in flight is allowed to finish. Returns the
/// number of completed polls.
pub async fn poll_until<F, Fut, S>(period: Duration, shutdown: S, mut poll_once: F) -> usize
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
    S: Future<Output = ()>,
{
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    let mut polls = 0;
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Stopping after {} poll(s)", polls);
                break;
            }
            _ = ticker.tick() => {
                poll_once().await;
                polls += 1;
            }
        }
    }
    polls
}
