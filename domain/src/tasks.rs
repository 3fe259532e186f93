//! Background task runner.
//!
//! Short periodic jobs that keep the registry honest when callbacks never
//! arrive: the stuck-request reaper (dispatches whose spawn never concluded)
//! and the orphan-worker reaper (workers that died without an exit callback).
//! Each job is a cooperative tokio task on a fixed interval; one slow tick
//! never blocks another meeting's progress.

use crate::exit;
use crate::lifecycle::LifecycleManager;
use bot_worker::types::worker::{WorkerRef, WorkerState};
use chrono::{Duration as ChronoDuration, Utc};
use entity::meeting_status::MeetingStatus;
use entity_api::meeting as registry;
use log::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

const REAPER_INTERVAL: Duration = Duration::from_secs(60);

/// Spawns the periodic jobs; handles are returned so main can abort them on
/// shutdown.
pub fn spawn_background_tasks(lifecycle: Arc<LifecycleManager>) -> Vec<JoinHandle<()>> {
    let stuck = {
        let lifecycle = Arc::clone(&lifecycle);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(REAPER_INTERVAL);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = reap_stuck_requests(&lifecycle).await {
                    warn!("Stuck-request reaper tick failed: {e}");
                }
            }
        })
    };

    let orphans = {
        let lifecycle = Arc::clone(&lifecycle);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(REAPER_INTERVAL);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = reap_orphan_workers(&lifecycle).await {
                    warn!("Orphan-worker reaper tick failed: {e}");
                }
            }
        })
    };

    vec![stuck, orphans]
}

/// Fails meetings that sat in `requested` past twice the spawn deadline;
/// their dispatch died between the registry write and the substrate call.
async fn reap_stuck_requests(
    lifecycle: &Arc<LifecycleManager>,
) -> Result<(), crate::error::Error> {
    let deadline = lifecycle.config().spawn_deadline_secs as i64;
    let cutoff = Utc::now() - ChronoDuration::seconds(deadline * 2);

    let stuck = registry::list_stuck_requested(lifecycle.db(), cutoff.into()).await?;
    for meeting in stuck {
        warn!("Reaping stuck request: meeting {}", meeting.id);
        let _ = lifecycle
            .finalize(
                meeting.id,
                &[MeetingStatus::Requested],
                exit::Terminal::failed(entity::failure_stage::FailureStage::Spawn),
                Some("dispatch never reached the worker substrate".to_string()),
            )
            .await;
    }
    Ok(())
}

/// Fails meetings whose worker is gone without an exit callback. The exit
/// code, when the substrate still has one, goes through the normal reducer.
async fn reap_orphan_workers(
    lifecycle: &Arc<LifecycleManager>,
) -> Result<(), crate::error::Error> {
    let meetings = registry::list_non_terminal(lifecycle.db()).await?;

    for meeting in meetings {
        if !meeting.status.has_worker() {
            continue;
        }
        let Some(worker_ref) = meeting.worker_ref.clone() else {
            continue;
        };

        let state = match lifecycle
            .orchestrator()
            .inspect(&WorkerRef(worker_ref))
            .await
        {
            Ok(state) => state,
            Err(e) => {
                debug!("Orphan reaper could not inspect meeting {}: {e}", meeting.id);
                continue;
            }
        };

        let terminal = match state {
            WorkerState::Running => continue,
            WorkerState::Exited { code } => exit::map_exit(None, Some(code), None),
            WorkerState::Missing => exit::heartbeat_lost(),
        };

        warn!(
            "Reaping orphaned worker of meeting {} ({state:?})",
            meeting.id
        );
        let _ = lifecycle
            .finalize(
                meeting.id,
                &MeetingStatus::non_terminal(),
                terminal,
                Some("worker exited without an exit callback".to_string()),
            )
            .await;
    }
    Ok(())
}
