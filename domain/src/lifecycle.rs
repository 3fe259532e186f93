//! The per-meeting lifecycle state machine.
//!
//! One `LifecycleManager` per orchestrator process translates external events
//! (dispatch requests, worker callbacks, operator commands, timer expiries)
//! into registry transitions and side effects. The registry's conditional
//! update is the only synchronization point: racing events serialize there,
//! and a loser observing `StaleTransition` treats it as "already handled".
//!
//! Timers are owned here as cancellable tasks in a per-meeting table, never
//! as sleeps inside callback handlers, so cancellation is uniform: the
//! terminal transition aborts every timer a meeting still has.

use crate::command_bus::CommandBus;
use crate::error::{DomainErrorKind, EntityErrorKind, Error, InternalErrorKind};
use crate::exit::{self, Terminal};
use bot_worker::types::callback::{StatusCallback, WorkerStatus};
use bot_worker::types::command::BotCommand;
use bot_worker::types::worker::{StartRequest, WorkerRef, WorkerState};
use bot_worker::Orchestrator;
use chrono::Utc;
use dashmap::DashMap;
use entity::completion_reason::CompletionReason;
use entity::failure_stage::FailureStage;
use entity::meeting_status::MeetingStatus;
use entity::meetings::{MeetingConfig, Model as Meeting};
use entity::platform::Platform;
use entity::recording_source::RecordingSource;
use entity::users::Model as User;
use entity::Id;
use entity_api::error::EntityApiErrorKind;
use entity_api::meeting::{self as registry, TransitionPatch};
use entity_api::{recording, user as user_api};
use events::{DomainEvent, EventPublisher};
use log::*;
use rand::distributions::Alphanumeric;
use rand::Rng;
use sea_orm::DatabaseConnection;
use service::config::Config;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// A dispatch request after HTTP validation.
#[derive(Debug, Clone)]
pub struct DispatchParams {
    pub platform: Platform,
    pub native_meeting_id: String,
    pub passcode: Option<String>,
    pub config: MeetingConfig,
}

#[derive(Default)]
struct MeetingTimers {
    admission: Option<JoinHandle<()>>,
    alone: Option<JoinHandle<()>>,
    watchdog: Option<JoinHandle<()>>,
    fallback_kill: Option<JoinHandle<()>>,
}

impl MeetingTimers {
    fn abort_all(&mut self) {
        for handle in [
            self.admission.take(),
            self.alone.take(),
            self.watchdog.take(),
            self.fallback_kill.take(),
        ]
        .into_iter()
        .flatten()
        {
            handle.abort();
        }
    }
}

pub struct LifecycleManager {
    db: Arc<DatabaseConnection>,
    config: Config,
    orchestrator: Arc<dyn Orchestrator>,
    bus: CommandBus,
    publisher: EventPublisher,

    timers: DashMap<Id, MeetingTimers>,
    /// (connection_id, status) pairs already applied; callbacks are
    /// at-least-once and must be idempotent
    seen_callbacks: DashMap<(Uuid, WorkerStatus), ()>,
    /// Completion reason promised before an internally-issued leave
    pending_completion: DashMap<Id, CompletionReason>,
    /// Failure stage promised before an internally-issued leave (admission
    /// timeout); wins over a clean worker exit
    pending_failure: DashMap<Id, FailureStage>,
    /// Whether anyone besides the bot was ever seen in the meeting
    had_company: DashMap<Id, ()>,
}

impl LifecycleManager {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: Config,
        orchestrator: Arc<dyn Orchestrator>,
        bus: CommandBus,
        publisher: EventPublisher,
    ) -> Arc<Self> {
        Arc::new(Self {
            db,
            config,
            orchestrator,
            bus,
            publisher,
            timers: DashMap::new(),
            seen_callbacks: DashMap::new(),
            pending_completion: DashMap::new(),
            pending_failure: DashMap::new(),
            had_company: DashMap::new(),
        })
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn bus(&self) -> &CommandBus {
        &self.bus
    }

    pub fn orchestrator(&self) -> &Arc<dyn Orchestrator> {
        &self.orchestrator
    }

    // ---------------------------------------------------------------- dispatch

    /// Admits a dispatch, starts a worker, and moves the meeting to `joining`.
    ///
    /// Blocks on the registry write and on the substrate accepting the
    /// worker, bounded by the spawn deadline; a spawn that misses the
    /// deadline fails the meeting at stage `spawn`.
    pub async fn dispatch(
        self: &Arc<Self>,
        owner: &User,
        params: DispatchParams,
    ) -> Result<Meeting, Error> {
        let meeting = registry::create_request(
            &self.db,
            owner,
            params.platform,
            &params.native_meeting_id,
            params.passcode.clone(),
            params.config.clone(),
        )
        .await?;

        info!(
            "Dispatching bot for meeting {} ({}/{})",
            meeting.id, params.platform, params.native_meeting_id
        );

        let connection_id = Uuid::new_v4();
        let worker_token = generate_worker_token();
        registry::assign_connection(&self.db, meeting.id, connection_id, &worker_token).await?;

        let request = StartRequest {
            meeting_id: meeting.id,
            platform: params.platform.as_str().to_string(),
            native_meeting_id: params.native_meeting_id.clone(),
            passcode: params.passcode,
            session_uid: meeting.session_uid,
            connection_id,
            config: worker_config_blob(&self.config, &meeting.config),
            meeting_token: worker_token,
            callback_url: self.config.callback_base_url.clone(),
            command_bus_url: self.config.redis_url().to_string(),
            transcription_url: self.config.transcriber_url().unwrap_or_default(),
            transcription_api_key: self.config.transcriber_api_key(),
        };

        let deadline = Duration::from_secs(self.config.spawn_deadline_secs);
        let started = tokio::time::timeout(deadline, self.orchestrator.start(request)).await;

        let worker_ref = match started {
            Ok(Ok(worker_ref)) => worker_ref,
            Ok(Err(e)) => {
                warn!("Worker start for meeting {} failed: {e}", meeting.id);
                self.finalize(
                    meeting.id,
                    &MeetingStatus::non_terminal(),
                    Terminal::failed(FailureStage::Spawn),
                    Some(e.to_string()),
                )
                .await?;
                return Err(e.into());
            }
            Err(_) => {
                warn!(
                    "Worker start for meeting {} missed the {}s deadline",
                    meeting.id, self.config.spawn_deadline_secs
                );
                self.finalize(
                    meeting.id,
                    &MeetingStatus::non_terminal(),
                    Terminal::failed(FailureStage::Spawn),
                    Some("worker spawn deadline exceeded".to_string()),
                )
                .await?;
                return Err(Error {
                    source: None,
                    error_kind: DomainErrorKind::External(
                        crate::error::ExternalErrorKind::Substrate(
                            "worker spawn deadline exceeded".to_string(),
                        ),
                    ),
                });
            }
        };

        registry::attach_worker(&self.db, meeting.id, worker_ref.as_str()).await?;

        // The worker's joining_ack may have already arrived and won the race;
        // a stale transition here just means the meeting is past `requested`.
        let meeting = match registry::transition(
            &self.db,
            meeting.id,
            &[MeetingStatus::Requested],
            MeetingStatus::Joining,
            TransitionPatch::none(),
        )
        .await
        {
            Ok(meeting) => meeting,
            Err(e) if is_stale(&e) => registry::find_by_id(&self.db, meeting.id).await?,
            Err(e) => return Err(e.into()),
        };

        if meeting.config.recording_enabled {
            recording::create(&self.db, meeting.id, meeting.session_uid, RecordingSource::Bot)
                .await?;
        }

        self.publish_status(&meeting).await;

        Ok(meeting)
    }

    // ------------------------------------------------------------- operations

    /// Translates a client stop into a leave command plus the `completing`
    /// transition, with a hard kill as fallback once the grace expires.
    pub async fn stop(self: &Arc<Self>, meeting: &Meeting) -> Result<Meeting, Error> {
        if meeting.status.is_terminal() {
            return Ok(meeting.clone());
        }

        self.pending_completion
            .insert(meeting.id, CompletionReason::Stopped);

        let leave = BotCommand::Leave {
            meeting_id: meeting.id,
        };
        if let Err(e) = self.bus.publish_command(&leave).await {
            // Bus down: skip the soft leave entirely and terminate through
            // the substrate.
            warn!(
                "Command bus unavailable for meeting {}; hard-stopping worker: {e}",
                meeting.id
            );
            self.hard_stop_worker(meeting).await;
        }

        let updated = match registry::transition(
            &self.db,
            meeting.id,
            &MeetingStatus::non_terminal(),
            MeetingStatus::Completing,
            TransitionPatch {
                clear_worker_ref: true,
                ..TransitionPatch::none()
            },
        )
        .await
        {
            Ok(updated) => updated,
            Err(e) if is_stale(&e) => registry::find_by_id(&self.db, meeting.id).await?,
            Err(e) => return Err(e.into()),
        };

        self.schedule_fallback_kill(meeting.id, meeting.worker_ref.clone());
        self.publish_status(&updated).await;

        Ok(updated)
    }

    /// Publishes exactly one reconfigure and patches the stored config.
    pub async fn reconfigure(
        self: &Arc<Self>,
        meeting: &Meeting,
        language: Option<String>,
        task: Option<String>,
    ) -> Result<Meeting, Error> {
        if !matches!(
            meeting.status,
            MeetingStatus::Joining | MeetingStatus::AwaitingAdmission | MeetingStatus::Active
        ) {
            return Err(Error::invalid());
        }

        let command = BotCommand::Reconfigure {
            meeting_id: meeting.id,
            language: language.clone(),
            task: task.clone(),
        };
        self.bus.publish_command(&command).await?;

        let mut config = meeting.config.clone();
        config.language = language;
        config.task = match task.as_deref() {
            Some("transcribe") => Some(entity::meetings::TranscriptionTask::Transcribe),
            Some("translate") => Some(entity::meetings::TranscriptionTask::Translate),
            Some(_) | None => None,
        };

        Ok(registry::update_config(&self.db, meeting.id, config).await?)
    }

    // -------------------------------------------------------------- callbacks

    /// Resolves a callback identity to its meeting, or refuses it. The bearer
    /// token must be the one issued to the worker at dispatch. Shared by the
    /// status, upload, and transcript callback endpoints.
    pub async fn authorize_worker(
        &self,
        connection_id: Uuid,
        token: &str,
    ) -> Result<Meeting, Error> {
        let meeting = registry::find_by_connection_id(&self.db, connection_id)
            .await?
            .ok_or_else(Error::not_found)?;

        if meeting.worker_token.as_deref() != Some(token) {
            warn!(
                "Callback for meeting {} presented a bad worker token",
                meeting.id
            );
            return Err(Error {
                source: None,
                error_kind: DomainErrorKind::Internal(InternalErrorKind::Entity(
                    EntityErrorKind::Unauthenticated,
                )),
            });
        }
        Ok(meeting)
    }

    /// Entry point for worker status callbacks. Idempotent per
    /// (connection_id, status); the bearer token must match the one issued at
    /// dispatch.
    pub async fn handle_callback(
        self: &Arc<Self>,
        connection_id: Uuid,
        token: &str,
        callback: StatusCallback,
    ) -> Result<(), Error> {
        let meeting = self.authorize_worker(connection_id, token).await?;

        // Heartbeats repeat by design; everything else applies once. A
        // callback is only recorded as seen once it applied cleanly, so a
        // worker retrying a failed delivery is not silently dropped.
        let dedupe_key = (connection_id, callback.status);
        if callback.status != WorkerStatus::StatusUpdate
            && self.seen_callbacks.contains_key(&dedupe_key)
        {
            debug!(
                "Duplicate {} callback for meeting {} ignored",
                callback.status.as_str(),
                meeting.id
            );
            return Ok(());
        }

        let status = callback.status;
        let result = match status {
            WorkerStatus::Joining => self.on_joining_ack(&meeting).await,
            WorkerStatus::AwaitingAdmission => self.on_awaiting_admission(&meeting).await,
            WorkerStatus::Active => self.on_active(&meeting).await,
            WorkerStatus::StatusUpdate => {
                self.on_heartbeat(&meeting, callback.participant_count);
                Ok(())
            }
            WorkerStatus::Exit => self.on_exit(&meeting, callback).await,
        };

        if result.is_ok() && status != WorkerStatus::StatusUpdate {
            self.seen_callbacks.insert(dedupe_key, ());
        }
        result
    }

    async fn on_joining_ack(self: &Arc<Self>, meeting: &Meeting) -> Result<(), Error> {
        // Tolerates `requested` so a callback racing ahead of the dispatch
        // transition still lands; anything later means this ack is stale.
        match registry::transition(
            &self.db,
            meeting.id,
            &[MeetingStatus::Requested, MeetingStatus::Joining],
            MeetingStatus::Joining,
            TransitionPatch::none(),
        )
        .await
        {
            Ok(updated) => {
                self.publish_status(&updated).await;
                Ok(())
            }
            Err(e) if is_stale(&e) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn on_awaiting_admission(self: &Arc<Self>, meeting: &Meeting) -> Result<(), Error> {
        let updated = match registry::transition(
            &self.db,
            meeting.id,
            &[MeetingStatus::Joining],
            MeetingStatus::AwaitingAdmission,
            TransitionPatch::none(),
        )
        .await
        {
            Ok(updated) => updated,
            Err(e) if is_stale(&e) => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        self.start_admission_timer(meeting.id, meeting.platform);

        // Concurrency re-check: a racing dispatch may have pushed the owner
        // past the ceiling between admission checks. The first bot to confirm
        // the lobby while over the limit loses.
        let active = registry::count_active_by_owner(&self.db, meeting.user_id).await?;
        let owner = user_api::find_by_id(&self.db, meeting.user_id).await?;
        if active > owner.max_concurrent_bots.max(0) as u64 {
            warn!(
                "Meeting {} loses the concurrency re-check ({active} active, max {})",
                meeting.id, owner.max_concurrent_bots
            );
            let _ = self
                .bus
                .publish_command(&BotCommand::Leave {
                    meeting_id: meeting.id,
                })
                .await;
            self.hard_stop_worker(&updated).await;
            self.finalize(
                meeting.id,
                &MeetingStatus::non_terminal(),
                Terminal::failed(FailureStage::Concurrency),
                Some("admission-time concurrency re-check failed".to_string()),
            )
            .await?;
            return Ok(());
        }

        self.publish_status(&updated).await;
        Ok(())
    }

    async fn on_active(self: &Arc<Self>, meeting: &Meeting) -> Result<(), Error> {
        let updated = match registry::transition(
            &self.db,
            meeting.id,
            &[MeetingStatus::Joining, MeetingStatus::AwaitingAdmission],
            MeetingStatus::Active,
            TransitionPatch {
                start_time: Some(Utc::now().into()),
                ..TransitionPatch::none()
            },
        )
        .await
        {
            Ok(updated) => updated,
            Err(e) if is_stale(&e) => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        self.cancel_timer(meeting.id, TimerSlot::Admission);
        self.start_watchdog(meeting.id);
        self.start_alone_timer(
            meeting.id,
            Duration::from_secs(self.config.startup_alone_timeout_secs),
        );

        self.publish_status(&updated).await;
        Ok(())
    }

    /// Heartbeats reset the watchdog only; the alone-since clock is driven by
    /// the participant count they carry, not by their arrival.
    fn on_heartbeat(self: &Arc<Self>, meeting: &Meeting, participant_count: Option<u32>) {
        if meeting.status != MeetingStatus::Active {
            return;
        }

        self.start_watchdog(meeting.id);

        match participant_count {
            Some(count) if count > 1 => {
                self.had_company.insert(meeting.id, ());
                self.cancel_timer(meeting.id, TimerSlot::Alone);
            }
            Some(_) => {
                let running = self
                    .timers
                    .get(&meeting.id)
                    .map(|timers| timers.alone.is_some())
                    .unwrap_or(false);
                if !running {
                    let delay = if self.had_company.contains_key(&meeting.id) {
                        Duration::from_secs(self.config.post_speaker_alone_timeout_secs)
                    } else {
                        Duration::from_secs(self.config.startup_alone_timeout_secs)
                    };
                    self.start_alone_timer(meeting.id, delay);
                }
            }
            None => {}
        }
    }

    async fn on_exit(
        self: &Arc<Self>,
        meeting: &Meeting,
        callback: StatusCallback,
    ) -> Result<(), Error> {
        let pending_completion = self
            .pending_completion
            .get(&meeting.id)
            .map(|entry| *entry.value());
        let mut terminal = exit::map_exit(
            callback.reason.as_deref(),
            callback.exit_code,
            pending_completion,
        );

        // An internally promised failure (admission timeout) outranks a clean
        // worker exit: the leave was ours, not the user's.
        if terminal.status == MeetingStatus::Completed {
            if let Some(stage) = self.pending_failure.get(&meeting.id).map(|e| *e.value()) {
                terminal = Terminal::failed(stage);
            }
        }

        debug!(
            "Worker exit for meeting {}: reason={:?} code={:?} -> {:?}",
            meeting.id, callback.reason, callback.exit_code, terminal
        );

        self.finalize(
            meeting.id,
            &MeetingStatus::non_terminal(),
            terminal,
            callback.error_details,
        )
        .await?;
        Ok(())
    }

    // ----------------------------------------------------------------- timers

    fn start_admission_timer(self: &Arc<Self>, meeting_id: Id, platform: Platform) {
        let delay = Duration::from_secs(match platform {
            Platform::GoogleMeet => self.config.admission_timeout_google_meet_secs,
            Platform::Teams => self.config.admission_timeout_teams_secs,
            Platform::Zoom => self.config.admission_timeout_zoom_secs,
        });

        let this = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(manager) = this.upgrade() {
                manager.on_admission_timeout(meeting_id).await;
            }
        });
        self.store_timer(meeting_id, TimerSlot::Admission, handle);
    }

    fn start_alone_timer(self: &Arc<Self>, meeting_id: Id, delay: Duration) {
        let this = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(manager) = this.upgrade() {
                manager.on_alone_timeout(meeting_id).await;
            }
        });
        self.store_timer(meeting_id, TimerSlot::Alone, handle);
    }

    fn start_watchdog(self: &Arc<Self>, meeting_id: Id) {
        let delay = Duration::from_secs(self.config.heartbeat_watchdog_secs);
        let this = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(manager) = this.upgrade() {
                manager.on_watchdog_expired(meeting_id).await;
            }
        });
        self.store_timer(meeting_id, TimerSlot::Watchdog, handle);
    }

    fn schedule_fallback_kill(self: &Arc<Self>, meeting_id: Id, worker_ref: Option<String>) {
        let grace = Duration::from_secs(self.config.stop_grace_secs);
        let this = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            if let Some(manager) = this.upgrade() {
                manager.on_fallback_kill(meeting_id, worker_ref).await;
            }
        });
        self.store_timer(meeting_id, TimerSlot::FallbackKill, handle);
    }

    fn store_timer(&self, meeting_id: Id, slot: TimerSlot, handle: JoinHandle<()>) {
        let mut timers = self.timers.entry(meeting_id).or_default();
        let old = match slot {
            TimerSlot::Admission => timers.admission.replace(handle),
            TimerSlot::Alone => timers.alone.replace(handle),
            TimerSlot::Watchdog => timers.watchdog.replace(handle),
            TimerSlot::FallbackKill => timers.fallback_kill.replace(handle),
        };
        if let Some(old) = old {
            old.abort();
        }
    }

    fn cancel_timer(&self, meeting_id: Id, slot: TimerSlot) {
        if let Some(mut timers) = self.timers.get_mut(&meeting_id) {
            let handle = match slot {
                TimerSlot::Admission => timers.admission.take(),
                TimerSlot::Alone => timers.alone.take(),
                TimerSlot::Watchdog => timers.watchdog.take(),
                TimerSlot::FallbackKill => timers.fallback_kill.take(),
            };
            if let Some(handle) = handle {
                handle.abort();
            }
        }
    }

    async fn on_admission_timeout(self: &Arc<Self>, meeting_id: Id) {
        let Ok(meeting) = registry::find_by_id(&self.db, meeting_id).await else {
            return;
        };
        if !matches!(
            meeting.status,
            MeetingStatus::Joining | MeetingStatus::AwaitingAdmission
        ) {
            return;
        }

        info!("Admission timeout for meeting {meeting_id}; issuing leave");
        self.pending_failure
            .insert(meeting_id, FailureStage::Admission);
        let _ = self
            .bus
            .publish_command(&BotCommand::Leave { meeting_id })
            .await;
        self.schedule_fallback_kill(meeting_id, meeting.worker_ref.clone());
    }

    async fn on_alone_timeout(self: &Arc<Self>, meeting_id: Id) {
        let Ok(meeting) = registry::find_by_id(&self.db, meeting_id).await else {
            return;
        };
        if meeting.status != MeetingStatus::Active {
            return;
        }

        info!("Meeting {meeting_id} was left alone; issuing leave");
        self.pending_completion
            .insert(meeting_id, CompletionReason::LeftAlone);
        let _ = self
            .bus
            .publish_command(&BotCommand::Leave { meeting_id })
            .await;

        match registry::transition(
            &self.db,
            meeting_id,
            &[MeetingStatus::Active],
            MeetingStatus::Completing,
            TransitionPatch {
                clear_worker_ref: true,
                ..TransitionPatch::none()
            },
        )
        .await
        {
            Ok(updated) => self.publish_status(&updated).await,
            Err(e) if is_stale(&e) => {}
            Err(e) => warn!("Alone-timeout transition for meeting {meeting_id} failed: {e}"),
        }

        self.schedule_fallback_kill(meeting_id, meeting.worker_ref.clone());
    }

    async fn on_watchdog_expired(self: &Arc<Self>, meeting_id: Id) {
        let Ok(meeting) = registry::find_by_id(&self.db, meeting_id).await else {
            return;
        };
        if meeting.status != MeetingStatus::Active {
            return;
        }

        warn!("Heartbeat lost for meeting {meeting_id}; force-terminating worker");
        self.hard_stop_worker(&meeting).await;
        let _ = self
            .finalize(
                meeting_id,
                &[MeetingStatus::Active],
                exit::heartbeat_lost(),
                Some("no heartbeat inside the watchdog window".to_string()),
            )
            .await;
    }

    async fn on_fallback_kill(self: &Arc<Self>, meeting_id: Id, worker_ref: Option<String>) {
        let Ok(meeting) = registry::find_by_id(&self.db, meeting_id).await else {
            return;
        };
        if meeting.status.is_terminal() {
            return;
        }

        warn!("Meeting {meeting_id} did not confirm leave inside the grace; killing worker");
        if let Some(worker_ref) = worker_ref.or(meeting.worker_ref.clone()) {
            let _ = self
                .orchestrator
                .stop(&WorkerRef(worker_ref), Duration::ZERO)
                .await;
        }

        // A kill the worker never acknowledged is a failure, whatever leave
        // preceded it.
        let stage = self
            .pending_failure
            .get(&meeting_id)
            .map(|entry| *entry.value())
            .unwrap_or(FailureStage::Signal);
        let _ = self
            .finalize(
                meeting_id,
                &MeetingStatus::non_terminal(),
                Terminal::failed(stage),
                Some("worker did not confirm leave; hard-terminated".to_string()),
            )
            .await;
    }

    // ------------------------------------------------------------ termination

    /// The only path into a terminal status. Exactly one caller wins the
    /// conditional update; that caller fires the webhook event, clears the
    /// timers, and detaches the worker. Losers see `Ok(None)`.
    pub async fn finalize(
        self: &Arc<Self>,
        meeting_id: Id,
        from_set: &[MeetingStatus],
        terminal: Terminal,
        error_message: Option<String>,
    ) -> Result<Option<Meeting>, Error> {
        let patch = TransitionPatch {
            end_time: Some(Utc::now().into()),
            completion_reason: terminal.completion_reason,
            failure_stage: terminal.failure_stage,
            last_error_message: error_message,
            clear_worker_ref: true,
            ..TransitionPatch::none()
        };

        let meeting =
            match registry::transition(&self.db, meeting_id, from_set, terminal.status, patch)
                .await
            {
                Ok(meeting) => meeting,
                Err(e) if is_stale(&e) => {
                    debug!("Meeting {meeting_id} already finalized");
                    return Ok(None);
                }
                Err(e) => return Err(e.into()),
            };

        info!(
            "Meeting {} is terminal: {} (reason={:?}, stage={:?})",
            meeting.id, meeting.status, meeting.completion_reason, meeting.failure_stage
        );

        if let Some(mut timers) = self.timers.get_mut(&meeting_id) {
            timers.abort_all();
        }
        self.timers.remove(&meeting_id);
        self.pending_completion.remove(&meeting_id);
        self.pending_failure.remove(&meeting_id);
        self.had_company.remove(&meeting_id);
        if let Some(connection_id) = meeting.connection_id {
            self.seen_callbacks
                .retain(|(seen_connection, _), _| *seen_connection != connection_id);
        }

        self.publisher
            .publish(DomainEvent::MeetingEnded {
                meeting_id: meeting.id,
                owner_id: meeting.user_id,
                payload: end_payload(&meeting),
            })
            .await;

        Ok(Some(meeting))
    }

    async fn hard_stop_worker(&self, meeting: &Meeting) {
        if let Some(worker_ref) = &meeting.worker_ref {
            if let Err(e) = self
                .orchestrator
                .stop(
                    &WorkerRef(worker_ref.clone()),
                    Duration::from_secs(self.config.stop_grace_secs),
                )
                .await
            {
                warn!(
                    "Hard stop of worker {worker_ref} for meeting {} failed: {e}",
                    meeting.id
                );
            }
        }
    }

    async fn publish_status(&self, meeting: &Meeting) {
        self.publisher
            .publish(DomainEvent::MeetingStatusChanged {
                meeting_id: meeting.id,
                owner_id: meeting.user_id,
                status: meeting.status.to_string(),
            })
            .await;
    }

    // ---------------------------------------------------------- reconciliation

    /// Best-effort reconciliation after an orchestrator restart: meetings
    /// whose workers vanished are failed through the exit reducer; workers
    /// whose meetings are already terminal are stopped.
    pub async fn reconcile(self: &Arc<Self>) -> Result<(), Error> {
        let live = self.orchestrator.list().await?;
        let non_terminal = registry::list_non_terminal(&self.db).await?;

        for meeting in &non_terminal {
            if !meeting.status.has_worker() {
                continue;
            }
            let alive = live.iter().any(|(meeting_id, _)| *meeting_id == meeting.id);
            if alive {
                continue;
            }

            let terminal = match &meeting.worker_ref {
                Some(worker_ref) => {
                    match self.orchestrator.inspect(&WorkerRef(worker_ref.clone())).await {
                        Ok(WorkerState::Running) => continue,
                        Ok(WorkerState::Exited { code }) => exit::map_exit(None, Some(code), None),
                        Ok(WorkerState::Missing) | Err(_) => exit::heartbeat_lost(),
                    }
                }
                None => exit::heartbeat_lost(),
            };

            warn!(
                "Reconciliation: worker for meeting {} is gone; failing it",
                meeting.id
            );
            let _ = self
                .finalize(
                    meeting.id,
                    &MeetingStatus::non_terminal(),
                    terminal,
                    Some("worker lost across orchestrator restart".to_string()),
                )
                .await;
        }

        for (meeting_id, worker_ref) in live {
            let tracked = non_terminal
                .iter()
                .any(|meeting| meeting.id == meeting_id && meeting.status.has_worker());
            if !tracked {
                warn!(
                    "Reconciliation: stopping stray worker {worker_ref} of meeting {meeting_id}"
                );
                let _ = self.orchestrator.stop(&worker_ref, Duration::ZERO).await;
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum TimerSlot {
    Admission,
    Alone,
    Watchdog,
    FallbackKill,
}

fn is_stale(e: &entity_api::error::Error) -> bool {
    e.error_kind == EntityApiErrorKind::InvalidTransition
}

fn generate_worker_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

/// The configuration blob the worker receives in its environment; the stored
/// meeting config plus orchestrator-level settings the worker needs.
fn worker_config_blob(config: &Config, meeting_config: &MeetingConfig) -> serde_json::Value {
    let mut blob = serde_json::to_value(meeting_config).unwrap_or_else(|_| serde_json::json!({}));
    if let Some(map) = blob.as_object_mut() {
        map.insert(
            "whisper_model_size".to_string(),
            serde_json::Value::String(config.whisper_model_size.clone()),
        );
    }
    blob
}

/// The webhook payload for a terminal transition: identifiers captured before
/// any anonymization, the terminal status, and how it was reached.
fn end_payload(meeting: &Meeting) -> serde_json::Value {
    serde_json::json!({
        "meeting_id": meeting.id,
        "platform": meeting.platform.as_str(),
        "native_meeting_id": meeting.native_meeting_id,
        "status": meeting.status.to_string(),
        "completion_reason": meeting.completion_reason.map(|reason| reason.to_string()),
        "failure_stage": meeting.failure_stage.map(|stage| stage.to_string()),
        "start_time": meeting.start_time,
        "end_time": meeting.end_time,
        "created_at": meeting.created_at,
        "error_message": meeting.last_error_message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_tokens_are_random_and_sized() {
        let token = generate_worker_token();
        assert_eq!(token.len(), 32);
        assert_ne!(token, generate_worker_token());
    }

    #[test]
    fn test_worker_config_blob_carries_the_model_size() {
        use clap::Parser;
        let config = Config::parse_from(["vexa_orchestrator"]);
        let meeting_config = MeetingConfig {
            language: Some("en".to_string()),
            ..MeetingConfig::default()
        };

        let blob = worker_config_blob(&config, &meeting_config);
        assert_eq!(blob["language"], "en");
        assert_eq!(blob["whisper_model_size"], "medium");
    }

    #[test]
    fn test_end_payload_reports_reason_or_stage() {
        let now = chrono::Utc::now();
        let meeting = Meeting {
            id: 3,
            user_id: 1,
            platform: Platform::GoogleMeet,
            native_meeting_id: Some("abc-defg-hij".to_string()),
            passcode: None,
            status: MeetingStatus::Completed,
            worker_ref: None,
            session_uid: Uuid::new_v4(),
            connection_id: None,
            worker_token: None,
            config: MeetingConfig::default(),
            data: serde_json::json!({}),
            anonymized_key_digest: None,
            start_time: Some(now.into()),
            end_time: Some(now.into()),
            completion_reason: Some(CompletionReason::Stopped),
            failure_stage: None,
            last_error_message: None,
            created_at: now.into(),
            updated_at: now.into(),
        };

        let payload = end_payload(&meeting);
        assert_eq!(payload["status"], "completed");
        assert_eq!(payload["completion_reason"], "stopped");
        assert_eq!(payload["failure_stage"], serde_json::Value::Null);
        assert_eq!(payload["native_meeting_id"], "abc-defg-hij");
    }
}
