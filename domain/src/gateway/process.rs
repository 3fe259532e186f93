//! Process implementation of the worker orchestrator.
//!
//! Workers are child processes of the orchestrator, addressed by pid. Each
//! spawn enters a pid table that is also persisted to disk; on restart the
//! table is reread and any pid that no longer answers signal 0 is surfaced as
//! `Missing` so the lifecycle layer can fail its meeting. A reaper task per
//! child records the exit code the moment the process dies.

use async_trait::async_trait;
use bot_worker::types::worker::{StartRequest, WorkerRef, WorkerState};
use bot_worker::{Error, Orchestrator};
use dashmap::DashMap;
use log::*;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProcState {
    Running,
    Exited(i32),
    /// Recorded in the persisted table but not a child of this process
    Orphaned,
}

#[derive(Debug, Clone)]
struct ProcEntry {
    meeting_id: i32,
    state: ProcState,
}

pub struct ProcessOrchestrator {
    command: String,
    state_file: PathBuf,
    /// pid -> entry
    table: Arc<DashMap<u32, ProcEntry>>,
}

impl ProcessOrchestrator {
    /// Builds the orchestrator and reloads the persisted pid table. Pids that
    /// no longer exist stay in the table as exited so reconciliation sees
    /// them; pids that still run are orphans this process cannot wait on but
    /// can still signal.
    pub fn new(command: String, state_file: PathBuf) -> Self {
        let table: Arc<DashMap<u32, ProcEntry>> = Arc::new(DashMap::new());

        match std::fs::read_to_string(&state_file) {
            Ok(contents) => {
                let persisted: HashMap<u32, i32> =
                    serde_json::from_str(&contents).unwrap_or_default();
                for (pid, meeting_id) in persisted {
                    let state = if pid_alive(pid) {
                        ProcState::Orphaned
                    } else {
                        ProcState::Exited(-1)
                    };
                    info!("Recovered worker pid {pid} for meeting {meeting_id}: {state:?}");
                    table.insert(pid, ProcEntry { meeting_id, state });
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Could not read worker state file: {e}"),
        }

        Self {
            command,
            state_file,
            table,
        }
    }

    fn persist_table(&self) {
        let running: HashMap<u32, i32> = self
            .table
            .iter()
            .filter(|entry| {
                matches!(entry.value().state, ProcState::Running | ProcState::Orphaned)
            })
            .map(|entry| (*entry.key(), entry.value().meeting_id))
            .collect();

        if let Some(parent) = self.state_file.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match serde_json::to_string(&running) {
            Ok(contents) => {
                if let Err(e) = std::fs::write(&self.state_file, contents) {
                    warn!("Could not persist worker state file: {e}");
                }
            }
            Err(e) => warn!("Could not encode worker state file: {e}"),
        }
    }

    fn find_pid(worker: &WorkerRef) -> Result<u32, Error> {
        worker
            .as_str()
            .parse::<u32>()
            .map_err(|_| Error::NotFound(format!("Not a pid: {worker}")))
    }
}

fn pid_alive(pid: u32) -> bool {
    // Signal 0 probes for existence without delivering anything.
    unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
}

fn send_signal(pid: u32, signal: libc::c_int) {
    unsafe {
        libc::kill(pid as libc::pid_t, signal);
    }
}

#[async_trait]
impl Orchestrator for ProcessOrchestrator {
    async fn start(&self, request: StartRequest) -> Result<WorkerRef, Error> {
        let config_json =
            serde_json::to_string(&request.config).unwrap_or_else(|_| "{}".to_string());

        let mut command = Command::new(&self.command);
        command
            .env("VEXA_WORKER_CONFIG", config_json)
            .env("MEETING_ID", request.meeting_id.to_string())
            .env("PLATFORM", &request.platform)
            .env("NATIVE_MEETING_ID", &request.native_meeting_id)
            .env("SESSION_UID", request.session_uid.to_string())
            .env("CONNECTION_ID", request.connection_id.to_string())
            .env("MEETING_TOKEN", &request.meeting_token)
            .env("CALLBACK_URL", &request.callback_url)
            .env("REDIS_URL", &request.command_bus_url)
            .env("TRANSCRIBER_URL", &request.transcription_url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(false);

        if let Some(passcode) = &request.passcode {
            command.env("MEETING_PASSCODE", passcode);
        }
        if let Some(api_key) = &request.transcription_api_key {
            command.env("TRANSCRIBER_API_KEY", api_key);
        }

        let mut child = command.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::SubstrateUnavailable(format!(
                "Worker executable {:?} not found",
                self.command
            )),
            _ => Error::SubstrateUnavailable(e.to_string()),
        })?;

        let pid = child
            .id()
            .ok_or_else(|| Error::SubstrateUnavailable("Spawned worker has no pid".to_string()))?;

        self.table.insert(
            pid,
            ProcEntry {
                meeting_id: request.meeting_id,
                state: ProcState::Running,
            },
        );
        self.persist_table();

        info!(
            "Spawned worker pid {pid} for meeting {}",
            request.meeting_id
        );

        // Reap on exit and record the code for later inspect() calls.
        let table = Arc::clone(&self.table);
        tokio::spawn(async move {
            let code = match child.wait().await {
                Ok(status) => status.code().unwrap_or_else(|| {
                    // Terminated by signal; mirror the shell's 128+n convention.
                    #[cfg(unix)]
                    {
                        use std::os::unix::process::ExitStatusExt;
                        status.signal().map(|s| 128 + s).unwrap_or(-1)
                    }
                    #[cfg(not(unix))]
                    {
                        -1
                    }
                }),
                Err(e) => {
                    warn!("Waiting on worker pid {pid} failed: {e}");
                    -1
                }
            };
            debug!("Worker pid {pid} exited with code {code}");
            if let Some(mut entry) = table.get_mut(&pid) {
                entry.state = ProcState::Exited(code);
            }
        });

        Ok(WorkerRef(pid.to_string()))
    }

    async fn stop(&self, worker: &WorkerRef, grace: Duration) -> Result<(), Error> {
        let pid = Self::find_pid(worker)?;

        if !matches!(
            self.table.get(&pid).map(|entry| entry.state),
            Some(ProcState::Running | ProcState::Orphaned)
        ) {
            return Ok(());
        }

        send_signal(pid, libc::SIGTERM);

        let deadline = tokio::time::Instant::now() + grace;
        loop {
            tokio::time::sleep(Duration::from_millis(250)).await;
            let still_running = matches!(
                self.table.get(&pid).map(|entry| entry.state),
                Some(ProcState::Running)
            ) || (matches!(
                self.table.get(&pid).map(|entry| entry.state),
                Some(ProcState::Orphaned)
            ) && pid_alive(pid));

            if !still_running {
                break;
            }
            if tokio::time::Instant::now() >= deadline {
                warn!("Worker pid {pid} ignored SIGTERM; sending SIGKILL");
                send_signal(pid, libc::SIGKILL);
                break;
            }
        }

        self.persist_table();
        Ok(())
    }

    async fn inspect(&self, worker: &WorkerRef) -> Result<WorkerState, Error> {
        let pid = Self::find_pid(worker)?;
        match self.table.get(&pid).map(|entry| entry.state) {
            Some(ProcState::Running) => Ok(WorkerState::Running),
            Some(ProcState::Exited(code)) => Ok(WorkerState::Exited { code }),
            Some(ProcState::Orphaned) => {
                if pid_alive(pid) {
                    Ok(WorkerState::Running)
                } else {
                    Ok(WorkerState::Missing)
                }
            }
            None => Ok(WorkerState::Missing),
        }
    }

    async fn list(&self) -> Result<Vec<(i32, WorkerRef)>, Error> {
        Ok(self
            .table
            .iter()
            .filter(|entry| match entry.value().state {
                ProcState::Running => true,
                ProcState::Orphaned => pid_alive(*entry.key()),
                ProcState::Exited(_) => false,
            })
            .map(|entry| (entry.value().meeting_id, WorkerRef(entry.key().to_string())))
            .collect())
    }

    fn orchestrator_id(&self) -> &str {
        "process"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn request(meeting_id: i32) -> StartRequest {
        StartRequest {
            meeting_id,
            platform: "google_meet".to_string(),
            native_meeting_id: "abc-defg-hij".to_string(),
            passcode: None,
            session_uid: Uuid::new_v4(),
            connection_id: Uuid::new_v4(),
            config: serde_json::json!({}),
            meeting_token: "tok".to_string(),
            callback_url: "http://127.0.0.1:18056".to_string(),
            command_bus_url: "redis://127.0.0.1:6379".to_string(),
            transcription_url: "http://127.0.0.1:9090".to_string(),
            transcription_api_key: None,
        }
    }

    fn orchestrator_with(command: &str) -> (ProcessOrchestrator, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator =
            ProcessOrchestrator::new(command.to_string(), dir.path().join("workers.json"));
        (orchestrator, dir)
    }

    #[tokio::test]
    async fn test_start_missing_executable_is_substrate_unavailable() {
        let (orchestrator, _dir) = orchestrator_with("/definitely/not/a/binary");
        let result = orchestrator.start(request(1)).await;
        assert!(matches!(result, Err(Error::SubstrateUnavailable(_))));
    }

    #[tokio::test]
    async fn test_spawn_inspect_and_reap_a_short_lived_worker() {
        let (orchestrator, _dir) = orchestrator_with("/bin/true");
        let worker = orchestrator.start(request(7)).await.unwrap();

        // /bin/true exits immediately; the reaper records code 0.
        tokio::time::sleep(Duration::from_millis(300)).await;
        let state = orchestrator.inspect(&worker).await.unwrap();
        assert_eq!(state, WorkerState::Exited { code: 0 });
        assert!(orchestrator.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stop_is_a_noop_for_an_already_exited_worker() {
        // /bin/sleep with no arguments exits immediately with an error, so by
        // the time stop() runs the reaper has already recorded the exit.
        let (orchestrator, _dir) = orchestrator_with("/bin/sleep");
        let worker = orchestrator.start(request(9)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(orchestrator
            .stop(&worker, Duration::from_secs(1))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_inspect_unknown_pid_is_missing() {
        let (orchestrator, _dir) = orchestrator_with("/bin/true");
        let state = orchestrator
            .inspect(&WorkerRef("999999".to_string()))
            .await
            .unwrap();
        assert_eq!(state, WorkerState::Missing);
    }

    #[tokio::test]
    async fn test_restart_recovers_dead_pids_as_exited() {
        let dir = tempfile::tempdir().unwrap();
        let state_file = dir.path().join("workers.json");
        // Persist a pid that cannot exist anymore.
        std::fs::write(&state_file, r#"{"4194000": 12}"#).unwrap();

        let orchestrator = ProcessOrchestrator::new("/bin/true".to_string(), state_file);
        let state = orchestrator
            .inspect(&WorkerRef("4194000".to_string()))
            .await
            .unwrap();
        assert_eq!(state, WorkerState::Exited { code: -1 });
    }
}
