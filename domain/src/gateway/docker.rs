//! Container implementation of the worker orchestrator.
//!
//! One container per meeting, addressed by container id. The worker receives
//! its entire configuration as env vars: the config JSON blob, the meeting
//! token, and the endpoints it phones home to. A `vexa.meeting_id` label
//! makes containers enumerable for restart reconciliation.

use async_trait::async_trait;
use bollard::container::{
    Config as ContainerConfig, CreateContainerOptions, InspectContainerOptions,
    ListContainersOptions, RemoveContainerOptions, StopContainerOptions,
};
use bollard::Docker;
use bot_worker::types::worker::{StartRequest, WorkerRef, WorkerState};
use bot_worker::{Error, Orchestrator};
use log::*;
use std::collections::HashMap;
use std::time::Duration;

const MEETING_LABEL: &str = "vexa.meeting_id";

pub struct DockerOrchestrator {
    docker: Docker,
    image: String,
}

impl DockerOrchestrator {
    pub fn new(image: String) -> Result<Self, Error> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| Error::SubstrateUnavailable(e.to_string()))?;
        Ok(Self { docker, image })
    }

    fn worker_env(request: &StartRequest) -> Vec<String> {
        let mut env = vec![
            format!(
                "VEXA_WORKER_CONFIG={}",
                serde_json::to_string(&request.config).unwrap_or_else(|_| "{}".to_string())
            ),
            format!("MEETING_ID={}", request.meeting_id),
            format!("PLATFORM={}", request.platform),
            format!("NATIVE_MEETING_ID={}", request.native_meeting_id),
            format!("SESSION_UID={}", request.session_uid),
            format!("CONNECTION_ID={}", request.connection_id),
            format!("MEETING_TOKEN={}", request.meeting_token),
            format!("CALLBACK_URL={}", request.callback_url),
            format!("REDIS_URL={}", request.command_bus_url),
            format!("TRANSCRIBER_URL={}", request.transcription_url),
        ];
        if let Some(passcode) = &request.passcode {
            env.push(format!("MEETING_PASSCODE={passcode}"));
        }
        if let Some(api_key) = &request.transcription_api_key {
            env.push(format!("TRANSCRIBER_API_KEY={api_key}"));
        }
        env
    }

    fn map_error(e: bollard::errors::Error) -> Error {
        match e {
            bollard::errors::Error::DockerResponseServerError {
                status_code: 404,
                message,
            } => Error::BadImage(message),
            bollard::errors::Error::DockerResponseServerError {
                status_code: 409,
                message,
            } => Error::QuotaExceeded(message),
            other => Error::SubstrateUnavailable(other.to_string()),
        }
    }
}

#[async_trait]
impl Orchestrator for DockerOrchestrator {
    async fn start(&self, request: StartRequest) -> Result<WorkerRef, Error> {
        let name = format!(
            "vexa-bot-{}-{}",
            request.meeting_id,
            &request.connection_id.simple().to_string()[..8]
        );

        let mut labels = HashMap::new();
        labels.insert(MEETING_LABEL.to_string(), request.meeting_id.to_string());

        let container_config = ContainerConfig {
            image: Some(self.image.clone()),
            env: Some(Self::worker_env(&request)),
            labels: Some(labels),
            ..Default::default()
        };

        let created = self
            .docker
            .create_container(
                Some(CreateContainerOptions {
                    name: name.clone(),
                    platform: None,
                }),
                container_config,
            )
            .await
            .map_err(Self::map_error)?;

        self.docker
            .start_container::<String>(&created.id, None)
            .await
            .map_err(Self::map_error)?;

        info!(
            "Started worker container {} ({}) for meeting {}",
            name, created.id, request.meeting_id
        );

        Ok(WorkerRef(created.id))
    }

    async fn stop(&self, worker: &WorkerRef, grace: Duration) -> Result<(), Error> {
        // Docker's stop delivers SIGTERM, then SIGKILL once `t` expires.
        let options = StopContainerOptions {
            t: grace.as_secs() as i64,
        };
        match self.docker.stop_container(worker.as_str(), Some(options)).await {
            Ok(()) => {}
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404 | 304,
                ..
            }) => {}
            Err(e) => return Err(Self::map_error(e)),
        }

        let remove = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };
        if let Err(e) = self
            .docker
            .remove_container(worker.as_str(), Some(remove))
            .await
        {
            debug!("Worker container {worker} already removed: {e}");
        }
        Ok(())
    }

    async fn inspect(&self, worker: &WorkerRef) -> Result<WorkerState, Error> {
        let response = match self
            .docker
            .inspect_container(worker.as_str(), None::<InspectContainerOptions>)
            .await
        {
            Ok(response) => response,
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => return Ok(WorkerState::Missing),
            Err(e) => return Err(Self::map_error(e)),
        };

        let state = response.state.unwrap_or_default();
        if state.running.unwrap_or(false) {
            Ok(WorkerState::Running)
        } else {
            Ok(WorkerState::Exited {
                code: state.exit_code.unwrap_or(-1) as i32,
            })
        }
    }

    async fn list(&self) -> Result<Vec<(i32, WorkerRef)>, Error> {
        let mut filters = HashMap::new();
        filters.insert("label".to_string(), vec![MEETING_LABEL.to_string()]);

        let containers = self
            .docker
            .list_containers(Some(ListContainersOptions {
                all: false,
                filters,
                ..Default::default()
            }))
            .await
            .map_err(Self::map_error)?;

        let mut workers = Vec::new();
        for container in containers {
            let Some(id) = container.id else { continue };
            let meeting_id = container
                .labels
                .as_ref()
                .and_then(|labels| labels.get(MEETING_LABEL))
                .and_then(|value| value.parse::<i32>().ok());
            match meeting_id {
                Some(meeting_id) => workers.push((meeting_id, WorkerRef(id))),
                None => warn!("Worker container {id} carries no parsable meeting label"),
            }
        }
        Ok(workers)
    }

    fn orchestrator_id(&self) -> &str {
        "docker"
    }
}
