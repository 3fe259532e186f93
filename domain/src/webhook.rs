//! Webhook dispatcher.
//!
//! Terminal lifecycle transitions are published as `DomainEvent::MeetingEnded`;
//! the handler here resolves the owner's webhook settings and hands the
//! delivery to a queue drained by a background task, so no HTTP request
//! handler ever waits on a webhook. Delivery is at-least-once: a bounded
//! number of attempts with exponential backoff, the same payload on every
//! attempt.

use crate::error::Error;
use async_trait::async_trait;
use events::{DomainEvent, EventHandler};
use log::*;
use sea_orm::DatabaseConnection;
use serde_json::Value;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// How deliveries behave; derived from Config once at startup.
#[derive(Debug, Clone)]
pub struct WebhookPolicy {
    /// Attempts before the failure is recorded (at least 1)
    pub attempts: u32,
    /// First backoff step; doubles per attempt
    pub base_delay: Duration,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Deliver to private/loopback ranges; local development only
    pub allow_private_destinations: bool,
}

impl Default for WebhookPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_secs(1),
            request_timeout: Duration::from_secs(10),
            allow_private_destinations: false,
        }
    }
}

/// One queued delivery. The payload is frozen at enqueue time so retries
/// carry identical bodies.
#[derive(Debug, Clone)]
pub struct WebhookJob {
    pub meeting_id: entity::Id,
    pub user_id: entity::Id,
    pub url: String,
    pub secret: Option<String>,
    pub payload: Value,
}

/// Queue handle plus the delivery loop behind it.
pub struct WebhookDispatcher {
    sender: mpsc::Sender<WebhookJob>,
}

impl WebhookDispatcher {
    /// Spawns the delivery loop and returns the enqueue handle.
    pub fn spawn(db: Arc<DatabaseConnection>, policy: WebhookPolicy) -> Arc<Self> {
        let (sender, mut receiver) = mpsc::channel::<WebhookJob>(256);

        tokio::spawn(async move {
            let client = match reqwest::Client::builder()
                .use_rustls_tls()
                .timeout(policy.request_timeout)
                .build()
            {
                Ok(client) => client,
                Err(e) => {
                    error!("Failed to build webhook client, deliveries disabled: {e:?}");
                    return;
                }
            };

            while let Some(job) = receiver.recv().await {
                let client = client.clone();
                let policy = policy.clone();
                let db = Arc::clone(&db);
                tokio::spawn(async move {
                    deliver_with_retries(&client, &policy, &db, job).await;
                });
            }
        });

        Arc::new(Self { sender })
    }

    /// Non-blocking enqueue; a full queue drops the delivery and logs it
    /// (delivery errors never affect meeting state).
    pub fn enqueue(&self, job: WebhookJob) {
        if let Err(e) = self.sender.try_send(job) {
            warn!("Webhook queue full, dropping delivery: {e}");
        }
    }
}

async fn deliver_with_retries(
    client: &reqwest::Client,
    policy: &WebhookPolicy,
    db: &DatabaseConnection,
    job: WebhookJob,
) {
    let attempts = policy.attempts.max(1);
    let mut last_error = String::new();

    for attempt in 0..attempts {
        if attempt > 0 {
            // 1s, 2s, 4s... bounded by the attempt count, ~30s total.
            tokio::time::sleep(policy.base_delay * 2u32.pow(attempt - 1)).await;
        }

        match attempt_delivery(client, policy, &job).await {
            Ok(()) => {
                debug!(
                    "Webhook delivered for meeting {} (attempt {})",
                    job.meeting_id,
                    attempt + 1
                );
                let _ = entity_api::user::record_webhook_error(db, job.user_id, None).await;
                return;
            }
            Err(e) => {
                warn!(
                    "Webhook attempt {}/{} for meeting {} failed: {}",
                    attempt + 1,
                    attempts,
                    job.meeting_id,
                    e
                );
                last_error = e.to_string();
            }
        }
    }

    error!(
        "Webhook delivery for meeting {} gave up after {} attempts",
        job.meeting_id, attempts
    );
    let _ =
        entity_api::user::record_webhook_error(db, job.user_id, Some(last_error.clone())).await;
    let _ = entity_api::meeting::record_error(db, job.meeting_id, &format!("webhook: {last_error}"))
        .await;
}

async fn attempt_delivery(
    client: &reqwest::Client,
    policy: &WebhookPolicy,
    job: &WebhookJob,
) -> Result<(), Error> {
    let url: reqwest::Url = job
        .url
        .parse()
        .map_err(|_| Error::internal(format!("Invalid webhook URL: {}", job.url)))?;

    if !policy.allow_private_destinations {
        check_destination(&url).await?;
    }

    let mut request = client.post(url).json(&job.payload);
    if let Some(secret) = &job.secret {
        request = request.bearer_auth(secret);
    }

    let response = request.send().await?;
    if response.status().is_success() {
        Ok(())
    } else {
        Err(Error::internal(format!(
            "Webhook endpoint returned {}",
            response.status()
        )))
    }
}

/// SSRF guard, evaluated at send time: resolve the destination host and
/// reject it when any address lands in a range that should never receive
/// server-originated traffic. DNS re-pointing between configuration time and
/// send time is exactly the attack this exists for.
async fn check_destination(url: &reqwest::Url) -> Result<(), Error> {
    let host = url
        .host_str()
        .ok_or_else(|| Error::internal("Webhook URL has no host".to_string()))?;
    let port = url.port_or_known_default().unwrap_or(443);

    let addrs: Vec<IpAddr> = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| Error::internal(format!("Webhook host {host} did not resolve: {e}")))?
        .map(|addr| addr.ip())
        .collect();

    if addrs.is_empty() {
        return Err(Error::internal(format!(
            "Webhook host {host} resolved to no addresses"
        )));
    }

    for ip in addrs {
        if is_forbidden_destination(ip) {
            return Err(Error::internal(format!(
                "Webhook host {host} resolves to forbidden address {ip}"
            )));
        }
    }
    Ok(())
}

/// Addresses webhooks must never reach: loopback, RFC1918 private, link-local,
/// CGNAT, unspecified/broadcast/multicast/reserved, and their IPv6 analogues
/// (loopback, unique-local fc00::/7, link-local fe80::/10, v4-mapped forms).
pub fn is_forbidden_destination(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            let octets = v4.octets();
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
                || v4.is_multicast()
                || v4.is_documentation()
                // CGNAT 100.64.0.0/10
                || (octets[0] == 100 && (octets[1] & 0xc0) == 64)
                // Reserved 240.0.0.0/4
                || octets[0] >= 240
        }
        IpAddr::V6(v6) => {
            if let Some(v4) = v6.to_ipv4_mapped() {
                return is_forbidden_destination(IpAddr::V4(v4));
            }
            let segments = v6.segments();
            v6.is_loopback()
                || v6.is_unspecified()
                || v6.is_multicast()
                // Unique-local fc00::/7
                || (segments[0] & 0xfe00) == 0xfc00
                // Link-local fe80::/10
                || (segments[0] & 0xffc0) == 0xfe80
        }
    }
}

/// Bridges terminal lifecycle events onto the delivery queue.
pub struct WebhookHandler {
    db: Arc<DatabaseConnection>,
    dispatcher: Arc<WebhookDispatcher>,
}

impl WebhookHandler {
    pub fn new(db: Arc<DatabaseConnection>, dispatcher: Arc<WebhookDispatcher>) -> Self {
        Self { db, dispatcher }
    }
}

#[async_trait]
impl EventHandler for WebhookHandler {
    async fn handle(&self, event: &DomainEvent) {
        let DomainEvent::MeetingEnded {
            meeting_id,
            owner_id,
            payload,
        } = event
        else {
            return;
        };

        let owner = match entity_api::user::find_by_id(&self.db, *owner_id).await {
            Ok(owner) => owner,
            Err(e) => {
                warn!("Webhook skipped, owner {owner_id} not loadable: {e}");
                return;
            }
        };

        let Some(url) = owner.webhook_url else {
            debug!("Meeting {meeting_id} ended; owner has no webhook URL");
            return;
        };

        self.dispatcher.enqueue(WebhookJob {
            meeting_id: *meeting_id,
            user_id: *owner_id,
            url,
            secret: owner.webhook_secret,
            payload: payload.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn test_loopback_and_private_v4_ranges_are_forbidden() {
        for ip in [
            "127.0.0.1",
            "127.255.255.254",
            "10.0.0.1",
            "172.16.5.5",
            "192.168.1.1",
            "169.254.169.254",
            "100.64.0.1",
            "0.0.0.0",
            "255.255.255.255",
            "240.0.0.1",
            "224.0.0.1",
        ] {
            let ip: IpAddr = ip.parse().unwrap();
            assert!(is_forbidden_destination(ip), "{ip} should be forbidden");
        }
    }

    #[test]
    fn test_public_v4_addresses_are_allowed() {
        for ip in ["93.184.216.34", "8.8.8.8", "172.32.0.1", "100.128.0.1"] {
            let ip: IpAddr = ip.parse().unwrap();
            assert!(!is_forbidden_destination(ip), "{ip} should be allowed");
        }
    }

    #[test]
    fn test_v6_local_ranges_are_forbidden() {
        let loopback: IpAddr = Ipv6Addr::LOCALHOST.into();
        assert!(is_forbidden_destination(loopback));

        let unique_local: IpAddr = "fd12:3456:789a::1".parse().unwrap();
        assert!(is_forbidden_destination(unique_local));

        let link_local: IpAddr = "fe80::1".parse().unwrap();
        assert!(is_forbidden_destination(link_local));

        let mapped_loopback: IpAddr = Ipv4Addr::new(127, 0, 0, 1).to_ipv6_mapped().into();
        assert!(is_forbidden_destination(mapped_loopback));
    }

    #[test]
    fn test_public_v6_addresses_are_allowed() {
        let public: IpAddr = "2606:2800:220:1:248:1893:25c8:1946".parse().unwrap();
        assert!(!is_forbidden_destination(public));
    }

    #[tokio::test]
    async fn test_send_time_guard_rejects_loopback_urls() {
        let url: reqwest::Url = "http://127.0.0.1:9/hook".parse().unwrap();
        assert!(check_destination(&url).await.is_err());
    }

    #[tokio::test]
    async fn test_backoff_schedule_is_bounded() {
        // Doubling from 1s keeps the total sleep inside the ~30s retry budget.
        let policy = WebhookPolicy::default();
        let total: u64 = (1..policy.attempts.max(1))
            .map(|attempt| policy.base_delay.as_secs() * 2u64.pow(attempt - 1))
            .sum();
        assert!(total <= 30, "total backoff {total}s exceeds the budget");
    }
}
