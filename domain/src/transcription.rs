//! Startup reachability probe against the transcription sink.
//!
//! Workers stream audio to the sink directly; the orchestrator only checks at
//! boot that the configured endpoint answers at all, so a misconfigured
//! TRANSCRIBER_URL fails fast instead of on the first dispatch. The probe is
//! bypassed with SKIP_TRANSCRIPTION_CHECK.

use crate::error::Error;
use log::*;
use service::config::Config;
use std::time::Duration;

pub async fn probe(config: &Config) -> Result<(), Error> {
    let Some(url) = config.transcriber_url() else {
        return Err(Error::internal("No transcription sink URL configured"));
    };

    let client = reqwest::Client::builder()
        .use_rustls_tls()
        .timeout(Duration::from_secs(5))
        .build()?;

    let mut request = client.get(&url);
    if let Some(api_key) = config.transcriber_api_key() {
        request = request.bearer_auth(api_key);
    }

    let response = request.send().await.map_err(|e| {
        warn!("Transcription sink {url} is unreachable: {e:?}");
        Error::from(e)
    })?;

    // Any HTTP answer proves the endpoint is alive; auth or method errors are
    // for the worker's protocol to sort out.
    info!(
        "Transcription sink {url} answered with {}",
        response.status()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use service::config::Config;

    fn config_with_transcriber(url: Option<String>) -> Config {
        Config::parse_from(["vexa_orchestrator"]).set_transcriber_url(url)
    }

    #[tokio::test]
    async fn test_probe_fails_without_a_configured_url() {
        let config = config_with_transcriber(None);
        assert!(probe(&config).await.is_err());
    }

    #[tokio::test]
    async fn test_probe_succeeds_against_a_live_endpoint() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .with_status(200)
            .create_async()
            .await;

        let config = config_with_transcriber(Some(server.url()));
        assert!(probe(&config).await.is_ok());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_probe_accepts_auth_rejections_as_reachable() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/")
            .with_status(401)
            .create_async()
            .await;

        let config = config_with_transcriber(Some(server.url()));
        assert!(probe(&config).await.is_ok());
    }
}
