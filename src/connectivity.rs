//! Network reachability checks
//!
//! [`Connectivity::is_online`] never fails: any probe error reads as offline
//! so callers degrade to the cache instead of attempting a doomed request.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::config::ConnectivityConfig;

/// Reports current network reachability on demand
#[async_trait]
pub trait Connectivity: Send + Sync {
    async fn is_online(&self) -> bool;
}

/// Probes a lightweight endpoint; any HTTP response counts as online
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: Option<Client>,
    probe_url: String,
}

impl HttpProbe {
    pub fn new(config: &ConnectivityConfig) -> Self {
        // A client that fails to build leaves the probe permanently offline
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .ok();
        Self {
            client,
            probe_url: config.probe_url.clone(),
        }
    }

    pub fn with_client(client: Client, probe_url: impl Into<String>) -> Self {
        Self {
            client: Some(client),
            probe_url: probe_url.into(),
        }
    }
}

#[async_trait]
impl Connectivity for HttpProbe {
    async fn is_online(&self) -> bool {
        let Some(client) = &self.client else {
            return false;
        };
        match client.head(&self.probe_url).send().await {
            Ok(_) => true,
            Err(e) => {
                debug!(error = %e, url = %self.probe_url, "connectivity probe failed");
                false
            }
        }
    }
}

/// Fixed reachability, switchable at runtime
///
/// Used for forced offline mode and in tests.
#[derive(Debug)]
pub struct StaticConnectivity {
    online: AtomicBool,
}

impl StaticConnectivity {
    pub fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
        }
    }

    pub fn online() -> Self {
        Self::new(true)
    }

    pub fn offline() -> Self {
        Self::new(false)
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

#[async_trait]
impl Connectivity for StaticConnectivity {
    async fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_static_connectivity_toggles() {
        let connectivity = StaticConnectivity::offline();
        assert!(!connectivity.is_online().await);

        connectivity.set_online(true);
        assert!(connectivity.is_online().await);
    }

    #[tokio::test]
    async fn test_probe_online_when_server_answers() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let probe = HttpProbe::with_client(Client::new(), server.uri());
        assert!(probe.is_online().await);
    }

    #[tokio::test]
    async fn test_probe_error_status_still_counts_as_online() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let probe = HttpProbe::with_client(Client::new(), server.uri());
        assert!(probe.is_online().await);
    }

    #[tokio::test]
    async fn test_probe_unreachable_resolves_offline() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let uri = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let probe = HttpProbe::with_client(Client::new(), uri);
        assert!(!probe.is_online().await);
    }

    #[tokio::test]
    async fn test_probe_invalid_url_resolves_offline() {
        let probe = HttpProbe::with_client(Client::new(), "not a url");
        assert!(!probe.is_online().await);
    }
}
