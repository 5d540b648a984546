//! Testcontainer setup for ClickHouse.
//!
//! Set `FUNNEL_TEST_CLICKHOUSE_URL` to run against an existing server
//! instead of starting a container. Every context gets its own database,
//! so tests sharing a server do not see each other's records.

use funnel_core::FeedbackId;
use std::time::Duration;
use testcontainers::{
    core::{IntoContainerPort, WaitFor},
    runners::AsyncRunner,
    ContainerAsync, GenericImage, ImageExt,
};

const CLICKHOUSE_IMAGE: &str = "clickhouse/clickhouse-server";
const CLICKHOUSE_TAG: &str = "24.3";
const HTTP_PORT: u16 = 8123;

/// Connection details for a ClickHouse server, plus the container that
/// backs it when one was started.
pub struct TestContainers {
    #[allow(dead_code)]
    clickhouse: Option<ContainerAsync<GenericImage>>,
    pub clickhouse_url: String,
    pub clickhouse_database: String,
    pub clickhouse_username: Option<String>,
    pub clickhouse_password: Option<String>,
}

impl TestContainers {
    /// Uses the external server when configured, otherwise starts one.
    pub async fn start() -> Self {
        let database = isolated_database_name();

        if let Some(url) = env_nonempty("FUNNEL_TEST_CLICKHOUSE_URL") {
            return Self {
                clickhouse: None,
                clickhouse_url: url,
                clickhouse_database: database,
                clickhouse_username: env_nonempty("FUNNEL_TEST_CLICKHOUSE_USER"),
                clickhouse_password: env_nonempty("FUNNEL_TEST_CLICKHOUSE_PASSWORD"),
            };
        }

        let (clickhouse, clickhouse_url) = start_clickhouse().await;

        Self {
            clickhouse: Some(clickhouse),
            clickhouse_url,
            clickhouse_database: database,
            clickhouse_username: Some("default".to_string()),
            clickhouse_password: None,
        }
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// `funnel_test_<32 hex>`; schema init creates it.
fn isolated_database_name() -> String {
    format!("funnel_test_{}", FeedbackId::generate().as_uuid().simple())
}

/// Start ClickHouse container, return container and HTTP URL.
pub async fn start_clickhouse() -> (ContainerAsync<GenericImage>, String) {
    // CLICKHOUSE_DEFAULT_ACCESS_MANAGEMENT=1 allows the passwordless default user
    let image = GenericImage::new(CLICKHOUSE_IMAGE, CLICKHOUSE_TAG)
        .with_wait_for(WaitFor::seconds(5))
        .with_exposed_port(HTTP_PORT.tcp())
        .with_env_var("CLICKHOUSE_DEFAULT_ACCESS_MANAGEMENT", "1")
        .with_env_var("CLICKHOUSE_USER", "default")
        .with_env_var("CLICKHOUSE_PASSWORD", "");

    let container = image.start().await.expect("Failed to start ClickHouse");

    let port = container
        .get_host_port_ipv4(HTTP_PORT)
        .await
        .expect("ClickHouse HTTP port is mapped");
    let url = format!("http://127.0.0.1:{}", port);

    wait_for_http(&url, Duration::from_secs(30)).await;

    (container, url)
}

/// Polls `/ping` until the server answers.
async fn wait_for_http(url: &str, timeout: Duration) {
    let client = reqwest::Client::new();
    let ping = format!("{}/ping", url);
    let start = std::time::Instant::now();

    while start.elapsed() < timeout {
        if let Ok(resp) = client.get(&ping).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
    panic!("ClickHouse at {} not ready after {:?}", url, timeout);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_names_are_unique_identifiers() {
        let a = isolated_database_name();
        let b = isolated_database_name();
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
    }
}
