//! ClickHouse client wrapper.

use crate::config::ClickHouseConfig;
use clickhouse::Client;
use funnel_core::Result;
use tracing::info;

/// ClickHouse client wrapper.
///
/// `inner` is bound to the configured database; `server` is not, so DDL
/// can create the database before anything else uses it.
#[derive(Clone)]
pub struct ClickHouseClient {
    inner: Client,
    server: Client,
    config: ClickHouseConfig,
}

impl ClickHouseClient {
    /// Creates a new ClickHouse client.
    pub fn new(config: ClickHouseConfig) -> Result<Self> {
        let mut server = Client::default()
            .with_url(&config.url)
            .with_option("max_execution_time", config.max_execution_secs.to_string());

        if let Some(ref user) = config.username {
            server = server.with_user(user);
        }

        if let Some(ref pass) = config.password {
            server = server.with_password(pass);
        }

        let inner = server.clone().with_database(&config.database);

        info!(
            url = %config.url,
            database = %config.database,
            max_execution_secs = config.max_execution_secs,
            "Created ClickHouse client"
        );

        Ok(Self {
            inner,
            server,
            config,
        })
    }

    /// Returns the client bound to the feedback database.
    pub fn inner(&self) -> &Client {
        &self.inner
    }

    /// Returns the client without a default database.
    pub fn server(&self) -> &Client {
        &self.server
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ClickHouseConfig {
        &self.config
    }
}
