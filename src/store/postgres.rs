//! PostgreSQL message store over a Mattermost-style `posts` table.

use super::{MessageStore, StoreError, StoreResult, StoreSession};
use crate::config::DatabaseConfig;
use crate::span::types::{ChannelId, RawTimestampRange};
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;
use std::{fmt, time::Duration};

/// Earliest and latest creation time (epoch ms) of one channel's posts
const TIMESTAMP_RANGE_SQL: &str =
    "SELECT MIN(createat) AS earliest, MAX(createat) AS latest FROM posts WHERE channelid = $1";

/// Opens a dedicated connection per session; no pool is shared between calls.
pub struct PgMessageStore {
    options: PgConnectOptions,
    connect_timeout: Duration,
}

impl PgMessageStore {
    /// Creates a store from injected configuration. Nothing is connected yet.
    pub fn new(config: &DatabaseConfig) -> Self {
        let mut options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .database(&config.name)
            .application_name("chanspan");

        if let Some(password) = &config.password {
            options = options.password(password);
        }

        Self { options, connect_timeout: config.timeout() }
    }

    /// Opens a session, runs `SELECT 1` and closes it again. A single attempt.
    pub async fn check_connection(&self) -> StoreResult<()> {
        let mut session = self.open().await?;
        let probe = sqlx::query("SELECT 1").execute(&mut session.conn).await.map_err(StoreError::Query);
        session.close().await?;
        probe.map(|_| ())
    }

    /// Gets safe connection details for logging or display.
    /// The password is never part of it.
    pub fn connection_info(&self) -> StoreConnectionInfo {
        StoreConnectionInfo::from_options(&self.options)
    }

    pub fn log_connection_info(&self) {
        tracing::info!("Using message store: {}", self.connection_info());
    }
}

#[async_trait]
impl MessageStore for PgMessageStore {
    type Session = PgSession;

    async fn open(&self) -> StoreResult<PgSession> {
        let conn = tokio::time::timeout(self.connect_timeout, PgConnection::connect_with(&self.options))
            .await
            .map_err(|_| StoreError::Timeout(self.connect_timeout))?
            .map_err(StoreError::Connect)?;

        Ok(PgSession { conn })
    }
}

/// Dropping an unclosed session closes the socket without the graceful
/// terminate handshake.
pub struct PgSession {
    conn: PgConnection,
}

#[async_trait]
impl StoreSession for PgSession {
    async fn timestamp_range(&mut self, channel_id: &ChannelId) -> StoreResult<RawTimestampRange> {
        let (earliest, latest) = sqlx::query_as::<_, (Option<i64>, Option<i64>)>(TIMESTAMP_RANGE_SQL)
            .bind(channel_id.as_str())
            .fetch_one(&mut self.conn)
            .await
            .map_err(StoreError::Query)?;

        Ok(RawTimestampRange::new(earliest, latest))
    }

    async fn close(self) -> StoreResult<()> {
        self.conn.close().await.map_err(StoreError::Close)
    }
}

/// Safe-to-display message store connection information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConnectionInfo {
    pub host: String,
    pub port: u16,
    pub database_name: String,
    pub user: String,
}

impl StoreConnectionInfo {
    fn from_options(options: &PgConnectOptions) -> Self {
        Self {
            host: options.get_host().to_string(),
            port: options.get_port(),
            database_name: options.get_database().unwrap_or("unknown").to_string(),
            user: options.get_username().to_string(),
        }
    }
}

impl fmt::Display for StoreConnectionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "postgresql://{}@{}:{}/{}", self.user, self.host, self.port, self.database_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_info_masks_password() {
        let mut config = DatabaseConfig::default();
        config.host = "db.example.internal".to_string();
        config.port = 6432;
        config.user = "mmuser".to_string();
        config.password = Some("mmuser_password".to_string());
        config.name = "chat".to_string();

        let store = PgMessageStore::new(&config);
        let info = store.connection_info();
        assert_eq!(info.to_string(), "postgresql://mmuser@db.example.internal:6432/chat");
        assert!(!format!("{:?}", info).contains("mmuser_password"));
    }

    #[test]
    fn test_range_query_is_a_single_parameterized_aggregate() {
        assert!(TIMESTAMP_RANGE_SQL.contains("MIN(createat)"));
        assert!(TIMESTAMP_RANGE_SQL.contains("MAX(createat)"));
        assert!(TIMESTAMP_RANGE_SQL.contains("channelid = $1"));
    }
}
