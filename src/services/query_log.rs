use crate::config::DatabaseSettings;
use crate::models::QueryLogRecord;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when writing query history
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Write timed out after {0:?}")]
    Timeout(Duration),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Append-only destination for query history
#[async_trait]
pub trait QueryStore: Send + Sync {
    async fn append(&self, record: &QueryLogRecord) -> Result<(), LoggingError>;
}

/// PostgreSQL store for route query history
///
/// Rows are only ever inserted; this service never updates or deletes them.
pub struct PostgresQueryStore {
    pool: PgPool,
}

impl PostgresQueryStore {
    /// Connect to PostgreSQL and run migrations
    pub async fn connect(
        database_url: &str,
        settings: &DatabaseSettings,
    ) -> Result<Self, LoggingError> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections.unwrap_or(10))
            .min_connections(settings.min_connections.unwrap_or(1))
            .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
            .idle_timeout(Duration::from_secs(600))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Connect using the configured URL, if any
    pub async fn from_settings(settings: &DatabaseSettings) -> Result<Self, LoggingError> {
        let url = settings
            .url
            .as_deref()
            .ok_or_else(|| LoggingError::Unavailable("database.url is not set".into()))?;

        tracing::info!("Connecting to PostgreSQL query-log store");
        Self::connect(url, settings).await
    }
}

#[async_trait]
impl QueryStore for PostgresQueryStore {
    async fn append(&self, record: &QueryLogRecord) -> Result<(), LoggingError> {
        let query = r#"
            INSERT INTO route_queries
                (id, start_address, end_address, waypoint_count, success, error, result, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#;

        let result = record
            .result
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;

        sqlx::query(query)
            .bind(record.id)
            .bind(&record.start_address)
            .bind(&record.end_address)
            .bind(record.waypoint_count)
            .bind(record.success)
            .bind(&record.error)
            .bind(result)
            .bind(record.created_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

/// Best-effort query history writer
///
/// Each write runs in its own detached task bounded by the write timeout.
/// Outcomes are only reported through tracing events.
#[derive(Clone)]
pub struct QueryLogger {
    store: Option<Arc<dyn QueryStore>>,
    write_timeout: Duration,
}

impl QueryLogger {
    pub fn new(store: Option<Arc<dyn QueryStore>>, write_timeout: Duration) -> Self {
        Self { store, write_timeout }
    }

    /// Logger that drops every record
    pub fn disabled() -> Self {
        Self::new(None, Duration::from_secs(1))
    }

    pub fn is_connected(&self) -> bool {
        self.store.is_some()
    }

    /// Spawn the write and return immediately
    ///
    /// The returned handle may be dropped; awaiting it only observes that the
    /// attempt finished, never its error.
    pub fn log_query(&self, record: QueryLogRecord) -> tokio::task::JoinHandle<()> {
        let store = self.store.clone();
        let write_timeout = self.write_timeout;

        tokio::spawn(async move {
            let Some(store) = store else {
                tracing::warn!("Query-log store not available, skipping log for {}", record.id);
                return;
            };

            let outcome = match tokio::time::timeout(write_timeout, store.append(&record)).await {
                Ok(result) => result,
                Err(_) => Err(LoggingError::Timeout(write_timeout)),
            };

            match outcome {
                Ok(()) => tracing::info!(
                    query_id = %record.id,
                    success = record.success,
                    "Query logged"
                ),
                Err(e) => tracing::error!(query_id = %record.id, "Error logging query: {}", e),
            }
        })
    }
}
