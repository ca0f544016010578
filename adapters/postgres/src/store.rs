//! Metrics-instrumented store over a Postgres pool.
//!
//! Every call takes a query name used as the metric label, so dashboards
//! partition latency and error rates per logical query rather than per
//! SQL text. "No rows" is a domain outcome, not a failure, and is
//! counted as success. Driver errors are passed through untouched.

use sqlx::postgres::{PgArguments, PgPool, PgQueryResult, PgRow};
use sqlx::query::{Query, QueryAs};
use sqlx::{FromRow, Postgres};
use std::time::{Duration, Instant};
use svckit_core::SqlLabels;
use tracing::debug;

const STATS_INTERVAL: Duration = Duration::from_secs(5);

/// Instrumented handle over a [`PgPool`].
#[derive(Debug, Clone)]
pub struct Store {
    pool: PgPool,
    labels: SqlLabels,
}

impl Store {
    pub fn new(pool: PgPool, labels: SqlLabels) -> Self {
        Self { pool, labels }
    }

    /// The underlying pool, for paths that bypass instrumentation.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Periodically copy pool counters into gauges until the pool closes.
    pub fn start_stats_collector(&self) -> tokio::task::JoinHandle<()> {
        let pool = self.pool.clone();
        let labels = self.labels.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(STATS_INTERVAL);
            loop {
                ticker.tick().await;
                if pool.is_closed() {
                    debug!("pool closed, stopping stats collector");
                    break;
                }
                labels.set_pool_stats(
                    pool.options().get_max_connections(),
                    pool.size(),
                    pool.num_idle() as u32,
                );
            }
        })
    }

    pub async fn execute(
        &self,
        name: &str,
        query: Query<'_, Postgres, PgArguments>,
    ) -> Result<PgQueryResult, sqlx::Error> {
        let start = Instant::now();
        let result = query.execute(&self.pool).await;
        self.labels
            .observe_query(name, start.elapsed(), is_success(&result));
        result
    }

    pub async fn fetch_one(
        &self,
        name: &str,
        query: Query<'_, Postgres, PgArguments>,
    ) -> Result<PgRow, sqlx::Error> {
        let start = Instant::now();
        let result = query.fetch_one(&self.pool).await;
        self.labels
            .observe_query(name, start.elapsed(), is_success(&result));
        result
    }

    pub async fn fetch_optional(
        &self,
        name: &str,
        query: Query<'_, Postgres, PgArguments>,
    ) -> Result<Option<PgRow>, sqlx::Error> {
        let start = Instant::now();
        let result = query.fetch_optional(&self.pool).await;
        self.labels
            .observe_query(name, start.elapsed(), is_success(&result));
        result
    }

    pub async fn fetch_all(
        &self,
        name: &str,
        query: Query<'_, Postgres, PgArguments>,
    ) -> Result<Vec<PgRow>, sqlx::Error> {
        let start = Instant::now();
        let result = query.fetch_all(&self.pool).await;
        self.labels
            .observe_query(name, start.elapsed(), is_success(&result));
        result
    }

    /// Typed single-row fetch, the `query_as` counterpart of [`Store::fetch_one`].
    pub async fn fetch_one_as<'q, T>(
        &self,
        name: &str,
        query: QueryAs<'q, Postgres, T, PgArguments>,
    ) -> Result<T, sqlx::Error>
    where
        T: Send + Unpin + for<'r> FromRow<'r, PgRow>,
    {
        let start = Instant::now();
        let result = query.fetch_one(&self.pool).await;
        self.labels
            .observe_query(name, start.elapsed(), is_success(&result));
        result
    }

    /// Typed multi-row fetch, the `query_as` counterpart of [`Store::fetch_all`].
    pub async fn fetch_all_as<'q, T>(
        &self,
        name: &str,
        query: QueryAs<'q, Postgres, T, PgArguments>,
    ) -> Result<Vec<T>, sqlx::Error>
    where
        T: Send + Unpin + for<'r> FromRow<'r, PgRow>,
    {
        let start = Instant::now();
        let result = query.fetch_all(&self.pool).await;
        self.labels
            .observe_query(name, start.elapsed(), is_success(&result));
        result
    }

    /// Open a transaction with the same instrumented surface.
    pub async fn begin(&self) -> Result<StoreTx, sqlx::Error> {
        let tx = self.pool.begin().await?;
        Ok(StoreTx {
            tx,
            labels: self.labels.clone(),
        })
    }
}

/// Instrumented transaction handle.
pub struct StoreTx {
    tx: sqlx::Transaction<'static, Postgres>,
    labels: SqlLabels,
}

impl StoreTx {
    pub async fn execute(
        &mut self,
        name: &str,
        query: Query<'_, Postgres, PgArguments>,
    ) -> Result<PgQueryResult, sqlx::Error> {
        let start = Instant::now();
        let result = query.execute(&mut *self.tx).await;
        self.labels
            .observe_query(name, start.elapsed(), is_success(&result));
        result
    }

    pub async fn fetch_one(
        &mut self,
        name: &str,
        query: Query<'_, Postgres, PgArguments>,
    ) -> Result<PgRow, sqlx::Error> {
        let start = Instant::now();
        let result = query.fetch_one(&mut *self.tx).await;
        self.labels
            .observe_query(name, start.elapsed(), is_success(&result));
        result
    }

    pub async fn fetch_optional(
        &mut self,
        name: &str,
        query: Query<'_, Postgres, PgArguments>,
    ) -> Result<Option<PgRow>, sqlx::Error> {
        let start = Instant::now();
        let result = query.fetch_optional(&mut *self.tx).await;
        self.labels
            .observe_query(name, start.elapsed(), is_success(&result));
        result
    }

    pub async fn fetch_all(
        &mut self,
        name: &str,
        query: Query<'_, Postgres, PgArguments>,
    ) -> Result<Vec<PgRow>, sqlx::Error> {
        let start = Instant::now();
        let result = query.fetch_all(&mut *self.tx).await;
        self.labels
            .observe_query(name, start.elapsed(), is_success(&result));
        result
    }

    pub async fn commit(self) -> Result<(), sqlx::Error> {
        self.tx.commit().await
    }

    pub async fn rollback(self) -> Result<(), sqlx::Error> {
        self.tx.rollback().await
    }
}

/// Success for metrics purposes; an empty result set is not a failure.
fn is_success<T>(result: &Result<T, sqlx::Error>) -> bool {
    match result {
        Ok(_) => true,
        Err(sqlx::Error::RowNotFound) => true,
        Err(_) => false,
    }
}
