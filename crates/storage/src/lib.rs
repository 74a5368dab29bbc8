use std::{str::FromStr, time::Duration};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use shared::{
    domain::{JobLogEntry, JobResult, JobStatus, LogLevel, ResultFilter, StatusLabel},
    repo::{JobLogRepo, JobResultRepo, JobStatusRepo},
};
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions, PgRow},
    Pool, Postgres, Row,
};
use tracing::debug;

/// Upper bound on rows returned for a single job's history.
pub const JOB_HISTORY_LIMIT: i64 = 1000;

/// Fewest pooled connections that still lets all three domains fetch at once.
pub const MIN_CONNECTIONS: u32 = 3;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Postgres>,
    schema: String,
    show_sql: bool,
}

#[derive(Debug, Clone)]
pub struct StorageOptions {
    pub database_url: String,
    pub username: String,
    pub password: String,
    pub schema: String,
    pub max_connections: u32,
    pub show_sql: bool,
}

impl Storage {
    pub async fn connect(options: &StorageOptions) -> Result<Self> {
        validate_schema(&options.schema)?;

        let database_url = normalize_database_url(&options.database_url);
        let mut connect_options = PgConnectOptions::from_str(&database_url)
            .with_context(|| format!("invalid postgres url '{database_url}'"))?;
        if !options.username.is_empty() {
            connect_options = connect_options.username(&options.username);
        }
        if !options.password.is_empty() {
            connect_options = connect_options.password(&options.password);
        }

        let pool = PgPoolOptions::new()
            .max_connections(options.max_connections.max(MIN_CONNECTIONS))
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_with(connect_options)
            .await
            .with_context(|| format!("failed to connect to postgres at '{database_url}'"))?;

        Self::from_pool(pool, &options.schema, options.show_sql)
    }

    pub fn from_pool(pool: Pool<Postgres>, schema: &str, show_sql: bool) -> Result<Self> {
        validate_schema(schema)?;
        Ok(Self {
            pool,
            schema: schema.to_string(),
            show_sql,
        })
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i32 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("postgres ping failed")?;
        Ok(())
    }

    fn trace_sql(&self, operation: &str, sql: &str, args: &[(&str, &dyn std::fmt::Debug)]) {
        if self.show_sql {
            let args = args
                .iter()
                .map(|(name, value)| format!("{name} = {value:?}"))
                .collect::<Vec<_>>()
                .join(", ");
            debug!(operation, %args, "{sql}");
        }
    }
}

#[async_trait]
impl JobResultRepo for Storage {
    async fn fetch_latest(
        &self,
        job_name_prefix: &str,
        filter: ResultFilter,
    ) -> Result<Vec<JobResult>> {
        let sql = latest_results_sql(&self.schema);
        self.trace_sql(
            "job_results.fetch_latest",
            &sql,
            &[("job_name_prefix", &job_name_prefix), ("filter", &filter)],
        );

        let rows = sqlx::query(&sql)
            .bind(job_name_prefix)
            .bind(filter.db_name())
            .fetch_all(&self.pool)
            .await
            .context("failed to query latest job results")?;
        rows.iter().map(job_result_from_row).collect()
    }

    async fn fetch_for_job(&self, job_name: &str, filter: ResultFilter) -> Result<Vec<JobResult>> {
        let sql = job_history_sql(&self.schema);
        self.trace_sql(
            "job_results.fetch_for_job",
            &sql,
            &[("job_name", &job_name), ("filter", &filter)],
        );

        let rows = sqlx::query(&sql)
            .bind(job_name)
            .bind(filter.db_name())
            .bind(JOB_HISTORY_LIMIT)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("failed to query result history for job '{job_name}'"))?;
        rows.iter().map(job_result_from_row).collect()
    }
}

#[async_trait]
impl JobStatusRepo for Storage {
    async fn fetch_all_latest(&self) -> Result<Vec<JobStatus>> {
        let sql = latest_statuses_sql(&self.schema);
        self.trace_sql("job_status.fetch_all_latest", &sql, &[]);

        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .context("failed to query latest job statuses")?;
        rows.iter().map(job_status_from_row).collect()
    }
}

#[async_trait]
impl JobLogRepo for Storage {
    async fn fetch_filtered(
        &self,
        job_name_prefix: &str,
        level: LogLevel,
        max_rows: u32,
    ) -> Result<Vec<JobLogEntry>> {
        let sql = log_entries_sql(&self.schema);
        self.trace_sql(
            "job_log.fetch_filtered",
            &sql,
            &[
                ("job_name_prefix", &job_name_prefix),
                ("level", &level),
                ("max_rows", &max_rows),
            ],
        );

        let rows = sqlx::query(&sql)
            .bind(job_name_prefix)
            .bind(level.db_name())
            .bind(i64::from(max_rows))
            .fetch_all(&self.pool)
            .await
            .context("failed to query job log entries")?;
        rows.iter().map(log_entry_from_row).collect()
    }
}

/// Accepts JDBC-style urls (`jdbc:postgresql://...`) as well as native ones.
pub fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();
    let url = raw_database_url
        .strip_prefix("jdbc:")
        .unwrap_or(raw_database_url);

    if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        return url.to_string();
    }

    format!("postgres://{url}")
}

fn validate_schema(schema: &str) -> Result<()> {
    let mut chars = schema.chars();
    let Some(first) = chars.next() else {
        bail!("schema name must not be empty");
    };
    if !(first.is_ascii_alphabetic() || first == '_')
        || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        bail!("schema name '{schema}' is not a plain SQL identifier");
    }
    Ok(())
}

fn latest_results_sql(schema: &str) -> String {
    format!(
        "SELECT j.job_name, j.start_time, j.end_time, j.result, j.error_message, j.skip_reason
         FROM {schema}.job_result_snapshot AS j
         WHERE STARTS_WITH(j.job_name, $1)
           AND ($2::TEXT IS NULL OR j.result = $2)
         ORDER BY j.end_time DESC"
    )
}

fn job_history_sql(schema: &str) -> String {
    format!(
        "SELECT j.job_name, j.start_time, j.end_time, j.result, j.error_message, j.skip_reason
         FROM {schema}.job_result AS j
         WHERE j.job_name = $1
           AND ($2::TEXT IS NULL OR j.result = $2)
         ORDER BY j.end_time DESC
         LIMIT $3"
    )
}

/// Ranks come from `StatusLabel::priority`. An unknown label sorts into the
/// last bucket, then fails the whole fetch in `job_status_from_row`.
fn latest_statuses_sql(schema: &str) -> String {
    let ranks: String = StatusLabel::ALL
        .iter()
        .map(|label| {
            format!(
                "\n             WHEN '{}' THEN {}",
                label.label(),
                label.priority()
            )
        })
        .collect();
    format!(
        "SELECT j.job_name, j.status, j.error_message, j.skip_reason, j.ts
         FROM {schema}.job_status_snapshot AS j
         ORDER BY
           CASE j.status{ranks}
             ELSE {other}
           END
         , j.ts",
        other = StatusLabel::OTHER_PRIORITY
    )
}

fn log_entries_sql(schema: &str) -> String {
    format!(
        "SELECT l.log_name, l.log_level, l.message, l.ts
         FROM {schema}.log AS l
         WHERE STARTS_WITH(l.log_name, $1)
           AND ($2::TEXT IS NULL OR l.log_level = $2)
         ORDER BY l.ts DESC
         LIMIT $3"
    )
}

/// An unrecognised value fails the row, and with it the whole fetch.
fn parse_column<T>(raw: String, table: &str, job_name: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse::<T>()
        .with_context(|| format!("bad {table} row for job '{job_name}'"))
}

fn job_result_from_row(row: &PgRow) -> Result<JobResult> {
    Ok(JobResult {
        job_name: row.try_get("job_name")?,
        start: row.try_get("start_time")?,
        end: row.try_get("end_time")?,
        result: row.try_get("result")?,
        skip_reason: row.try_get("skip_reason")?,
        error_message: row.try_get("error_message")?,
    })
}

fn job_status_from_row(row: &PgRow) -> Result<JobStatus> {
    let job_name: String = row.try_get("job_name")?;
    let status: StatusLabel = parse_column(row.try_get("status")?, "status", &job_name)?;
    Ok(JobStatus {
        job_name,
        status,
        error_message: row.try_get("error_message")?,
        skip_reason: row.try_get("skip_reason")?,
        ts: row.try_get("ts")?,
    })
}

fn log_entry_from_row(row: &PgRow) -> Result<JobLogEntry> {
    let job_name: String = row.try_get("log_name")?;
    let level: LogLevel = parse_column(row.try_get("log_level")?, "log", &job_name)?;
    Ok(JobLogEntry {
        job_name,
        level,
        message: row.try_get("message")?,
        ts: row.try_get("ts")?,
    })
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
