//! Read-only repository seams for the three monitored domains.

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::{JobLogEntry, JobResult, JobStatus, LogLevel, ResultFilter};

#[async_trait]
pub trait JobResultRepo: Send + Sync {
    /// Most recent result per job whose name starts with `job_name_prefix`.
    async fn fetch_latest(
        &self,
        job_name_prefix: &str,
        filter: ResultFilter,
    ) -> Result<Vec<JobResult>>;

    /// Result history for a single job.
    async fn fetch_for_job(&self, job_name: &str, filter: ResultFilter) -> Result<Vec<JobResult>>;
}

#[async_trait]
pub trait JobStatusRepo: Send + Sync {
    /// Current status of every job, unfiltered.
    async fn fetch_all_latest(&self) -> Result<Vec<JobStatus>>;
}

#[async_trait]
pub trait JobLogRepo: Send + Sync {
    async fn fetch_filtered(
        &self,
        job_name_prefix: &str,
        level: LogLevel,
        max_rows: u32,
    ) -> Result<Vec<JobLogEntry>>;
}
