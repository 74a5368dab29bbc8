use std::sync::Arc;

use async_trait::async_trait;
use shared::{domain::JobStatus, repo::JobStatusRepo};

use crate::{
    bloc::Domain,
    bus::{EventBus, Published, RefreshEvent},
    state::{Intent, State},
};

pub const DEFAULT_STATUS_BUS_CAPACITY: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusFilters {
    /// Case-insensitive substring of the job name.
    pub job_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    Refresh,
    FilterChanged { job_name: String },
    /// Raised by an external error reporter; shown as-is.
    Error { message: String },
}

impl RefreshEvent for StatusEvent {
    fn refresh() -> Self {
        StatusEvent::Refresh
    }
}

impl From<StatusEvent> for Intent<StatusFilters> {
    fn from(event: StatusEvent) -> Self {
        match event {
            StatusEvent::Refresh => Intent::Refresh,
            StatusEvent::FilterChanged { job_name } => {
                Intent::FilterChanged(StatusFilters { job_name })
            }
            StatusEvent::Error { message } => Intent::ReportError(message),
        }
    }
}

impl EventBus<StatusEvent> {
    pub fn set_filter(&self, job_name: impl Into<String>) -> Published {
        self.publish(StatusEvent::FilterChanged {
            job_name: job_name.into(),
        })
    }

    pub fn report_error(&self, message: impl Into<String>) -> Published {
        self.publish(StatusEvent::Error {
            message: message.into(),
        })
    }
}

pub type StatusState = State<JobStatus, StatusFilters>;

/// Statuses whose job name contains `text`, ignoring case.
pub fn filter_job_statuses(statuses: &[JobStatus], text: &str) -> Vec<JobStatus> {
    let needle = text.to_lowercase();
    statuses
        .iter()
        .filter(|status| status.job_name.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

/// Fetches every status once per refresh and filters the cached copy locally.
pub struct StatusDomain {
    repo: Arc<dyn JobStatusRepo>,
}

impl StatusDomain {
    pub fn new(repo: Arc<dyn JobStatusRepo>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl Domain for StatusDomain {
    const NAME: &'static str = "job_status";

    type Row = JobStatus;
    type Filter = StatusFilters;
    type Event = StatusEvent;

    async fn fetch(&self, _filter: &StatusFilters) -> anyhow::Result<Vec<JobStatus>> {
        self.repo.fetch_all_latest().await
    }

    fn job_name(row: &JobStatus) -> &str {
        &row.job_name
    }

    fn view(&self, fetched: &Arc<Vec<JobStatus>>, filter: &StatusFilters) -> Arc<Vec<JobStatus>> {
        if filter.job_name.is_empty() {
            Arc::clone(fetched)
        } else {
            Arc::new(filter_job_statuses(fetched, &filter.job_name))
        }
    }

    fn refetch_on_filter_change(&self) -> bool {
        false
    }
}

#[cfg(test)]
#[path = "tests/job_status_tests.rs"]
mod tests;
