use std::sync::Arc;

use async_trait::async_trait;
use shared::{
    domain::{JobLogEntry, LogLevel},
    repo::JobLogRepo,
};

use crate::{
    bloc::Domain,
    bus::{EventBus, Published, RefreshEvent},
    state::{Intent, State},
};

pub const DEFAULT_LOG_BUS_CAPACITY: usize = 5;
pub const DEFAULT_MAX_LOG_ENTRIES: u32 = 1000;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFilters {
    pub job_name_prefix: String,
    pub level: LogLevel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEvent {
    Refresh,
    FilterChanged {
        job_name_prefix: String,
        level: LogLevel,
    },
}

impl RefreshEvent for LogEvent {
    fn refresh() -> Self {
        LogEvent::Refresh
    }
}

impl From<LogEvent> for Intent<LogFilters> {
    fn from(event: LogEvent) -> Self {
        match event {
            LogEvent::Refresh => Intent::Refresh,
            LogEvent::FilterChanged {
                job_name_prefix,
                level,
            } => Intent::FilterChanged(LogFilters {
                job_name_prefix,
                level,
            }),
        }
    }
}

impl EventBus<LogEvent> {
    pub fn set_filter(&self, job_name_prefix: impl Into<String>, level: LogLevel) -> Published {
        self.publish(LogEvent::FilterChanged {
            job_name_prefix: job_name_prefix.into(),
            level,
        })
    }
}

pub type LogState = State<JobLogEntry, LogFilters>;

pub struct LogDomain {
    repo: Arc<dyn JobLogRepo>,
    max_entries: u32,
}

impl LogDomain {
    pub fn new(repo: Arc<dyn JobLogRepo>, max_entries: u32) -> Self {
        Self { repo, max_entries }
    }
}

#[async_trait]
impl Domain for LogDomain {
    const NAME: &'static str = "job_log";

    type Row = JobLogEntry;
    type Filter = LogFilters;
    type Event = LogEvent;

    async fn fetch(&self, filter: &LogFilters) -> anyhow::Result<Vec<JobLogEntry>> {
        self.repo
            .fetch_filtered(&filter.job_name_prefix, filter.level, self.max_entries)
            .await
    }

    fn job_name(row: &JobLogEntry) -> &str {
        &row.job_name
    }
}

#[cfg(test)]
#[path = "tests/job_log_tests.rs"]
mod tests;
