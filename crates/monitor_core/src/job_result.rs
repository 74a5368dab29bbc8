use std::sync::Arc;

use async_trait::async_trait;
use shared::{
    domain::{JobResult, ResultFilter, ALL_JOBS},
    repo::JobResultRepo,
};

use crate::{
    bloc::Domain,
    bus::{EventBus, Published, RefreshEvent},
    state::{Intent, State},
};

pub const DEFAULT_RESULT_BUS_CAPACITY: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultFilters {
    pub job_name_prefix: String,
    pub outcome: ResultFilter,
    /// A job name, or [`ALL_JOBS`] for the latest result of every job.
    pub selected_job: String,
}

impl Default for ResultFilters {
    fn default() -> Self {
        Self {
            job_name_prefix: String::new(),
            outcome: ResultFilter::All,
            selected_job: ALL_JOBS.to_string(),
        }
    }
}

impl ResultFilters {
    pub fn single_job(&self) -> Option<&str> {
        let job = self.selected_job.trim();
        (!job.is_empty() && job != ALL_JOBS).then_some(job)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultEvent {
    Refresh,
    FilterChanged {
        job_name_prefix: String,
        outcome: ResultFilter,
        selected_job: String,
    },
    RowSelected {
        index: usize,
    },
}

impl RefreshEvent for ResultEvent {
    fn refresh() -> Self {
        ResultEvent::Refresh
    }
}

impl From<ResultEvent> for Intent<ResultFilters> {
    fn from(event: ResultEvent) -> Self {
        match event {
            ResultEvent::Refresh => Intent::Refresh,
            ResultEvent::FilterChanged {
                job_name_prefix,
                outcome,
                selected_job,
            } => Intent::FilterChanged(ResultFilters {
                job_name_prefix,
                outcome,
                selected_job,
            }),
            ResultEvent::RowSelected { index } => Intent::SelectRow(index),
        }
    }
}

impl EventBus<ResultEvent> {
    pub fn set_filter(
        &self,
        job_name_prefix: impl Into<String>,
        outcome: ResultFilter,
        selected_job: impl Into<String>,
    ) -> Published {
        self.publish(ResultEvent::FilterChanged {
            job_name_prefix: job_name_prefix.into(),
            outcome,
            selected_job: selected_job.into(),
        })
    }

    pub fn row_selected(&self, index: usize) -> Published {
        self.publish(ResultEvent::RowSelected { index })
    }
}

pub type ResultState = State<JobResult, ResultFilters>;

pub struct ResultDomain {
    repo: Arc<dyn JobResultRepo>,
}

impl ResultDomain {
    pub fn new(repo: Arc<dyn JobResultRepo>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl Domain for ResultDomain {
    const NAME: &'static str = "job_results";

    type Row = JobResult;
    type Filter = ResultFilters;
    type Event = ResultEvent;

    async fn fetch(&self, filter: &ResultFilters) -> anyhow::Result<Vec<JobResult>> {
        match filter.single_job() {
            Some(job_name) => self.repo.fetch_for_job(job_name, filter.outcome).await,
            None => {
                self.repo
                    .fetch_latest(&filter.job_name_prefix, filter.outcome)
                    .await
            }
        }
    }

    fn job_name(row: &JobResult) -> &str {
        &row.job_name
    }
}
