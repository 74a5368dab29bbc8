//! Plain-text rendering of dashboard states and repository rows.

use monitor_core::{LogFilters, ResultFilters, State, StatusFilters};
use shared::{
    domain::{JobLogEntry, JobResult, JobStatus},
    time::abbreviated,
};

pub trait FilterSummary {
    fn summary(&self) -> String;
}

impl FilterSummary for ResultFilters {
    fn summary(&self) -> String {
        format!(
            "prefix='{}' result={} job={}",
            self.job_name_prefix, self.outcome, self.selected_job
        )
    }
}

impl FilterSummary for StatusFilters {
    fn summary(&self) -> String {
        format!("name~'{}'", self.job_name)
    }
}

impl FilterSummary for LogFilters {
    fn summary(&self) -> String {
        format!("prefix='{}' level={}", self.job_name_prefix, self.level)
    }
}

/// One line per state change, e.g.
/// `[results] loaded  rows=3 prefix='' result=all job=All | Last Refresh: 3/7 @ 4:05:09 PM | Idle`.
pub fn summary_line<R, F: FilterSummary>(domain: &str, state: &State<R, F>) -> String {
    let refreshed = state
        .latest_refresh()
        .map(|ts| abbreviated(&ts))
        .unwrap_or_else(|| "never".into());

    let mut line = format!(
        "[{domain}] {:<7} rows={}",
        state.kind(),
        state.rows().len()
    );
    if let Some(filter) = state.filter() {
        line.push(' ');
        line.push_str(&filter.summary());
    }
    if let Some(index) = state.selected_row() {
        line.push_str(&format!(" selected={index}"));
    }
    line.push_str(&format!(
        " | Last Refresh: {refreshed} | {}",
        state.status()
    ));
    line
}

pub fn result_row(row: &JobResult) -> String {
    let mut line = format!(
        "{:<32} {:<10} {} -> {} ({}s)",
        row.job_name,
        row.result,
        abbreviated(&row.start),
        abbreviated(&row.end),
        row.duration().num_seconds()
    );
    if let Some(reason) = &row.skip_reason {
        line.push_str(&format!(" skipped: {reason}"));
    }
    if let Some(message) = &row.error_message {
        line.push_str(&format!(" error: {message}"));
    }
    line
}

pub fn status_row(row: &JobStatus) -> String {
    let mut line = format!(
        "{:<32} {:<10} {}",
        row.job_name,
        row.status,
        abbreviated(&row.ts)
    );
    if let Some(reason) = &row.skip_reason {
        line.push_str(&format!(" skipped: {reason}"));
    }
    if let Some(message) = &row.error_message {
        line.push_str(&format!(" error: {message}"));
    }
    line
}

pub fn log_row(row: &JobLogEntry) -> String {
    format!(
        "{} {:<7} {:<32} {}",
        abbreviated(&row.ts),
        row.level,
        row.job_name,
        row.message
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;
    use shared::domain::{LogLevel, ResultFilter, StatusLabel};

    use super::*;

    fn ts(hour: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 7)
            .and_then(|d| d.and_hms_opt(hour, 5, 9))
            .expect("timestamp")
    }

    #[test]
    fn initial_state_has_never_refreshed() {
        let state: State<JobStatus, StatusFilters> = State::Initial;
        assert_eq!(
            summary_line("status", &state),
            "[status] initial rows=0 | Last Refresh: never | Idle"
        );
    }

    #[test]
    fn loaded_results_show_filters_and_refresh_time() {
        let state: State<JobResult, ResultFilters> = State::Loaded {
            rows: Arc::new(Vec::new()),
            options: Arc::new(vec!["All".into()]),
            filter: ResultFilters {
                job_name_prefix: "etl".into(),
                outcome: ResultFilter::Failed,
                selected_job: "All".into(),
            },
            selected_row: Some(0),
            latest_refresh: ts(16),
        };
        assert_eq!(
            summary_line("results", &state),
            "[results] loaded  rows=0 prefix='etl' result=failed job=All selected=0 \
             | Last Refresh: 3/7 @ 4:05:09 PM | Idle"
        );
    }

    #[test]
    fn error_state_shows_message() {
        let state: State<JobLogEntry, LogFilters> = State::Error {
            message: "cycle exceeded 60s".into(),
            rows: Arc::new(Vec::new()),
            options: Arc::new(Vec::new()),
            filter: LogFilters::default(),
            latest_refresh: None,
        };
        let line = summary_line("log", &state);
        assert!(line.starts_with("[log] error   rows=0 prefix='' level=any"));
        assert!(line.ends_with("| cycle exceeded 60s"));
    }

    #[test]
    fn rows_include_optional_details() {
        let status = JobStatus {
            job_name: "etl_orders".into(),
            status: StatusLabel::Failed,
            error_message: Some("disk full".into()),
            skip_reason: None,
            ts: ts(9),
        };
        let line = status_row(&status);
        assert!(line.contains("failed"));
        assert!(line.ends_with("error: disk full"));

        let entry = JobLogEntry {
            job_name: "etl_orders".into(),
            level: LogLevel::Warning,
            message: "slow".into(),
            ts: ts(9),
        };
        assert!(log_row(&entry).starts_with("3/7 @ 9:05:09 AM warning"));
    }
}
