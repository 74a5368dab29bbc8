use std::{collections::BTreeSet, iter, sync::Arc};

use chrono::NaiveDateTime;
use shared::domain::ALL_JOBS;

/// What a domain's dashboard tab shows.
///
/// `Loading` and `Error` keep the rows and options of the last successful
/// fetch so a refresh or a failure never blanks the list.
#[derive(Debug, Clone, PartialEq)]
pub enum State<R, F> {
    Initial,
    Loading {
        rows: Arc<Vec<R>>,
        options: Arc<Vec<String>>,
        filter: F,
        latest_refresh: Option<NaiveDateTime>,
    },
    Loaded {
        rows: Arc<Vec<R>>,
        options: Arc<Vec<String>>,
        filter: F,
        selected_row: Option<usize>,
        latest_refresh: NaiveDateTime,
    },
    Error {
        message: String,
        rows: Arc<Vec<R>>,
        options: Arc<Vec<String>>,
        filter: F,
        latest_refresh: Option<NaiveDateTime>,
    },
}

impl<R, F> Default for State<R, F> {
    fn default() -> Self {
        State::Initial
    }
}

impl<R, F> State<R, F> {
    pub fn kind(&self) -> &'static str {
        match self {
            State::Initial => "initial",
            State::Loading { .. } => "loading",
            State::Loaded { .. } => "loaded",
            State::Error { .. } => "error",
        }
    }

    /// Short status line for the tab footer.
    pub fn status(&self) -> &str {
        match self {
            State::Initial | State::Loaded { .. } => "Idle",
            State::Loading { .. } => "Refreshing...",
            State::Error { message, .. } => message,
        }
    }

    pub fn rows(&self) -> &[R] {
        match self {
            State::Initial => &[],
            State::Loading { rows, .. } | State::Loaded { rows, .. } | State::Error { rows, .. } => {
                rows.as_slice()
            }
        }
    }

    pub fn options(&self) -> &[String] {
        match self {
            State::Initial => &[],
            State::Loading { options, .. }
            | State::Loaded { options, .. }
            | State::Error { options, .. } => options.as_slice(),
        }
    }

    pub fn filter(&self) -> Option<&F> {
        match self {
            State::Initial => None,
            State::Loading { filter, .. }
            | State::Loaded { filter, .. }
            | State::Error { filter, .. } => Some(filter),
        }
    }

    pub fn latest_refresh(&self) -> Option<NaiveDateTime> {
        match self {
            State::Initial => None,
            State::Loaded { latest_refresh, .. } => Some(*latest_refresh),
            State::Loading { latest_refresh, .. } | State::Error { latest_refresh, .. } => {
                *latest_refresh
            }
        }
    }

    pub fn selected_row(&self) -> Option<usize> {
        match self {
            State::Loaded { selected_row, .. } => *selected_row,
            _ => None,
        }
    }
}

/// Engine-level view of a domain event.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent<F> {
    Refresh,
    FilterChanged(F),
    SelectRow(usize),
    ReportError(String),
}

/// `All` followed by the distinct job names in lexicographic order.
pub fn job_name_options<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let distinct: BTreeSet<&str> = names
        .into_iter()
        .filter(|name| *name != ALL_JOBS)
        .collect();
    iter::once(ALL_JOBS)
        .chain(distinct)
        .map(str::to_string)
        .collect()
}
