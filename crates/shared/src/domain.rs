use std::{fmt, str::FromStr};

use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::error::{ParseLogLevelError, ParseResultFilterError, ParseStatusLabelError};

/// Synthetic job-name option meaning "no job selected".
pub const ALL_JOBS: &str = "All";

macro_rules! wire_enum_display {
    ($name:ident) => {
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.pad(self.label())
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    #[default]
    Any,
    Debug,
    Error,
    Info,
    Warning,
}

impl LogLevel {
    /// Value stored in the `log_level` column, `None` for [`LogLevel::Any`].
    pub fn db_name(self) -> Option<&'static str> {
        match self {
            LogLevel::Any => None,
            LogLevel::Debug => Some("debug"),
            LogLevel::Error => Some("error"),
            LogLevel::Info => Some("info"),
            LogLevel::Warning => Some("warning"),
        }
    }

    pub fn label(self) -> &'static str {
        self.db_name().unwrap_or("any")
    }
}

impl FromStr for LogLevel {
    type Err = ParseLogLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "debug" => Ok(LogLevel::Debug),
            "error" => Ok(LogLevel::Error),
            "info" => Ok(LogLevel::Info),
            "warning" => Ok(LogLevel::Warning),
            other => Err(ParseLogLevelError(other.to_string())),
        }
    }
}

wire_enum_display!(LogLevel);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultFilter {
    #[default]
    All,
    Cancelled,
    Failed,
    Skipped,
    Successful,
}

impl ResultFilter {
    /// Value compared against the `result` column, `None` for [`ResultFilter::All`].
    pub fn db_name(self) -> Option<&'static str> {
        match self {
            ResultFilter::All => None,
            ResultFilter::Cancelled => Some("cancelled"),
            ResultFilter::Failed => Some("failed"),
            ResultFilter::Skipped => Some("skipped"),
            ResultFilter::Successful => Some("successful"),
        }
    }

    pub fn label(self) -> &'static str {
        self.db_name().unwrap_or("all")
    }
}

impl FromStr for ResultFilter {
    type Err = ParseResultFilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(ResultFilter::All),
            "cancelled" => Ok(ResultFilter::Cancelled),
            "failed" => Ok(ResultFilter::Failed),
            "skipped" => Ok(ResultFilter::Skipped),
            "successful" => Ok(ResultFilter::Successful),
            other => Err(ParseResultFilterError(other.to_string())),
        }
    }
}

wire_enum_display!(ResultFilter);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusLabel {
    Running,
    Failed,
    Successful,
    Skipped,
    Cancelled,
}

impl StatusLabel {
    pub const ALL: [StatusLabel; 5] = [
        StatusLabel::Running,
        StatusLabel::Failed,
        StatusLabel::Successful,
        StatusLabel::Skipped,
        StatusLabel::Cancelled,
    ];

    /// Rank given to labels outside the known set; shares the last bucket.
    pub const OTHER_PRIORITY: u8 = 4;

    pub fn label(self) -> &'static str {
        match self {
            StatusLabel::Running => "running",
            StatusLabel::Failed => "failed",
            StatusLabel::Successful => "successful",
            StatusLabel::Skipped => "skipped",
            StatusLabel::Cancelled => "cancelled",
        }
    }

    /// Sort rank used by the status snapshot query; lower sorts first.
    pub fn priority(self) -> u8 {
        match self {
            StatusLabel::Running => 0,
            StatusLabel::Failed => 1,
            StatusLabel::Successful => 2,
            StatusLabel::Skipped => 3,
            StatusLabel::Cancelled => Self::OTHER_PRIORITY,
        }
    }
}

impl FromStr for StatusLabel {
    type Err = ParseStatusLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(StatusLabel::Running),
            "failed" => Ok(StatusLabel::Failed),
            "successful" => Ok(StatusLabel::Successful),
            "skipped" => Ok(StatusLabel::Skipped),
            "cancelled" => Ok(StatusLabel::Cancelled),
            other => Err(ParseStatusLabelError(other.to_string())),
        }
    }
}

wire_enum_display!(StatusLabel);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    pub job_name: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub result: String,
    pub skip_reason: Option<String>,
    pub error_message: Option<String>,
}

impl JobResult {
    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatus {
    pub job_name: String,
    pub status: StatusLabel,
    pub error_message: Option<String>,
    pub skip_reason: Option<String>,
    pub ts: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobLogEntry {
    pub job_name: String,
    pub level: LogLevel,
    pub message: String,
    pub ts: NaiveDateTime,
}
