use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unrecognized log level: '{0}'; expected either 'debug', 'error', 'info', or 'warning'.")]
pub struct ParseLogLevelError(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unrecognized result: '{0}'; expected either 'all', 'cancelled', 'failed', 'skipped', or 'successful'.")]
pub struct ParseResultFilterError(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unrecognized job status: '{0}'; expected either 'running', 'failed', 'successful', 'skipped', or 'cancelled'.")]
pub struct ParseStatusLabelError(pub String);
