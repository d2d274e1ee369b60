use chrono::{DateTime, Utc};
use thiserror::Error;

/// Failures of the scheduling logic itself. None of them is retryable without changing the
/// request or waiting for reservations to free up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulingError {
    #[error("No node satisfies the requested partitions {partitions:?} and GPU constraints.")]
    NoSuitableNode { partitions: Vec<String> },

    #[error("Requested runtime of {hours}h exceeds the timetable horizon of {horizon}h.")]
    JobTooLong { hours: usize, horizon: usize },

    #[error("Every window of {hours}h is already reserved on all candidate nodes.")]
    NoWindowAllocated { hours: usize },

    #[error("Invalid scheduling request: {0}")]
    InvalidRequest(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("File not found or could not be read: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    DeserializationError(#[from] serde_json::Error),

    #[error("Failed to read or write timetable CSV: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Request to time-series store failed: {0}")]
    TransportError(#[from] reqwest::Error),

    #[error("Time-series store answered with status {status}: {body}")]
    StoreResponseError { status: u16, body: String },

    #[error("Command '{command}' failed: {message}")]
    CommandError { command: String, message: String },

    #[error("Operation '{0}' timed out.")]
    Timeout(String),

    #[error("Invalid configuration: {0}")]
    ConfigurationError(String),

    #[error("Malformed timetable record: {0}")]
    MalformedRecord(String),

    #[error("Timeslot starting at {start} does not continue the timetable ending at {end}.")]
    NonContiguousTimeslot { start: DateTime<Utc>, end: DateTime<Utc> },

    #[error("No historical or forecast GCI data available for {at}.")]
    InsufficientHistory { at: DateTime<Utc> },

    #[error("Timetable task is not running: {0}")]
    ChannelClosed(String),

    #[error(transparent)]
    Scheduling(#[from] SchedulingError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

impl Error {
    /// Transport failures (store, file system, batch system) which the caller should retry
    /// instead of treating the request as infeasible.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::IoError(_)
                | Error::CsvError(_)
                | Error::TransportError(_)
                | Error::StoreResponseError { .. }
                | Error::CommandError { .. }
                | Error::Timeout(_)
        )
    }
}

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("Unknown planning strategy: {0}")]
    UnknownPlanningStrategy(String),

    #[error("Malformed generic resource token: {0}")]
    MalformedGres(String),
}

pub type Result<T> = std::result::Result<T, Error>;
