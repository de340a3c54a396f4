use chrono::NaiveDate;
use thiserror::Error;

pub use anyhow::Context;

pub type Result<T> = std::result::Result<T, HistoryError>;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("invalid date range: from {from} is after to {to}")]
    InvalidRange { from: NaiveDate, to: NaiveDate },
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("remote fetch failed: {0}")]
    RemoteFetch(String),
    #[error("missing optional dependency `{dependency}`: {hint}")]
    MissingOptionalDependency {
        dependency: &'static str,
        hint: &'static str,
    },
    #[error("record is missing field `{0}`")]
    MissingField(String),
    #[error("cannot convert `{value}` in column `{column}`")]
    InvalidValue { column: String, value: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Chrono(#[from] chrono::ParseError),
    #[cfg(feature = "dataframe")]
    #[error(transparent)]
    Polars(#[from] polars::error::PolarsError),
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HistoryError {
    pub fn message<T: Into<String>>(msg: T) -> Self {
        HistoryError::Message(msg.into())
    }

    pub fn invalid_parameter<T: Into<String>>(msg: T) -> Self {
        HistoryError::InvalidParameter(msg.into())
    }

    pub fn remote<T: Into<String>>(msg: T) -> Self {
        HistoryError::RemoteFetch(msg.into())
    }
}
