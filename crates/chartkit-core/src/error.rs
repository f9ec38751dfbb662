use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("invalid time range: {from} is after {to}")]
    InvalidRange {
        from: chrono::DateTime<chrono::Utc>,
        to: chrono::DateTime<chrono::Utc>,
    },

    #[error("chart surface error: {0}")]
    Surface(String),
}
