use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("broker request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("broker responded with status {status}: {body}")]
    UnexpectedStatus {
        status: reqwest::StatusCode,
        body: String,
    },
}
