use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PropagatorError {
    #[error("expected {expected} seconds-per-iteration values, got {actual}")]
    InvalidInput { expected: usize, actual: usize },
}
