use thiserror::Error;

/// Failure kinds raised by the projection pipeline.
///
/// `EmptyData` and `Configuration` are caused by the request or its dataset and are
/// reported to the caller as client faults. `UnexpectedComputation` is an internal
/// fault.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FireError {
    #[error("empty data: {0}")]
    EmptyData(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("unexpected computation error: {0}")]
    UnexpectedComputation(String),
}

impl FireError {
    pub fn is_client_fault(&self) -> bool {
        matches!(self, FireError::EmptyData(_) | FireError::Configuration(_))
    }
}

pub type FireResult<T> = Result<T, FireError>;
