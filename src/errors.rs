use thiserror::Error;

/// The single error currency of the crate. Every fallible public API returns
/// `Result<_, ClassifierError>`.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Invalid Input: {0}")]
    InvalidInput(String),
    #[error("Invalid Forest: {0}")]
    InvalidForest(String),
    #[error("Numeric Error: {0}")]
    NumericError(String),
    #[error("Io Error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Invalid Xml: {0}")]
    InvalidXml(String),
}

impl From<csv::Error> for ClassifierError {
    fn from(err: csv::Error) -> Self {
        if err.is_io_error() {
            match err.into_kind() {
                csv::ErrorKind::Io(io_err) => ClassifierError::IoError(io_err),
                _ => unreachable!("is_io_error() guarantees ErrorKind::Io"),
            }
        } else {
            ClassifierError::InvalidInput(err.to_string())
        }
    }
}

// Note: Do not implement a blanket From<ClassifierError> to Box<dyn Error> because
// the standard library already provides a conflicting implementation for all
// StdError types. Leave conversions explicit where needed.
