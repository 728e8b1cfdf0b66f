use thiserror::Error;

#[derive(Debug, Error)]
pub enum RobustError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("missing column: {0}")]
    MissingColumn(String),
}

pub type Result<T> = std::result::Result<T, RobustError>;
