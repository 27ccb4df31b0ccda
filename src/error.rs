pub type GradientResult<T> = Result<T, GradientError>;

#[derive(thiserror::Error, Debug)]
pub enum GradientError {
    #[error("target not found: {0}")]
    TargetNotFound(String),

    #[error("malformed color: {0}")]
    MalformedColor(String),

    #[error("invalid time of day: {0}")]
    InvalidTime(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GradientError {
    pub fn target_not_found(msg: impl Into<String>) -> Self {
        Self::TargetNotFound(msg.into())
    }

    pub fn malformed_color(msg: impl Into<String>) -> Self {
        Self::MalformedColor(msg.into())
    }

    pub fn invalid_time(msg: impl Into<String>) -> Self {
        Self::InvalidTime(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
