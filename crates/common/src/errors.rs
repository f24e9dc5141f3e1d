use thiserror::Error;

#[derive(Error, Debug)]
pub enum StatsError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("failed to load tokenizer: {0}")]
    Tokenizer(String),

    #[error("invalid configuration at `{path}`: {reason}")]
    Config { path: String, reason: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl StatsError {
    pub fn invalid_argument(why: impl Into<String>) -> Self {
        StatsError::InvalidArgument(why.into())
    }
}

pub type Result<T> = std::result::Result<T, StatsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_argument_message() {
        let err = StatsError::invalid_argument("pairs must be an array");
        assert_eq!(err.to_string(), "invalid argument: pairs must be an array");
    }

    #[test]
    fn test_config_error_message() {
        let err = StatsError::Config {
            path: "./stats.yaml".to_string(),
            reason: "medium must be below high".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid configuration at `./stats.yaml`: medium must be below high"
        );
    }
}
