use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The step carried no usable character description.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The generation capability failed to produce an image.
    #[error("Generation error: {0}")]
    Generation(String),

    /// The artifact store failed to persist the image.
    #[error("Upload error: {0}")]
    Upload(String),

    /// Communication with the task protocol gateway failed.
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Worker error: {0}")]
    Worker(String),
}

impl Error {
    /// Failures that end a single step without stopping the worker.
    ///
    /// These are turned into one error log entry by the orchestrator; every
    /// other kind propagates to whoever drives the subscription loop.
    pub fn is_step_failure(&self) -> bool {
        matches!(
            self,
            Error::Validation(_) | Error::Generation(_) | Error::Upload(_)
        )
    }

    pub fn is_protocol(&self) -> bool {
        matches!(self, Error::Protocol(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_failure_classification() {
        assert!(Error::Validation("empty".into()).is_step_failure());
        assert!(Error::Generation("oom".into()).is_step_failure());
        assert!(Error::Upload("503".into()).is_step_failure());
        assert!(!Error::Protocol("401".into()).is_step_failure());
        assert!(!Error::Config("missing key".into()).is_step_failure());
        assert!(Error::Protocol("timeout".into()).is_protocol());
    }

    #[test]
    fn test_display_keeps_kind_prefix() {
        let err = Error::Generation("CUDA out of memory".to_string());
        assert_eq!(err.to_string(), "Generation error: CUDA out of memory");
    }
}
