#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("safe withdrawal rate must be > 0, got {swr}")]
    NonPositiveSwr { swr: f64 },

    #[error("{field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

impl ConfigurationError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigurationError::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}
