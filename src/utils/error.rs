use thiserror::Error;

#[derive(Error, Debug)]
pub enum NormalizerError {
    #[error("Exchange rate fetch failed: {message}")]
    RateFetch { message: String },

    #[error("Missing or zero exchange rate for reference currency {currency}")]
    MissingReferenceRate { currency: String },

    #[error("Invalid price '{value}': {reason}")]
    InvalidPrice { value: String, reason: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("File is not valid UTF-8: {message}")]
    InvalidEncoding { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Object storage error: {message}")]
    Storage { message: String },

    #[error("Key-value store error: {message}")]
    ItemStore { message: String },

    #[error("Archive error: {message}")]
    Archive { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

/// 錯誤影響的範圍：從單一資料列到整次呼叫
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorScope {
    Row,
    Item,
    File,
    Invocation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl NormalizerError {
    pub fn scope(&self) -> ErrorScope {
        match self {
            Self::RateFetch { .. } | Self::MissingReferenceRate { .. } => ErrorScope::Invocation,
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. } => ErrorScope::Invocation,
            Self::InvalidPrice { .. } => ErrorScope::Row,
            Self::ItemStore { .. } => ErrorScope::Item,
            Self::Http(_)
            | Self::Csv(_)
            | Self::InvalidEncoding { .. }
            | Self::Io(_)
            | Self::Serialization(_)
            | Self::Storage { .. }
            | Self::Archive { .. } => ErrorScope::File,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.scope() {
            ErrorScope::Row | ErrorScope::Item => ErrorSeverity::Low,
            ErrorScope::File => ErrorSeverity::Medium,
            ErrorScope::Invocation => match self {
                Self::RateFetch { .. } => ErrorSeverity::High,
                _ => ErrorSeverity::Critical,
            },
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::RateFetch { .. } | Self::Http(_) => {
                format!("Could not load exchange rates, nothing was processed ({})", self)
            }
            Self::MissingReferenceRate { currency } => format!(
                "The rate feed did not report a usable {} rate, nothing was processed",
                currency
            ),
            Self::MissingConfigError { field } => {
                format!("Required setting '{}' is not configured", field)
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::RateFetch { .. } | Self::Http(_) => {
                "Check the rate feed endpoint, the access key and network connectivity"
            }
            Self::MissingReferenceRate { .. } => {
                "Make sure the rate feed plan includes the reference currency"
            }
            Self::InvalidPrice { .. } => "Fix the price column of the reported row",
            Self::Csv(_) | Self::InvalidEncoding { .. } => {
                "Re-export the file as UTF-8 comma-separated text with a header row"
            }
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. } => "Review the configuration and environment variables",
            _ => "Check the logs for the affected file and retry it",
        }
    }
}

pub type Result<T> = std::result::Result<T, NormalizerError>;
