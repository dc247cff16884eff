use std::fmt;

/// Application-wide error types with categories for better error handling
#[derive(Debug, Clone)]
pub enum AppError {
    /// Settings/history storage errors (serialization, write failures)
    Storage(String),

    /// Network errors (inference endpoint unreachable, timeout, HTTP status)
    Network(String),

    /// Provider errors (malformed or unexpected remote model response)
    Provider(String),

    /// Speech synthesis errors (TTS binary missing, synthesis failed)
    Narration(String),

    /// Generic errors that don't fit other categories
    Other(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Storage(msg) => write!(f, "Storage Error: {}", msg),
            AppError::Network(msg) => write!(f, "Network Error: {}", msg),
            AppError::Provider(msg) => write!(f, "Provider Error: {}", msg),
            AppError::Narration(msg) => write!(f, "Narration Error: {}", msg),
            AppError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    /// Returns a user-friendly title for the error
    pub fn title(&self) -> &str {
        match self {
            AppError::Storage(_) => "Storage Error",
            AppError::Network(_) => "Network Problem",
            AppError::Provider(_) => "Model Response Problem",
            AppError::Narration(_) => "Narration Failed",
            AppError::Other(_) => "Error",
        }
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        match self {
            AppError::Storage(msg)
            | AppError::Network(msg)
            | AppError::Provider(msg)
            | AppError::Narration(msg)
            | AppError::Other(msg) => msg,
        }
    }

    /// Returns whether this error is recoverable (can be retried)
    pub fn is_recoverable(&self) -> bool {
        match self {
            AppError::Storage(_) => true,    // Might be transient disk issue
            AppError::Network(_) => true,    // Network might recover
            AppError::Provider(_) => true,   // Remote model might behave next time
            AppError::Narration(_) => false, // Missing TTS binary needs manual fix
            AppError::Other(_) => false,     // Unknown errors, don't retry
        }
    }
}

/// Convert from String to AppError::Other
impl From<String> for AppError {
    fn from(error: String) -> Self {
        AppError::Other(error)
    }
}

/// Convert from &str to AppError::Other
impl From<&str> for AppError {
    fn from(error: &str) -> Self {
        AppError::Other(error.to_string())
    }
}
