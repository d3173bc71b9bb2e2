//! Error types for the Cloud Eye provider.

use thiserror::Error;

use crate::schema::Diagnostic;

/// Errors that can occur while validating, building or applying a resource.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested resource was not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// A field violated its declared pattern, range or enumeration.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The attribute tree could not be reshaped into a request payload.
    #[error("Build error: {0}")]
    Build(String),

    /// A configuration error occurred, including failure to construct a client.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An HTTP transport error occurred.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The remote rejected the request because of a conflicting state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Permission denied (authentication/authorization failure).
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Quota or rate limit exceeded.
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Service temporarily unavailable.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Operation timed out.
    #[error("Deadline exceeded: {0}")]
    DeadlineExceeded(String),

    /// The remote rejected the request as malformed.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Any other non-success response from the remote.
    #[error("Unexpected response {status}: {message}")]
    Remote {
        /// HTTP status code returned by the remote.
        status: u16,
        /// Error message extracted from the response body.
        message: String,
    },

    /// An error wrapped with the resource kind and operation it occurred in.
    #[error("{context}: {source}")]
    Operation {
        /// Human-readable operation context, e.g. `Error creating CES-AlarmRule`.
        context: String,
        /// The underlying error.
        #[source]
        source: Box<ProviderError>,
    },
}

impl ProviderError {
    /// Get the error message as a string.
    ///
    /// Returns a reference to the error message for any variant. Wrapped
    /// errors report the message of the innermost error.
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(msg) => msg,
            Self::Validation(msg) => msg,
            Self::Build(msg) => msg,
            Self::Configuration(msg) => msg,
            Self::UnknownResource(msg) => msg,
            Self::Serialization(_err) => "serialization error (see Debug output)",
            Self::Transport(_err) => "transport error (see Debug output)",
            Self::Conflict(msg) => msg,
            Self::PermissionDenied(msg) => msg,
            Self::ResourceExhausted(msg) => msg,
            Self::Unavailable(msg) => msg,
            Self::DeadlineExceeded(msg) => msg,
            Self::InvalidRequest(msg) => msg,
            Self::Remote { message, .. } => message,
            Self::Operation { source, .. } => source.message(),
        }
    }

    /// Wrap this error with operation context.
    ///
    /// # Examples
    ///
    /// ```
    /// use ces_provider::ProviderError;
    ///
    /// let err = ProviderError::NotFound("al123".to_string())
    ///     .with_context("Error deleting CES-AlarmRule al123");
    /// assert_eq!(
    ///     err.to_string(),
    ///     "Error deleting CES-AlarmRule al123: Resource not found: al123"
    /// );
    /// assert!(err.is_not_found());
    /// ```
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::Operation {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, looking through any context wrappers.
    pub fn root(&self) -> &ProviderError {
        match self {
            Self::Operation { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether the remote reported that the entity does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), Self::NotFound(_))
    }

    /// Whether the error is transient and the operation may be re-attempted.
    ///
    /// Rate limits, transient server faults and transport timeouts are
    /// retryable. Bad requests, not-found, conflicts and everything raised
    /// locally are not.
    pub fn is_retryable(&self) -> bool {
        match self.root() {
            Self::ResourceExhausted(_) | Self::Unavailable(_) => true,
            Self::Transport(err) => err.is_timeout() || err.is_connect(),
            _ => false,
        }
    }

    /// Whether a retry loop gave up because its deadline passed.
    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self.root(), Self::DeadlineExceeded(_))
    }
}

impl From<ProviderError> for Diagnostic {
    fn from(err: ProviderError) -> Self {
        let detail = match err.root() {
            ProviderError::Serialization(inner) => Some(inner.to_string()),
            ProviderError::Transport(inner) => Some(inner.to_string()),
            _ => None,
        };
        let diagnostic = Diagnostic::error(err.to_string());
        match detail {
            Some(detail) => diagnostic.with_detail(detail),
            None => diagnostic,
        }
    }
}
