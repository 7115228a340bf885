//! Unified error handling system
//!
//! Provides structured error types with context, recovery suggestions, and proper error chaining

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

pub type RelayDeskResult<T> = Result<T, RelayDeskError>;

/// Status code the gateway uses to reject a credential
pub const STATUS_UNAUTHORIZED: u16 = 401;

/// Error context providing additional information for debugging and recovery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Timestamp when error occurred
    pub timestamp: DateTime<Utc>,
    /// Component where error originated
    pub component: String,
    /// Operation being performed when error occurred
    pub operation: Option<String>,
    /// Additional metadata
    pub metadata: std::collections::HashMap<String, String>,
    /// Recovery suggestions
    pub recovery_suggestions: Vec<String>,
}

impl ErrorContext {
    pub fn new(component: &str) -> Self {
        Self {
            error_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            component: component.to_string(),
            operation: None,
            metadata: std::collections::HashMap::new(),
            recovery_suggestions: Vec::new(),
        }
    }

    pub fn with_operation(mut self, operation: &str) -> Self {
        self.operation = Some(operation.to_string());
        self
    }

    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.recovery_suggestions.push(suggestion.to_string());
        self
    }
}

/// Main error type for RelayDesk
#[derive(Error, Debug)]
pub enum RelayDeskError {
    /// The gateway answered, but with an error status or a non-zero envelope code
    #[error("HTTP {status}: {message}")]
    Http {
        status: u16,
        message: String,
        context: ErrorContext,
    },

    /// The request never produced a response
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Authentication error: {message}")]
    Authentication {
        message: String,
        context: ErrorContext,
    },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
        context: ErrorContext,
    },

    #[error("Resource not found: {resource}")]
    NotFound {
        resource: String,
        context: ErrorContext,
    },

    #[error("Storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Operation timeout: {operation}")]
    Timeout {
        operation: String,
        duration_ms: u64,
        context: ErrorContext,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },
}

impl RelayDeskError {
    /// Build an HTTP status error
    pub fn http(status: u16, message: impl Into<String>, component: &str) -> Self {
        RelayDeskError::Http {
            status,
            message: message.into(),
            context: ErrorContext::new(component)
                .with_metadata("status", &status.to_string())
                .with_suggestion(match status {
                    401 => "Log in again; the access token was rejected",
                    403 => "The current account lacks permission for this action",
                    404 => "The requested resource does not exist",
                    _ => "Check network connectivity and gateway status",
                }),
        }
    }

    /// Get the error context
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            RelayDeskError::Http { context, .. } => Some(context),
            RelayDeskError::Network { context, .. } => Some(context),
            RelayDeskError::Authentication { context, .. } => Some(context),
            RelayDeskError::Validation { context, .. } => Some(context),
            RelayDeskError::NotFound { context, .. } => Some(context),
            RelayDeskError::Storage { context, .. } => Some(context),
            RelayDeskError::Config { context, .. } => Some(context),
            RelayDeskError::Timeout { context, .. } => Some(context),
            RelayDeskError::Internal { context, .. } => Some(context),
            RelayDeskError::Io(_) | RelayDeskError::Serialization(_) => None,
        }
    }

    /// HTTP status carried by the error, if the gateway produced one
    pub fn status_code(&self) -> Option<u16> {
        match self {
            RelayDeskError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when the gateway rejected the presented credential
    pub fn is_credential_rejected(&self) -> bool {
        self.status_code() == Some(STATUS_UNAUTHORIZED)
    }

    /// Check if error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            RelayDeskError::Network { .. } => true,
            RelayDeskError::Timeout { .. } => true,
            RelayDeskError::Http { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Log the error with appropriate level
    pub fn log(&self) {
        let error_id = self.context().map(|c| c.error_id.as_str());
        match self {
            RelayDeskError::Internal { .. } => {
                error!(error_id = ?error_id, error = %self, "Internal error occurred");
            }
            RelayDeskError::Config { .. } | RelayDeskError::Validation { .. } => {
                error!(
                    error_id = ?error_id,
                    error = %self,
                    "Configuration or validation error"
                );
            }
            RelayDeskError::Network { .. } | RelayDeskError::Timeout { .. } => {
                warn!(
                    error_id = ?error_id,
                    error = %self,
                    "Network or timeout error (may be recoverable)"
                );
            }
            _ => {
                error!(error_id = ?error_id, error = %self, "Error occurred");
            }
        }
    }
}

/// Convenience macros for creating errors with context
#[macro_export]
macro_rules! storage_error {
    ($msg:expr, $component:expr) => {
        $crate::RelayDeskError::Storage {
            message: $msg.to_string(),
            source: None,
            context: $crate::ErrorContext::new($component),
        }
    };
    ($msg:expr, $component:expr, $source:expr) => {
        $crate::RelayDeskError::Storage {
            message: $msg.to_string(),
            source: Some(Box::new($source)),
            context: $crate::ErrorContext::new($component),
        }
    };
}

#[macro_export]
macro_rules! config_error {
    ($msg:expr, $component:expr) => {
        $crate::RelayDeskError::Config {
            message: $msg.to_string(),
            source: None,
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Check your configuration file")
                .with_suggestion("Run 'relaydesk config --init' to create default config"),
        }
    };
}

#[macro_export]
macro_rules! validation_error {
    ($msg:expr, $field:expr, $component:expr) => {
        $crate::RelayDeskError::Validation {
            message: $msg.to_string(),
            field: Some($field.to_string()),
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Check the field value and format"),
        }
    };
}

#[macro_export]
macro_rules! not_found_error {
    ($resource:expr, $component:expr) => {
        $crate::RelayDeskError::NotFound {
            resource: $resource.to_string(),
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Verify the resource identifier"),
        }
    };
}

#[macro_export]
macro_rules! auth_error {
    ($msg:expr, $component:expr) => {
        $crate::RelayDeskError::Authentication {
            message: $msg.to_string(),
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Run 'relaydesk login' to start a session"),
        }
    };
}
