//! Centralized Error Handling Module
//!
//! Every failure carries a unique error code so logs can be filtered and
//! monitored by code rather than by message text.
//!
//! Error codes follow pattern: CATEGORY_SPECIFIC_ERROR
//! - INPUT_xxx: Reading validation errors (the only classifier errors)
//! - MAIL_xxx: Report delivery errors
//! - API_xxx: API errors
//! - CFG_xxx: Configuration errors

use std::fmt;

/// Application-wide error type
#[derive(Debug)]
pub struct AppError {
    /// Unique error code for logging/monitoring
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Optional underlying error
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new AppError
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create AppError with source error
    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Get error code as string (for logging)
    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Unique error codes for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // ============================================
    // Input Errors (1xx)
    // ============================================
    /// Reading is NaN or infinite
    InputInvalidReading,
    /// Required reading field missing
    InputMissingField,

    // ============================================
    // Mail Errors (2xx)
    // ============================================
    /// Mail relay unreachable or timed out
    MailTransportFailed,
    /// Mail relay answered with a non-success status
    MailRelayRejected,

    // ============================================
    // API Errors (3xx)
    // ============================================
    /// Invalid request format
    ApiBadRequest,
    /// Rate limit exceeded
    ApiRateLimited,
    /// Resource not found
    ApiNotFound,
    /// No reading has been stored yet
    StoreEmpty,

    // ============================================
    // Configuration Errors (4xx)
    // ============================================
    /// Invalid configuration value
    ConfigInvalidValue,
    /// No report recipient given or configured
    ConfigMissingRecipient,
}

impl ErrorCode {
    /// Get string representation of error code
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InputInvalidReading => "INPUT_INVALID_READING",
            Self::InputMissingField => "INPUT_MISSING_FIELD",

            Self::MailTransportFailed => "MAIL_TRANSPORT_FAILED",
            Self::MailRelayRejected => "MAIL_RELAY_REJECTED",

            Self::ApiBadRequest => "API_BAD_REQUEST",
            Self::ApiRateLimited => "API_RATE_LIMITED",
            Self::ApiNotFound => "API_NOT_FOUND",
            Self::StoreEmpty => "NO_DATA",

            Self::ConfigInvalidValue => "CFG_INVALID_VALUE",
            Self::ConfigMissingRecipient => "CFG_MISSING_RECIPIENT",
        }
    }

    /// Get HTTP status code for API responses
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InputInvalidReading
            | Self::InputMissingField
            | Self::ApiBadRequest
            | Self::ConfigMissingRecipient => 400,
            Self::ApiNotFound | Self::StoreEmpty => 404,
            Self::ApiRateLimited => 429,
            Self::MailTransportFailed | Self::MailRelayRejected => 502,
            Self::ConfigInvalidValue => 500,
        }
    }
}

// ============================================
// Convenience constructors
// ============================================

impl AppError {
    /// Non-finite reading value
    pub fn invalid_reading(field: &str, value: f64) -> Self {
        Self::new(
            ErrorCode::InputInvalidReading,
            format!("{} must be a finite number, got {}", field, value),
        )
    }

    /// Required field missing
    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::InputMissingField,
            format!("Missing required field: {}", field),
        )
    }

    /// Mail transport failure
    pub fn mail_transport(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::MailTransportFailed, msg)
    }

    /// Mail relay rejected the message
    pub fn mail_rejected(status: u16, body: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::MailRelayRejected,
            format!("Mail relay returned HTTP {}: {}", status, body.into()),
        )
    }

    /// No recipient available for a report
    pub fn missing_recipient() -> Self {
        Self::new(
            ErrorCode::ConfigMissingRecipient,
            "No report recipient given and REPORT_TO is not set",
        )
    }

    /// Invalid configuration value
    pub fn invalid_config(key: &str, value: &str) -> Self {
        Self::new(
            ErrorCode::ConfigInvalidValue,
            format!("Invalid value for {}: {:?}", key, value),
        )
    }

    /// Store has no data yet
    pub fn no_data() -> Self {
        Self::new(ErrorCode::StoreEmpty, "No data yet")
    }

    /// API bad request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ApiBadRequest, msg)
    }

    /// API not found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ApiNotFound, msg)
    }
}

// ============================================
// Result type alias
// ============================================

/// Application Result type
pub type AppResult<T> = Result<T, AppError>;

// ============================================
// Conversion from common error types
// ============================================

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::new(ErrorCode::MailTransportFailed, "Mail relay request timeout")
        } else if err.is_connect() {
            Self::new(ErrorCode::MailTransportFailed, "Mail relay connection failed")
        } else {
            Self::with_source(ErrorCode::MailTransportFailed, err.to_string(), err)
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(ErrorCode::ApiBadRequest, "JSON parse error", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = AppError::invalid_reading("ph", f64::NAN);
        assert_eq!(err.code, ErrorCode::InputInvalidReading);
        assert_eq!(err.code_str(), "INPUT_INVALID_READING");
        assert!(err.to_string().contains("ph must be a finite number"));
    }

    #[test]
    fn test_http_status() {
        assert_eq!(ErrorCode::InputInvalidReading.http_status(), 400);
        assert_eq!(ErrorCode::StoreEmpty.http_status(), 404);
        assert_eq!(ErrorCode::ApiRateLimited.http_status(), 429);
        assert_eq!(ErrorCode::MailTransportFailed.http_status(), 502);
        assert_eq!(ErrorCode::ConfigInvalidValue.http_status(), 500);
    }
}
