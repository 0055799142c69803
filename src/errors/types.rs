//! Error types for the TickTick command-line client
//!
//! Every failure the CLI can report is one variant of [`AppError`]. Variants are
//! grouped by where the failure is detected: local input validation, date
//! parsing and identifier resolution happen before any network call, while the
//! SDK group covers everything surfaced by the API client.

use std::path::PathBuf;
use thiserror::Error;

/// Boxed source error carried by several variants.
pub type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    // Local input errors, never reach the network
    #[error("{message}")]
    Validation { message: String },

    #[error("Invalid date '{input}': {reason}")]
    DateParse { input: String, reason: String },

    #[error("Could not resolve {target}: {message}")]
    Resolution {
        target: String,
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("Missing configuration: {}", missing.join(", "))]
    MissingCredentials { missing: Vec<String> },

    // SDK / network errors
    #[error("HTTP request failed: {method} {url}")]
    HttpRequest {
        method: String,
        url: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("Network timeout after {timeout_secs} seconds")]
    NetworkTimeout { timeout_secs: u64 },

    #[error("API error (HTTP {status_code}): {reason}")]
    HttpStatus { status_code: u16, reason: String },

    #[error("Unexpected API response: {context}")]
    ApiResponse { context: String },

    // I/O and serialization
    #[error("File I/O error for '{path}': {operation}")]
    Io {
        path: PathBuf,
        operation: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("JSON error: {context}")]
    Json {
        context: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("TOML parsing error: {context}")]
    TomlParsing {
        context: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("Interactive prompt failed: {message}")]
    Prompt { message: String },
}

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn date_parse(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DateParse {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn resolution(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Resolution {
            target: target.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Wrap a failure raised while fetching a fallback identifier
    pub fn resolution_with_source(target: impl Into<String>, source: AppError) -> Self {
        Self::Resolution {
            target: target.into(),
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn missing_credentials<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::MissingCredentials {
            missing: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn api_response(context: impl Into<String>) -> Self {
        Self::ApiResponse {
            context: context.into(),
        }
    }

    pub fn io_with_source(
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Io {
            path: path.into(),
            operation: operation.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn json_with_source(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Json {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Whether the failure was detected locally, before any network call
    pub fn is_local(&self) -> bool {
        matches!(
            self.category(),
            "validation" | "date" | "config" | "io" | "serialization"
        )
    }

    /// Get the error category for logging and JSON error reports
    pub fn category(&self) -> &'static str {
        match self {
            Self::Validation { .. } | Self::Prompt { .. } => "validation",
            Self::DateParse { .. } => "date",
            Self::Resolution { .. } => "resolution",
            Self::Config { .. } | Self::MissingCredentials { .. } => "config",
            Self::HttpRequest { .. }
            | Self::NetworkTimeout { .. }
            | Self::HttpStatus { .. }
            | Self::ApiResponse { .. } => "sdk",
            Self::Io { .. } => "io",
            Self::Json { .. } | Self::TomlParsing { .. } => "serialization",
        }
    }

    /// Process exit code reported for this failure
    pub fn exit_code(&self) -> u8 {
        if self.is_local() {
            2
        } else {
            1
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        let operation = match err.kind() {
            std::io::ErrorKind::NotFound => "file not found",
            std::io::ErrorKind::PermissionDenied => "permission denied",
            std::io::ErrorKind::TimedOut => "timeout",
            _ => "I/O operation",
        }
        .to_string();

        Self::Io {
            path: PathBuf::from("unknown"),
            operation,
            source: Some(Box::new(err)),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        let context = if err.is_syntax() {
            format!("syntax error at line {} column {}", err.line(), err.column())
        } else if err.is_data() {
            format!("unexpected data: {err}")
        } else if err.is_eof() {
            "unexpected end of input".to_string()
        } else {
            "serialization failed".to_string()
        };
        Self::Json {
            context,
            source: Some(Box::new(err)),
        }
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::TomlParsing {
            context: err.message().to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        let url = err
            .url()
            .map(|u| u.path().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        if err.is_timeout() {
            Self::NetworkTimeout { timeout_secs: 0 }
        } else if let Some(status) = err.status() {
            Self::HttpStatus {
                status_code: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("unknown").to_string(),
            }
        } else if err.is_decode() {
            Self::ApiResponse {
                context: format!("could not decode response from {url}"),
            }
        } else {
            Self::HttpRequest {
                method: "UNKNOWN".to_string(),
                url,
                source: Some(Box::new(err)),
            }
        }
    }
}

impl From<url::ParseError> for AppError {
    fn from(err: url::ParseError) -> Self {
        Self::Config {
            message: format!("invalid API URL: {err}"),
            source: Some(Box::new(err)),
        }
    }
}

impl From<dialoguer::Error> for AppError {
    fn from(err: dialoguer::Error) -> Self {
        Self::Prompt {
            message: err.to_string(),
        }
    }
}
