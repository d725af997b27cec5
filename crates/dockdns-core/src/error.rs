//! Error types for the dockdns controller
//!
//! Every fallible operation in the workspace returns [`Result`]. Configuration
//! errors are fatal at startup; everything else aborts the current cycle and is
//! retried on the next tick.

use thiserror::Error;

/// Result type alias for dockdns operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the dockdns controller
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid settings
    #[error("Configuration error: {0}")]
    Config(String),

    /// The desired-state source could not produce a hostname list
    #[error("Desired state error: {0}")]
    DesiredState(String),

    /// Public IP discovery failed
    #[error("IP source error: {0}")]
    IpSource(String),

    /// Provider-specific failure
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    Http(String),

    /// Credentials rejected by the provider
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Provider rate limit hit
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Zone or record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// A value the provider cannot publish
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a desired-state error
    pub fn desired_state(msg: impl Into<String>) -> Self {
        Self::DesiredState(msg.into())
    }

    /// Create an IP source error
    pub fn ip_source(msg: impl Into<String>) -> Self {
        Self::IpSource(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// True for errors that must stop the process before the first cycle
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}
