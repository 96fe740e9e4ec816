//! Error taxonomy shared by the weather client and the app shell.
//!
//! Every failure ends up as a single human-readable message in the
//! operation-error slot; [`ErrorKind`] keeps enough structure around it for
//! logging and for deciding whether inputs stay disabled.

use std::fmt;

use thiserror::Error;

/// Coarse classification of everything that can go wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No credential configured.
    Configuration,
    /// Credential rejected by the API (HTTP 401).
    Authentication,
    /// Query resolved to no location (HTTP 404).
    NotFound,
    /// No network path at call time.
    Connectivity,
    /// Any other non-2xx status.
    Upstream,
    /// 2xx response whose body did not match the expected schema.
    MalformedPayload,
    /// Local input rejected before any network call.
    Validation,
    Unexpected,
}

/// Which API call an upstream failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CredentialCheck,
    FetchWeather,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::CredentialCheck => f.write_str("API key validation"),
            Operation::FetchWeather => f.write_str("Fetching weather data"),
        }
    }
}

/// Failures of the OpenWeather client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(
        "OpenWeather API key is not set. Please set OPENWEATHER_API_KEY or run `skylook configure`."
    )]
    MissingCredential,

    #[error("Invalid API key. Please check your OpenWeather API key")]
    InvalidCredential,

    #[error("Location not found. Please try again.")]
    LocationNotFound,

    #[error("Network error: Please check your internet connection")]
    Network(#[source] reqwest::Error),

    #[error("{operation} failed ({status}): {detail}")]
    Upstream {
        operation: Operation,
        status: u16,
        detail: String,
    },

    #[error("Malformed weather data: {0}")]
    MalformedPayload(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingCredential => ErrorKind::Configuration,
            Self::InvalidCredential => ErrorKind::Authentication,
            Self::LocationNotFound => ErrorKind::NotFound,
            Self::Network(_) => ErrorKind::Connectivity,
            Self::Upstream { .. } => ErrorKind::Upstream,
            Self::MalformedPayload(_) => ErrorKind::MalformedPayload,
            Self::Unexpected(_) => ErrorKind::Unexpected,
        }
    }

    /// Classify a transport-level reqwest failure.
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            Self::Network(err)
        } else {
            Self::Unexpected(err.to_string())
        }
    }
}

/// Input rejected locally, before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("Please enter a city name")]
    EmptyCity,

    #[error("API key is not validated. Please check your OpenWeather API key")]
    CredentialPending,
}

impl InputError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}
