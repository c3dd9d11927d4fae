pub mod fetcher;
pub mod open_meteo;

pub use fetcher::RetryingFetchClient;
pub use open_meteo::OpenMeteoClient;

use async_trait::async_trait;
use common::config::Location;
use std::fmt;

use crate::models::FetchSuccess;

/// Classification of a failed fetch attempt. Only `Timeout`, `Connect` and
/// `Io` are worth a retry; everything else fails the location immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    Timeout,
    Connect,
    Io,
    Status,
    Api,
    Malformed,
}

#[derive(Debug, Clone)]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FetchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Timeout, message)
    }

    pub fn connect(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Connect, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Io, message)
    }

    pub fn status(code: u16) -> Self {
        Self::new(FetchErrorKind::Status, format!("HTTP status {}", code))
    }

    pub fn api(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Api, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Malformed, message)
    }

    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind,
            FetchErrorKind::Timeout | FetchErrorKind::Connect | FetchErrorKind::Io
        )
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for FetchError {}

/// Capability contract for an upstream forecast provider. Alternate weather
/// APIs are additional implementations of this trait.
#[async_trait]
pub trait ForecastSource: Send + Sync {
    async fn fetch_for_location(
        &self,
        location: &Location,
    ) -> std::result::Result<FetchSuccess, FetchError>;
}
