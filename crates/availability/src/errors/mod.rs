//! Error types and failure classification for the availability engine.
//!
//! This module provides:
//! - [`AvailabilityError`]: The main error enum for all engine operations
//! - [`FailureKind`]: Classification of provider-scoped failures

mod failure_kind;

pub use failure_kind::FailureKind;

use std::time::Duration;

use chrono::NaiveDate;
use thiserror::Error;

/// Errors that can occur while serving availability.
///
/// The type is `Clone` because a single in-flight fetch hands the same
/// result to every caller waiting on it.
///
/// Variants fall into two groups. Provider-scoped errors (see
/// [`failure_kind`](Self::failure_kind)) are recovered into a failed outcome
/// for that one provider. Request-scoped errors reject the whole request
/// before any provider is consulted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AvailabilityError {
    /// The upstream source answered with something we could not use.
    #[error("Provider error: {provider} - {message}")]
    ProviderError {
        /// The provider that failed
        provider: String,
        /// Summary of what went wrong
        message: String,
    },

    /// The provider did not answer within its fetch timeout.
    #[error("Timeout: {provider} did not respond within {after:?}")]
    Timeout {
        /// The provider that timed out
        provider: String,
        /// The timeout that elapsed
        after: Duration,
    },

    /// The fetch panicked. Caught at the single-flight boundary.
    #[error("Fetch panicked: {provider}")]
    FetchPanicked {
        /// The provider whose fetch panicked
        provider: String,
    },

    /// The fetch task was cancelled before producing a result
    /// (runtime shutdown).
    #[error("Fetch aborted: {provider}")]
    FetchAborted {
        /// The provider whose fetch was aborted
        provider: String,
    },

    /// The requested date could not be parsed.
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// The requested time floor could not be parsed.
    #[error("Invalid time: {0}")]
    InvalidTime(String),

    /// The requested date lies outside the servable window.
    #[error("Date {date} is outside the allowed range {first}..={last}")]
    DateOutOfRange {
        /// The requested date
        date: NaiveDate,
        /// First servable date (today in the reference timezone)
        first: NaiveDate,
        /// Last servable date
        last: NaiveDate,
    },

    /// The client spent its action budget.
    #[error("Rate limited: {client}")]
    RateLimited {
        /// The client identifier that was denied
        client: String,
    },

    /// No provider is registered under this id.
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// A provider with this id is already registered.
    #[error("Duplicate provider: {0}")]
    DuplicateProvider(String),
}

impl AvailabilityError {
    /// Returns the failure classification for provider-scoped errors.
    ///
    /// `None` means the error belongs to the request as a whole and must not
    /// be folded into a per-provider outcome.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use padeltime_availability::errors::{AvailabilityError, FailureKind};
    ///
    /// let error = AvailabilityError::Timeout {
    ///     provider: "padel-house".to_string(),
    ///     after: Duration::from_secs(2),
    /// };
    /// assert_eq!(error.failure_kind(), Some(FailureKind::Timeout));
    ///
    /// let error = AvailabilityError::InvalidDate("tomorrow".to_string());
    /// assert_eq!(error.failure_kind(), None);
    /// ```
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Timeout { .. } => Some(FailureKind::Timeout),
            Self::ProviderError { .. } => Some(FailureKind::Upstream),
            Self::FetchPanicked { .. } | Self::FetchAborted { .. } => Some(FailureKind::Internal),

            Self::InvalidDate(_)
            | Self::InvalidTime(_)
            | Self::DateOutOfRange { .. }
            | Self::RateLimited { .. }
            | Self::UnknownProvider(_)
            | Self::DuplicateProvider(_) => None,
        }
    }

    /// Whether this error was produced by the date admission policy.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidDate(_) | Self::InvalidTime(_) | Self::DateOutOfRange { .. }
        )
    }

    /// Shorthand for an upstream failure.
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProviderError {
            provider: provider.into(),
            message: message.into(),
        }
    }
}
