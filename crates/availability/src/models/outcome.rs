use serde::{Deserialize, Serialize};

use super::availability::CourtAvailability;
use crate::errors::{AvailabilityError, FailureKind};

/// A provider-scoped failure.
///
/// Keeps enough venue identity for the view to render an
/// "unavailable" row in the right place.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderFailure {
    pub provider: String,
    pub name: String,
    pub url: String,
    pub kind: FailureKind,
    pub error: String,
}

/// Result of fetching one provider for one date.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProviderOutcome {
    Available(CourtAvailability),
    Failed(ProviderFailure),
}

impl ProviderOutcome {
    /// Build a failed outcome from a provider-scoped error.
    ///
    /// Request-scoped errors never reach this point, but are classified as
    /// `Internal` rather than dropped if they do.
    pub fn failed(
        provider: impl Into<String>,
        name: impl Into<String>,
        url: impl Into<String>,
        error: &AvailabilityError,
    ) -> Self {
        Self::Failed(ProviderFailure {
            provider: provider.into(),
            name: name.into(),
            url: url.into(),
            kind: error.failure_kind().unwrap_or(FailureKind::Internal),
            error: error.to_string(),
        })
    }

    pub fn provider(&self) -> &str {
        match self {
            Self::Available(a) => &a.provider,
            Self::Failed(f) => &f.provider,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Available(a) => &a.name,
            Self::Failed(f) => &f.name,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Available(_))
    }

    pub fn availability(&self) -> Option<&CourtAvailability> {
        match self {
            Self::Available(a) => Some(a),
            Self::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&ProviderFailure> {
        match self {
            Self::Available(_) => None,
            Self::Failed(f) => Some(f),
        }
    }
}
