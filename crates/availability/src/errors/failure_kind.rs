use serde::{Deserialize, Serialize};

/// Classification for provider-scoped failures.
///
/// Carried on every failed outcome so the view layer can tell a slow venue
/// from a broken one.
///
/// | Kind | Cause | Cached? |
/// |------|-------|---------|
/// | `Timeout` | fetch exceeded the per-provider timeout | No |
/// | `Upstream` | the source answered with an error or unusable data | No |
/// | `Internal` | the fetch panicked or its task was aborted | No |
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The provider did not answer in time.
    Timeout,

    /// The provider answered, but not with availability.
    Upstream,

    /// Something broke on our side of the boundary.
    Internal,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::Upstream => write!(f, "upstream"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
