use std::borrow::Cow;
use std::fmt;

use chrono::NaiveDate;

/// Provider identifier (e.g., "a1-padel", "padel-house").
pub type ProviderId = Cow<'static, str>;

/// Cache key for one provider's availability on one date.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub provider: ProviderId,
    pub date: NaiveDate,
}

impl CacheKey {
    pub fn new(provider: impl Into<ProviderId>, date: NaiveDate) -> Self {
        Self {
            provider: provider.into(),
            date,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.date.format("%Y-%m-%d"))
    }
}
