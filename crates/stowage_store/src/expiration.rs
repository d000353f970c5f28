// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Entry expiration and its resolution against a store default.

use std::time::Duration;

/// The sentinel duration meaning "never expire".
///
/// A zero duration is never interpreted as "expire immediately".
pub const NO_EXPIRATION: Duration = Duration::ZERO;

/// How long an entry written by `set` stays live.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use stowage_store::{Expiration, NO_EXPIRATION};
///
/// assert_eq!(Expiration::from(NO_EXPIRATION), Expiration::Never);
/// assert_eq!(
///     Expiration::from(Duration::from_secs(5)),
///     Expiration::After(Duration::from_secs(5))
/// );
///
/// let default = Duration::from_secs(60);
/// assert_eq!(Expiration::Default.resolve(default), Some(default));
/// assert_eq!(Expiration::Never.resolve(default), None);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Expiration {
    /// Use the store's configured default expiration.
    #[default]
    Default,
    /// The entry never expires.
    Never,
    /// The entry expires once the duration has elapsed.
    After(Duration),
}

impl Expiration {
    /// Resolves this expiration against a store's default.
    ///
    /// Returns `None` when the entry should never expire. A zero default, or an
    /// explicit zero duration, means no expiration.
    #[must_use]
    pub fn resolve(self, default: Duration) -> Option<Duration> {
        match self {
            Self::Default => non_zero(default),
            Self::Never => None,
            Self::After(duration) => non_zero(duration),
        }
    }
}

impl From<Duration> for Expiration {
    fn from(duration: Duration) -> Self {
        if duration.is_zero() { Self::Never } else { Self::After(duration) }
    }
}

impl From<Option<Duration>> for Expiration {
    fn from(duration: Option<Duration>) -> Self {
        duration.map_or(Self::Default, Self::from)
    }
}

fn non_zero(duration: Duration) -> Option<Duration> {
    (!duration.is_zero()).then_some(duration)
}

/// Rounds a duration up to whole seconds, for backends with second granularity.
///
/// Expiration is only guaranteed to happen at or after the requested duration, so
/// sub-second remainders round up and never down to zero.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use stowage_store::round_up_to_secs;
///
/// assert_eq!(round_up_to_secs(Duration::from_millis(1)), 1);
/// assert_eq!(round_up_to_secs(Duration::from_secs(2)), 2);
/// assert_eq!(round_up_to_secs(Duration::from_millis(2001)), 3);
/// ```
#[must_use]
pub fn round_up_to_secs(duration: Duration) -> u64 {
    let secs = duration.as_secs();
    if duration.subsec_nanos() > 0 { secs.saturating_add(1) } else { secs }
}
