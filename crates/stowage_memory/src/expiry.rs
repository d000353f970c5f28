// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Per-entry expiration for moka caches.

use std::time::{Duration, Instant};

use moka::Expiry;

/// A cached value that carries its own time-to-live.
pub(crate) trait Expiring {
    /// Time to live from the moment of the write, `None` for no expiration.
    fn ttl(&self) -> Option<Duration>;
}

/// Expires every entry after the time-to-live it was written with.
///
/// An overwrite restarts the clock with the new entry's time-to-live, so a key that is
/// set again without expiration stops expiring.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct PerEntryExpiry;

impl<V> Expiry<String, V> for PerEntryExpiry
where
    V: Expiring,
{
    fn expire_after_create(&self, _key: &String, value: &V, _created_at: Instant) -> Option<Duration> {
        value.ttl()
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &V,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.ttl()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Option<Duration>);

    impl Expiring for Fixed {
        fn ttl(&self) -> Option<Duration> {
            self.0
        }
    }

    #[test]
    fn create_and_update_use_entry_ttl() {
        let key = "key".to_owned();
        let now = Instant::now();
        let ttl = Some(Duration::from_secs(3));

        assert_eq!(PerEntryExpiry.expire_after_create(&key, &Fixed(ttl), now), ttl);
        assert_eq!(
            PerEntryExpiry.expire_after_update(&key, &Fixed(None), now, Some(Duration::from_secs(1))),
            None
        );
    }
}
