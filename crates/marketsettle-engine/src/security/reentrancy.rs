//! Per-id reentrancy guard kept in persistent state.
//!
//! The flag lives under `StorageKey::Lock(id)`. Acquiring checks the flag
//! and fails with `SecurityError::Reentrant` before any write if it is set;
//! otherwise it sets the flag and returns a [`LockToken`]. Releasing clears
//! the flag. An invocation that aborts between the two is rolled back by
//! the host, which restores the flag to its pre-call value, so a stale flag
//! is never observed.

use marketsettle_host::Host;
use marketsettle_types::{LockKey, Result, SecurityError, StorageKey};

use crate::storage::LockToken;

pub struct ReentrancyGuard;

impl ReentrancyGuard {
    pub fn acquire<H: Host>(host: &mut H, key: LockKey) -> Result<LockToken> {
        let flag = StorageKey::Lock(key);
        if host.storage_get(&flag).is_some() {
            tracing::warn!(lock = %key, "reentrant call blocked");
            return Err(SecurityError::Reentrant(key.to_string()).into());
        }
        host.storage_set(flag, vec![1]);
        Ok(LockToken::new(key))
    }

    pub fn release<H: Host>(host: &mut H, token: LockToken) {
        host.storage_remove(&StorageKey::Lock(token.key()));
    }

    #[must_use]
    pub fn is_held<H: Host>(host: &H, key: LockKey) -> bool {
        host.storage_get(&StorageKey::Lock(key)).is_some()
    }

    /// Run `f` while holding the flag for `key`.
    ///
    /// The flag is cleared whether `f` succeeds or fails.
    pub fn with_lock<H: Host, T>(
        host: &mut H,
        key: LockKey,
        f: impl FnOnce(&mut H, &LockToken) -> Result<T>,
    ) -> Result<T> {
        let token = Self::acquire(host, key)?;
        let result = f(host, &token);
        Self::release(host, token);
        result
    }

    /// Run `f` while holding two flags, acquired in the order given.
    pub fn with_locks<H: Host, T>(
        host: &mut H,
        first: LockKey,
        second: LockKey,
        f: impl FnOnce(&mut H, &LockToken, &LockToken) -> Result<T>,
    ) -> Result<T> {
        Self::with_lock(host, first, |host, a| {
            Self::with_lock(host, second, |host, b| f(host, a, b))
        })
    }
}
