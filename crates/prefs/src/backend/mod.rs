//! Preference backend trait and implementations.
//!
//! A backend only knows how to load and store the whole key/value map;
//! [`Preferences`](crate::Preferences) layers per-key access, change
//! notification and failure degradation on top.

mod local;
#[cfg(any(test, feature = "mock"))]
mod mock;

pub use self::local::LocalBackend;
#[cfg(any(test, feature = "mock"))]
pub use self::mock::MockBackend;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Key/value map as persisted by a backend.
pub type Values = BTreeMap<String, String>;

/// Durable storage for the preference map.
///
/// # Examples
///
/// ```
/// use flightsearch_prefs::backend::PreferenceBackend;
/// use flightsearch_prefs::error::Result;
///
/// async fn has_key(backend: &dyn PreferenceBackend, key: &str) -> Result<bool> {
///     Ok(backend.read().await?.contains_key(key))
/// }
/// ```
#[async_trait]
pub trait PreferenceBackend: Send + Sync {
    /// Name of the backend, used for logging only.
    fn name(&self) -> &str;

    /// Load every stored value. Storage that was never written reads as an
    /// empty map, not as an error.
    async fn read(&self) -> Result<Values>;

    /// Replace the stored map. Implementations must not leave a partially
    /// written map behind if they fail.
    async fn write(&self, values: &Values) -> Result<()>;
}
