use crate::BackendHandle;
use crate::backend::Values;
use crate::error::{ErrorKind, Result};
use async_stream::stream;
use futures::Stream;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{Mutex, watch};

/// Key holding the last search query typed by the user.
pub const SEARCH_QUERY_KEY: &str = "search_query";

/// Stream of a preference value; see [`Preferences::observe`].
pub type ValueStream = Pin<Box<dyn Stream<Item = String> + Send + 'static>>;

/// Observable key/value preferences on top of a [`PreferenceBackend`](crate::backend::PreferenceBackend).
///
/// Reads that fail are logged and degrade to an empty string; the last-query
/// helpers never return errors at all. Writers are serialized so concurrent
/// `set` calls cannot lose each other's keys.
#[derive(Clone)]
pub struct Preferences {
    backend: BackendHandle,
    write_lock: Arc<Mutex<()>>,
    changes: Arc<watch::Sender<u64>>,
}

impl fmt::Debug for Preferences {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Preferences").field("backend", &self.backend.name()).finish_non_exhaustive()
    }
}

impl Preferences {
    pub fn new(backend: BackendHandle) -> Self {
        let (changes, _) = watch::channel(0);
        Self { backend, write_lock: Arc::new(Mutex::new(())), changes: Arc::new(changes) }
    }

    /// Read a single value.
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.backend.read().await?.remove(key))
    }

    /// Durably store a value, overwriting any previous one.
    ///
    /// Observers are only woken when the stored value actually changed.
    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut values = match self.backend.read().await {
            Ok(values) => values,
            // Unreadable contents would otherwise block every future write.
            Err(err) if matches!(&*err, ErrorKind::InvalidData(_)) => {
                tracing::warn!(backend = self.backend.name(), error = ?err, "discarding unreadable preferences");
                Values::new()
            },
            Err(err) => return Err(err),
        };
        if values.get(key).map(String::as_str) == Some(value) {
            return Ok(());
        }
        values.insert(key.to_string(), value.to_string());
        self.backend.write(&values).await?;
        self.changes.send_modify(|revision| *revision = revision.wrapping_add(1));
        Ok(())
    }

    /// Subscribe to a value.
    ///
    /// Emits the persisted value (or `""` if unset) on subscription and again
    /// after every write that changes the store. A failed read is logged and
    /// emitted as `""`.
    pub fn observe(&self, key: &str) -> ValueStream {
        let this = self.clone();
        let key = key.to_string();
        let mut changes = self.changes.subscribe();
        Box::pin(stream! {
            loop {
                changes.borrow_and_update();
                yield this.get_or_default(&key).await;
                if changes.changed().await.is_err() {
                    break;
                }
            }
        })
    }

    async fn get_or_default(&self, key: &str) -> String {
        match self.get(key).await {
            Ok(value) => value.unwrap_or_default(),
            Err(err) => {
                tracing::warn!(backend = self.backend.name(), key, error = ?err, "failed to read preference");
                String::new()
            },
        }
    }

    /// The last search query, or `""` if unset or unreadable.
    pub async fn query(&self) -> String {
        self.get_or_default(SEARCH_QUERY_KEY).await
    }

    /// Subscribe to the last search query.
    pub fn observe_query(&self) -> ValueStream {
        self.observe(SEARCH_QUERY_KEY)
    }

    /// Persist the last search query. Failures are logged, never returned.
    pub async fn save_query(&self, query: &str) {
        if let Err(err) = self.set(SEARCH_QUERY_KEY, query).await {
            tracing::warn!(backend = self.backend.name(), error = ?err, "failed to save search query");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{LocalBackend, MockBackend, PreferenceBackend};
    use futures::StreamExt;
    use std::time::Duration;

    fn mock(values: &[(&str, &str)]) -> (Arc<MockBackend>, Preferences) {
        let backend = Arc::new(MockBackend::with_values(values.iter().copied()));
        let prefs = Preferences::new(backend.clone());
        (backend, prefs)
    }

    async fn next(stream: &mut ValueStream) -> String {
        tokio::time::timeout(Duration::from_secs(5), stream.next()).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_query_defaults_to_empty() {
        let (_, prefs) = mock(&[]);
        assert_eq!(prefs.query().await, "");
    }

    #[tokio::test]
    async fn test_save_then_read_query() {
        let (backend, prefs) = mock(&[]);
        prefs.save_query("LAX").await;
        assert_eq!(prefs.query().await, "LAX");
        assert_eq!(backend.snapshot().await[SEARCH_QUERY_KEY], "LAX");
    }

    #[tokio::test]
    async fn test_set_keeps_other_keys() {
        let (backend, prefs) = mock(&[("theme", "dark")]);
        prefs.set(SEARCH_QUERY_KEY, "par").await.unwrap();
        let values = backend.snapshot().await;
        assert_eq!(values["theme"], "dark");
        assert_eq!(values[SEARCH_QUERY_KEY], "par");
    }

    #[tokio::test]
    async fn test_unchanged_value_is_not_rewritten() {
        let (backend, prefs) = mock(&[]);
        prefs.save_query("LAX").await;
        prefs.save_query("LAX").await;
        assert_eq!(backend.write_count(), 1);
    }

    #[tokio::test]
    async fn test_read_failure_degrades_to_empty() {
        let (backend, prefs) = mock(&[(SEARCH_QUERY_KEY, "LAX")]);
        backend.fail_reads(true);
        assert_eq!(prefs.query().await, "");
        let mut stream = prefs.observe_query();
        assert_eq!(next(&mut stream).await, "");
    }

    #[tokio::test]
    async fn test_write_failure_is_swallowed() {
        let (backend, prefs) = mock(&[(SEARCH_QUERY_KEY, "LAX")]);
        backend.fail_writes(true);
        prefs.save_query("JFK").await;
        assert_eq!(prefs.query().await, "LAX");
        assert!(prefs.set(SEARCH_QUERY_KEY, "JFK").await.is_err(), "lower-level set still reports errors");
    }

    #[tokio::test]
    async fn test_observe_emits_on_subscribe_and_after_writes() {
        let (_, prefs) = mock(&[(SEARCH_QUERY_KEY, "par")]);
        let mut stream = prefs.observe_query();
        assert_eq!(next(&mut stream).await, "par");
        prefs.save_query("paris").await;
        assert_eq!(next(&mut stream).await, "paris");
        prefs.save_query("").await;
        assert_eq!(next(&mut stream).await, "");
    }

    #[tokio::test]
    async fn test_failed_write_does_not_wake_observers() {
        let (backend, prefs) = mock(&[]);
        let mut stream = prefs.observe_query();
        assert_eq!(next(&mut stream).await, "");
        backend.fail_writes(true);
        prefs.save_query("LAX").await;
        let woke = tokio::time::timeout(Duration::from_millis(100), stream.next()).await;
        assert!(woke.is_err());
    }

    #[tokio::test]
    async fn test_concurrent_sets_are_serialized() {
        let (backend, prefs) = mock(&[]);
        let (a, b) = tokio::join!(prefs.set("a", "1"), prefs.set("b", "2"));
        a.unwrap();
        b.unwrap();
        let values = backend.snapshot().await;
        assert_eq!(values["a"], "1");
        assert_eq!(values["b"], "2");
    }

    #[tokio::test]
    async fn test_corrupt_file_is_replaced_on_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        std::fs::write(&path, b"garbage").unwrap();
        let backend = Arc::new(LocalBackend::new("local", &path));
        let prefs = Preferences::new(backend.clone());
        assert_eq!(prefs.query().await, "");
        prefs.save_query("LAX").await;
        assert_eq!(backend.read().await.unwrap()[SEARCH_QUERY_KEY], "LAX");
    }

    #[tokio::test]
    async fn test_query_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        Preferences::new(Arc::new(LocalBackend::new("local", &path))).save_query("LAX").await;
        let reopened = Preferences::new(Arc::new(LocalBackend::new("local", &path)));
        assert_eq!(reopened.query().await, "LAX");
    }
}
