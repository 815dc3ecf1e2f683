//! In-memory preference backend for testing.

use crate::backend::{PreferenceBackend, Values};
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// In-memory preference backend for testing.
///
/// Reads and writes can be switched to fail at any time to exercise the
/// degraded paths of [`Preferences`](crate::Preferences). Every successful
/// write is counted.
#[derive(Debug, Default)]
pub struct MockBackend {
    values: RwLock<Values>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MockBackend {
    /// Create a mock backend pre-populated with values.
    pub fn with_values(values: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>) -> Self {
        let values = values.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        Self { values: RwLock::new(values), ..Self::default() }
    }

    /// Make every subsequent read fail (or succeed again).
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent write fail (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Current contents, bypassing the failure switches.
    pub async fn snapshot(&self) -> Values {
        self.values.read().await.clone()
    }
}

#[async_trait]
impl PreferenceBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn read(&self) -> Result<Values> {
        if self.fail_reads.load(Ordering::SeqCst) {
            exn::bail!(ErrorKind::Backend("simulated read failure".to_string()));
        }
        Ok(self.values.read().await.clone())
    }

    async fn write(&self, values: &Values) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            exn::bail!(ErrorKind::Backend("simulated write failure".to_string()));
        }
        *self.values.write().await = values.clone();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
