//! Durable key/value preferences.
//!
//! The application persists exactly one value today, the last search query,
//! but the store is a general string map so the file format does not need
//! to change when another preference is added.

pub mod backend;
pub mod error;
mod store;

pub use crate::backend::PreferenceBackend;
pub use crate::store::{Preferences, SEARCH_QUERY_KEY, ValueStream};
use std::sync::Arc;

pub type BackendHandle = Arc<dyn PreferenceBackend>;
