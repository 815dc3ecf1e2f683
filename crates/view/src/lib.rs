//! View-state reconciler for flightsearch.
//!
//! A [`Session`] combines three collaborators into what the user should see:
//! the airport catalog, the favorites store and the last-query preference.
//! The presentation layer only ever reads [`ViewState`] snapshots and sends
//! intents; it never talks to the stores itself.
//!
//! # Architecture
//! All state lives in one owner task. Intents and the results of background
//! lookups arrive there as messages and are applied one at a time, so there
//! is a single writer and no locking. Searches and destination loads carry a
//! generation number; a result whose generation is no longer current is
//! dropped instead of overwriting newer state.

mod reconciler;
mod session;
mod state;

pub use crate::session::{Session, SessionOptions};
pub use crate::state::{FavoriteRoute, Screen, ViewState, route};
