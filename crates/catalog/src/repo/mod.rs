//! Repository traits and their SQLite implementations.
//!
//! The traits are the seams the view layer depends on: it receives them as
//! `Arc<dyn ...>` handles, so tests can wrap or replace the SQLite
//! repositories without touching the reconciler.

mod airport;
mod favorite;

pub use self::airport::AirportRepository;
pub use self::favorite::FavoriteRepository;
use crate::error::Result;
use crate::models::{Airport, Favorite};
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

/// Stream of favorites snapshots; see [`FavoriteStore::observe`].
pub type FavoriteStream = Pin<Box<dyn Stream<Item = Result<Vec<Favorite>>> + Send + 'static>>;

/// Read-only lookups over the bundled airport dataset.
#[async_trait]
pub trait AirportCatalog: Send + Sync {
    /// Case-insensitive substring match against the IATA code or the name,
    /// busiest airports first.
    ///
    /// The input is matched literally: `%` and `_` are not wildcards.
    async fn search_airports(&self, substring: &str) -> Result<Vec<Airport>>;

    /// Every airport, busiest first.
    async fn get_all_airports(&self) -> Result<Vec<Airport>>;

    /// Exact match on the IATA code.
    async fn get_airport_by_code(&self, code: &str) -> Result<Option<Airport>>;
}

/// Mutable set of favorite routes, unique on the `(departure, destination)`
/// pair.
#[async_trait]
pub trait FavoriteStore: Send + Sync {
    /// Subscribe to the favorites list.
    ///
    /// The stream yields the current list (oldest first) immediately, then a
    /// fresh snapshot after every change. Rapid changes may be coalesced into
    /// a single snapshot; the latest state is always delivered.
    fn observe(&self) -> FavoriteStream;

    /// One-shot snapshot of every favorite, oldest first.
    async fn list(&self) -> Result<Vec<Favorite>>;

    /// Save a route. Re-adding an existing pair replaces it (the id may
    /// change) instead of creating a duplicate.
    async fn add(&self, departure_code: &str, destination_code: &str) -> Result<Favorite>;

    /// Delete a route. Returns `false` if it was not saved.
    async fn remove(&self, departure_code: &str, destination_code: &str) -> Result<bool>;

    /// Delete a favorite by id. Returns `false` if no such favorite exists.
    async fn remove_by_id(&self, id: i64) -> Result<bool>;

    /// Remove the route if it is saved, add it otherwise, as one atomic step.
    ///
    /// Returns whether the route is a favorite after the call.
    async fn toggle(&self, departure_code: &str, destination_code: &str) -> Result<bool>;

    /// Whether the exact route is saved.
    async fn contains(&self, departure_code: &str, destination_code: &str) -> Result<bool>;
}
