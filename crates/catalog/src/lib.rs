//! SQLite catalog database for airports and favorite routes.
//!
//! The database bundles a read-only airport dataset (seeded by an embedded
//! migration) next to a small mutable table of favorite routes.
//!
//! # Architecture
//! - **Airports** are immutable and keyed by IATA code. They are only ever
//!   read: searched by substring, listed, or fetched by code.
//! - **Favorites** are `(departure, destination)` code pairs, unique per pair.
//!   They deliberately do not reference the airport table, so a favorite can
//!   outlive the airport it points at.
//!
//! The view layer depends on the [`AirportCatalog`] and [`FavoriteStore`]
//! traits rather than on the SQLite repositories directly.

mod db;
pub mod error;
mod models;
mod repo;

pub use crate::db::Database;
pub use crate::models::{Airport, Favorite};
pub use crate::repo::{AirportCatalog, AirportRepository, FavoriteRepository, FavoriteStore, FavoriteStream};
use std::sync::Arc;

pub type CatalogHandle = Arc<dyn AirportCatalog>;
pub type FavoritesHandle = Arc<dyn FavoriteStore>;
