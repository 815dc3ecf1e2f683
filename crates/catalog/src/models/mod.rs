mod airport;
mod favorite;

pub use self::airport::Airport;
pub(crate) use self::airport::AirportRow;
pub use self::favorite::Favorite;
pub(crate) use self::favorite::FavoriteRow;
