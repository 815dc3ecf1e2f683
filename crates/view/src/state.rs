use flightsearch_catalog::Airport;
use std::collections::HashSet;

pub(crate) fn is_blank(query: &str) -> bool {
    query.trim().is_empty()
}

/// A favorite whose endpoints both resolved to known airports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FavoriteRoute {
    /// Id of the underlying favorite, for [`Session::on_remove_favorite`](crate::Session::on_remove_favorite).
    pub id: i64,
    pub departure: Airport,
    pub destination: Airport,
}

/// Which list the presentation layer should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    /// Saved routes; shown while idle.
    Favorites,
    /// Airports matching the query.
    Suggestions,
    /// Every other airport, as destinations from the selected departure.
    Destinations(Airport),
}

/// Decide the active screen.
///
/// A pure function of the query and the selection: a blank query with no
/// selection shows favorites, an unselected query shows suggestions, and any
/// selection shows its destinations.
pub fn route(query: &str, selected: Option<&Airport>) -> Screen {
    match selected {
        Some(departure) => Screen::Destinations(departure.clone()),
        None if is_blank(query) => Screen::Favorites,
        None => Screen::Suggestions,
    }
}

/// Everything the presentation layer needs to render, as one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    /// The search text as last typed (or restored on startup).
    pub query: String,
    /// Departure airport picked from the suggestions or a favorite.
    pub selected: Option<Airport>,
    /// Airports matching `query`, busiest first. Empty for a blank query.
    pub suggestions: Vec<Airport>,
    /// Every airport except the selected one. Empty with no selection.
    pub destinations: Vec<Airport>,
    /// Saved routes whose airports are all known, oldest first.
    pub favorites: Vec<FavoriteRoute>,
    /// Every saved `(departure, destination)` code pair, resolvable or not.
    pub favorite_pairs: HashSet<(String, String)>,
}

impl ViewState {
    pub fn screen(&self) -> Screen {
        route(&self.query, self.selected.as_ref())
    }

    /// Whether the exact route is saved.
    ///
    /// Checked against the latest favorites snapshot, including favorites
    /// hidden from [`favorites`](Self::favorites) because an airport is unknown.
    pub fn is_favorite(&self, departure_code: &str, destination_code: &str) -> bool {
        self.favorite_pairs.contains(&(departure_code.to_string(), destination_code.to_string()))
    }
}
