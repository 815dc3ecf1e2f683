use crate::reconciler::{Intent, Reconciler};
use crate::state::{FavoriteRoute, ViewState};
use flightsearch_catalog::{Airport, CatalogHandle, FavoritesHandle};
use flightsearch_prefs::Preferences;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// Tuning knobs for a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Quiet period after the last query edit before the catalog is searched.
    pub debounce: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self { debounce: Duration::from_millis(300) }
    }
}

/// Handle to a running reconciler.
///
/// Intents return immediately; their effects show up in later
/// [`ViewState`] snapshots. Cloning is cheap and every clone drives the same
/// state. The reconciler stops, and its background work is aborted, once the
/// last handle is dropped.
#[derive(Debug, Clone)]
pub struct Session {
    intents: mpsc::UnboundedSender<Intent>,
    state: watch::Receiver<ViewState>,
}

impl Session {
    /// Start a reconciler on the current tokio runtime.
    ///
    /// The persisted query is restored in the background; until it arrives
    /// the state is empty and shows favorites.
    pub fn new(
        catalog: CatalogHandle,
        favorites: FavoritesHandle,
        preferences: Preferences,
        options: SessionOptions,
    ) -> Self {
        let (intents, intents_rx) = mpsc::unbounded_channel();
        let (publisher, state) = watch::channel(ViewState::default());
        let reconciler = Reconciler::new(catalog, favorites, preferences, options, publisher);
        tokio::spawn(reconciler.run(intents_rx));
        Self { intents, state }
    }

    /// A receiver that is notified after every state change.
    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.state.clone()
    }

    /// The latest published state.
    pub fn snapshot(&self) -> ViewState {
        self.state.borrow().clone()
    }

    pub fn is_favorite(&self, departure_code: &str, destination_code: &str) -> bool {
        self.state.borrow().is_favorite(departure_code, destination_code)
    }

    /// The user edited the search text.
    ///
    /// Clears the selection, persists the query and searches once the query
    /// has been stable for the debounce window.
    pub fn on_query_changed(&self, query: impl Into<String>) {
        self.send(Intent::QueryChanged(query.into()));
    }

    /// The user picked a departure airport. The query is left alone.
    pub fn on_airport_selected(&self, airport: Airport) {
        self.send(Intent::AirportSelected(airport));
    }

    /// The user picked a saved route: its departure becomes the selection.
    pub fn on_favorite_selected(&self, route: &FavoriteRoute) {
        self.send(Intent::AirportSelected(route.departure.clone()));
    }

    /// Reset the query to blank and drop the selection.
    pub fn on_clear(&self) {
        self.send(Intent::Clear);
    }

    /// Save the route if it is not a favorite, forget it otherwise.
    ///
    /// Membership is decided by the store when the toggle runs, never from
    /// the snapshot this handle last saw.
    pub fn on_toggle_favorite(&self, departure: &Airport, destination: &Airport) {
        self.send(Intent::ToggleFavorite {
            departure_code: departure.iata_code.clone(),
            destination_code: destination.iata_code.clone(),
        });
    }

    pub fn on_remove_favorite(&self, id: i64) {
        self.send(Intent::RemoveFavorite(id));
    }

    /// Drop this handle and wait for the reconciler to stop.
    ///
    /// Once every handle is gone the reconciler aborts its background work,
    /// saves the last query still pending and exits. While other clones are
    /// alive this keeps waiting until they are dropped too.
    pub async fn close(self) {
        let Self { intents, mut state } = self;
        drop(intents);
        while state.changed().await.is_ok() {}
    }

    fn send(&self, intent: Intent) {
        if self.intents.send(intent).is_err() {
            tracing::warn!("reconciler is no longer running; intent dropped");
        }
    }
}
