use crate::session::SessionOptions;
use crate::state::{FavoriteRoute, ViewState, is_blank};
use flightsearch_catalog::{Airport, AirportCatalog, CatalogHandle, Favorite, FavoritesHandle};
use flightsearch_prefs::Preferences;
use futures::StreamExt;
use std::collections::{HashMap, HashSet};
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle, JoinSet};

/// User intents, as sent by [`Session`](crate::Session).
#[derive(Debug)]
pub(crate) enum Intent {
    QueryChanged(String),
    AirportSelected(Airport),
    Clear,
    ToggleFavorite { departure_code: String, destination_code: String },
    RemoveFavorite(i64),
}

/// Results of background work, delivered back to the owner task.
#[derive(Debug)]
enum Event {
    /// First value read from the preference store.
    QueryRestored(String),
    /// The debounce window for a query edit has elapsed.
    SearchDue { generation: u64 },
    SearchCompleted { generation: u64, query: String, airports: Vec<Airport> },
    DestinationsLoaded { generation: u64, airports: Vec<Airport> },
    /// A new favorites snapshot. `routes` is `None` when the endpoints could
    /// not be looked up, in which case the previous routes stay on screen.
    FavoritesChanged { pairs: HashSet<(String, String)>, routes: Option<Vec<FavoriteRoute>> },
}

pub(crate) struct Reconciler {
    catalog: CatalogHandle,
    favorites: FavoritesHandle,
    options: SessionOptions,
    state: ViewState,
    publisher: watch::Sender<ViewState>,
    events: mpsc::UnboundedReceiver<Event>,
    events_tx: mpsc::UnboundedSender<Event>,
    /// Lookups, timers and forwarders; aborted on shutdown.
    tasks: JoinSet<()>,
    /// Favorite writes the user asked for; always run to completion.
    mutations: JoinSet<()>,
    persist: mpsc::UnboundedSender<String>,
    writer: JoinHandle<()>,
    search_generation: u64,
    destinations_generation: u64,
    /// Query the current suggestions were computed for.
    searched_query: Option<String>,
    /// Set by the first user edit; a late restore must not clobber it.
    query_edited: bool,
}

impl Reconciler {
    pub(crate) fn new(
        catalog: CatalogHandle,
        favorites: FavoritesHandle,
        preferences: Preferences,
        options: SessionOptions,
        publisher: watch::Sender<ViewState>,
    ) -> Self {
        let (events_tx, events) = mpsc::unbounded_channel();
        let (persist, pending) = mpsc::unbounded_channel();
        let writer = tokio::spawn(write_queries(preferences.clone(), pending));

        let mut tasks = JoinSet::new();
        tasks.spawn(restore_query(preferences, events_tx.clone()));
        tasks.spawn(forward_favorites(catalog.clone(), favorites.clone(), events_tx.clone()));

        Self {
            catalog,
            favorites,
            options,
            state: ViewState::default(),
            publisher,
            events,
            events_tx,
            tasks,
            mutations: JoinSet::new(),
            persist,
            writer,
            search_generation: 0,
            destinations_generation: 0,
            searched_query: None,
            query_edited: false,
        }
    }

    pub(crate) async fn run(mut self, mut intents: mpsc::UnboundedReceiver<Intent>) {
        loop {
            tokio::select! {
                intent = intents.recv() => match intent {
                    Some(intent) => self.apply_intent(intent),
                    // Every session handle is gone.
                    None => break,
                },
                Some(event) = self.events.recv() => self.apply_event(event),
                Some(joined) = self.tasks.join_next() => report_panic(joined),
                Some(joined) = self.mutations.join_next() => report_panic(joined),
            }
            self.publish();
        }

        let Self { mut tasks, mut mutations, persist, writer, publisher, .. } = self;
        // Accepted toggles and removals still reach the store.
        while let Some(joined) = mutations.join_next().await {
            report_panic(joined);
        }
        tasks.shutdown().await;
        // Let the writer flush whatever query is still pending.
        drop(persist);
        if let Err(err) = writer.await {
            tracing::error!(error = ?err, "query writer failed");
        }
        tracing::debug!("reconciler stopped");
        // Subscribers waiting in `Session::close` are released only now.
        drop(publisher);
    }

    fn publish(&self) {
        self.publisher.send_if_modified(|published| {
            if *published == self.state {
                return false;
            }
            *published = self.state.clone();
            true
        });
    }

    fn apply_intent(&mut self, intent: Intent) {
        tracing::trace!(?intent, "intent");
        match intent {
            Intent::QueryChanged(query) => self.set_query(query),
            Intent::Clear => self.set_query(String::new()),
            Intent::AirportSelected(airport) => self.select(airport),
            Intent::ToggleFavorite { departure_code, destination_code } => {
                let favorites = self.favorites.clone();
                self.mutations.spawn(async move {
                    if let Err(err) = favorites.toggle(&departure_code, &destination_code).await {
                        tracing::warn!(departure_code, destination_code, error = ?err, "failed to toggle favorite");
                    }
                });
            },
            Intent::RemoveFavorite(id) => {
                let favorites = self.favorites.clone();
                self.mutations.spawn(async move {
                    if let Err(err) = favorites.remove_by_id(id).await {
                        tracing::warn!(id, error = ?err, "failed to remove favorite");
                    }
                });
            },
        }
    }

    fn apply_event(&mut self, event: Event) {
        match event {
            Event::QueryRestored(query) => {
                if self.query_edited {
                    tracing::debug!(restored = query, "query edited before restore completed; restored value dropped");
                    return;
                }
                tracing::debug!(query, "restored last query");
                self.state.query = query;
                // No debounce: the user is not typing.
                let generation = self.next_search();
                if is_blank(&self.state.query) {
                    self.searched_query = Some(self.state.query.clone());
                } else {
                    self.spawn_search(generation, self.state.query.clone());
                }
            },
            Event::SearchDue { generation } => {
                if generation != self.search_generation {
                    return;
                }
                if self.searched_query.as_deref() == Some(self.state.query.as_str()) {
                    tracing::debug!(query = self.state.query, "query unchanged since last search; skipped");
                    return;
                }
                self.spawn_search(generation, self.state.query.clone());
            },
            Event::SearchCompleted { generation, query, airports } => {
                if generation != self.search_generation {
                    tracing::debug!(query, "discarding stale search result");
                    return;
                }
                self.state.suggestions = airports;
                self.searched_query = Some(query);
            },
            Event::DestinationsLoaded { generation, airports } => {
                if generation != self.destinations_generation {
                    tracing::debug!("discarding stale destinations");
                    return;
                }
                if let Some(departure) = &self.state.selected {
                    self.state.destinations =
                        airports.into_iter().filter(|airport| airport.iata_code != departure.iata_code).collect();
                }
            },
            Event::FavoritesChanged { pairs, routes } => {
                self.state.favorite_pairs = pairs;
                if let Some(routes) = routes {
                    self.state.favorites = routes;
                }
            },
        }
    }

    fn set_query(&mut self, query: String) {
        self.query_edited = true;
        if self.persist.send(query.clone()).is_err() {
            tracing::warn!("query writer is no longer running; query not saved");
        }
        self.state.selected = None;
        self.state.destinations.clear();
        self.destinations_generation += 1;

        let generation = self.next_search();
        if is_blank(&query) {
            self.state.suggestions.clear();
            self.searched_query = Some(query.clone());
        } else {
            let delay = self.options.debounce;
            let events = self.events_tx.clone();
            self.tasks.spawn(async move {
                tokio::time::sleep(delay).await;
                let _ = events.send(Event::SearchDue { generation });
            });
        }
        self.state.query = query;
    }

    fn select(&mut self, airport: Airport) {
        self.state.selected = Some(airport);
        self.state.destinations.clear();
        self.destinations_generation += 1;
        let generation = self.destinations_generation;
        let catalog = self.catalog.clone();
        let events = self.events_tx.clone();
        self.tasks.spawn(async move {
            match catalog.get_all_airports().await {
                Ok(airports) => {
                    let _ = events.send(Event::DestinationsLoaded { generation, airports });
                },
                Err(err) => tracing::warn!(error = ?err, "failed to load destinations"),
            }
        });
    }

    /// Invalidate every search in flight and return the new generation.
    fn next_search(&mut self) -> u64 {
        self.search_generation += 1;
        self.search_generation
    }

    fn spawn_search(&mut self, generation: u64, query: String) {
        let catalog = self.catalog.clone();
        let events = self.events_tx.clone();
        self.tasks.spawn(async move {
            match catalog.search_airports(&query).await {
                Ok(airports) => {
                    let _ = events.send(Event::SearchCompleted { generation, query, airports });
                },
                Err(err) => tracing::warn!(query, error = ?err, "airport search failed"),
            }
        });
    }
}

fn report_panic(joined: Result<(), JoinError>) {
    if let Err(err) = joined
        && err.is_panic()
    {
        tracing::error!(error = ?err, "background task panicked");
    }
}

/// Read the persisted query once. Later emissions are the reconciler's own
/// writes echoing back, so they are ignored.
async fn restore_query(preferences: Preferences, events: mpsc::UnboundedSender<Event>) {
    if let Some(query) = preferences.observe_query().next().await {
        let _ = events.send(Event::QueryRestored(query));
    }
}

/// Persist queries one at a time, skipping straight to the newest pending
/// value so an older query can never overwrite a newer one.
async fn write_queries(preferences: Preferences, mut pending: mpsc::UnboundedReceiver<String>) {
    while let Some(mut query) = pending.recv().await {
        while let Ok(newer) = pending.try_recv() {
            query = newer;
        }
        preferences.save_query(&query).await;
    }
}

async fn forward_favorites(catalog: CatalogHandle, favorites: FavoritesHandle, events: mpsc::UnboundedSender<Event>) {
    let mut snapshots = favorites.observe();
    while let Some(snapshot) = snapshots.next().await {
        let favorites = match snapshot {
            Ok(favorites) => favorites,
            Err(err) => {
                tracing::warn!(error = ?err, "failed to read favorites");
                continue;
            },
        };
        let pairs = favorites.iter().map(|f| (f.departure_code.clone(), f.destination_code.clone())).collect();
        let routes = resolve_routes(catalog.as_ref(), &favorites).await;
        if events.send(Event::FavoritesChanged { pairs, routes }).is_err() {
            break;
        }
    }
}

/// Look up both endpoints of every favorite. Favorites pointing at an airport
/// the catalog does not know are left out.
async fn resolve_routes(catalog: &dyn AirportCatalog, favorites: &[Favorite]) -> Option<Vec<FavoriteRoute>> {
    let mut airports: HashMap<&str, Option<Airport>> = HashMap::new();
    let mut routes = Vec::with_capacity(favorites.len());
    for favorite in favorites {
        for code in [favorite.departure_code.as_str(), favorite.destination_code.as_str()] {
            if airports.contains_key(code) {
                continue;
            }
            match catalog.get_airport_by_code(code).await {
                Ok(airport) => {
                    airports.insert(code, airport);
                },
                Err(err) => {
                    tracing::warn!(code, error = ?err, "failed to resolve favorite airport");
                    return None;
                },
            }
        }
        let departure = airports.get(favorite.departure_code.as_str()).cloned().flatten();
        let destination = airports.get(favorite.destination_code.as_str()).cloned().flatten();
        match (departure, destination) {
            (Some(departure), Some(destination)) => routes.push(FavoriteRoute { id: favorite.id, departure, destination }),
            _ => tracing::debug!(
                id = favorite.id,
                departure = favorite.departure_code,
                destination = favorite.destination_code,
                "favorite references an unknown airport; hidden"
            ),
        }
    }
    Some(routes)
}
