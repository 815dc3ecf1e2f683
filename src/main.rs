//! flightsearch
//!
//! Terminal front-end: search airports, browse destinations from a departure
//! and keep favorite routes. All state handling lives in `flightsearch-view`;
//! this binary only wires the stores together and draws text.

mod cli;
mod error;
mod repl;

use crate::cli::Cli;
use crate::error::{ErrorKind, Result};
use clap::Parser;
use exn::ResultExt;
use flightsearch_catalog::{AirportRepository, Database, FavoriteRepository};
use flightsearch_config::Config;
use flightsearch_prefs::Preferences;
use flightsearch_prefs::backend::LocalBackend;
use flightsearch_view::{Session, SessionOptions};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:?}");
            ExitCode::FAILURE
        },
    }
}

fn init_tracing(directive: &str) {
    // Logs go to stderr so they never interleave with the rendered screens.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    if let Some(database) = cli.database {
        config.database = database;
    }
    if let Some(preferences) = cli.preferences {
        config.preferences = preferences;
    }
    init_tracing(&config.log);
    tracing::debug!(?config, "configuration loaded");

    if let Some(parent) = config.database.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).or_raise(|| ErrorKind::Catalog)?;
    }
    tracing::info!(database = %config.database.display(), "opening airport catalog");
    let db = Database::connect(&config.database).await.or_raise(|| ErrorKind::Catalog)?;

    let preferences = Preferences::new(Arc::new(LocalBackend::new("local", &config.preferences)));
    let session = Session::new(
        Arc::new(AirportRepository::from(&db)),
        Arc::new(FavoriteRepository::from(&db)),
        preferences,
        SessionOptions { debounce: config.debounce() },
    );

    let result = repl::run(&session).await;
    session.close().await;
    db.close().await;
    result
}
