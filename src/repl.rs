//! Line-oriented terminal front-end.
//!
//! Reads one command per line from stdin and redraws the active screen
//! whenever the session publishes a different state.

use crate::error::{CommandError, ErrorKind, Result};
use exn::ResultExt;
use flightsearch_view::{Screen, Session, ViewState};
use std::fmt::Write as _;
use std::str::FromStr;
use tokio::io::{AsyncBufReadExt, BufReader};

pub const HELP: &str = "\
commands:
  query <text>   search airports by IATA code or name
  clear          clear the search and show favorites
  select <IATA>  pick a departure from the suggestions or favorites
  fav <IATA>     toggle a favorite from the selected departure
  rm <id>        remove a favorite by id
  show           redraw the current screen
  help           show this help
  quit           exit";

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Query(String),
    Clear,
    Select(String),
    Favorite(String),
    Remove(i64),
    Show,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> std::result::Result<Self, Self::Err> {
        let line = line.trim_start();
        let (name, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let argument = |name: &'static str| {
            let code = rest.trim();
            if code.is_empty() { Err(CommandError::MissingArgument(name)) } else { Ok(code.to_uppercase()) }
        };
        match name {
            // Everything after the command word is the query, spaces included.
            "query" | "q" => Ok(Self::Query(rest.trim_start().to_string())),
            "clear" => Ok(Self::Clear),
            "select" | "s" => argument("select").map(Self::Select),
            "fav" | "f" => argument("fav").map(Self::Favorite),
            "rm" => {
                let id = rest.trim();
                if id.is_empty() {
                    return Err(CommandError::MissingArgument("rm"));
                }
                id.parse().map(Self::Remove).map_err(|_| CommandError::InvalidId(id.to_string()))
            },
            "" | "show" => Ok(Self::Show),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

/// Render the active screen as plain text.
pub fn render(state: &ViewState) -> String {
    let mut out = String::new();
    match state.screen() {
        Screen::Favorites => {
            out.push_str("Favorite routes:\n");
            if state.favorites.is_empty() {
                out.push_str("  (none saved)\n");
            }
            for route in &state.favorites {
                let _ = writeln!(
                    out,
                    "  [{}] {} -> {}  ({} to {})",
                    route.id,
                    route.departure.iata_code,
                    route.destination.iata_code,
                    route.departure.name,
                    route.destination.name
                );
            }
        },
        Screen::Suggestions => {
            let _ = writeln!(out, "Airports matching \"{}\":", state.query);
            if state.suggestions.is_empty() {
                out.push_str("  (no matches)\n");
            }
            for airport in &state.suggestions {
                let _ = writeln!(out, "  {airport}");
            }
        },
        Screen::Destinations(departure) => {
            let _ = writeln!(out, "Flights from {departure}:");
            for airport in &state.destinations {
                let marker = if state.is_favorite(&departure.iata_code, &airport.iata_code) { '*' } else { ' ' };
                let _ = writeln!(out, "  [{marker}] {airport}");
            }
        },
    }
    out
}

/// Apply one command. Returns `false` once the user asked to quit.
fn execute(session: &Session, command: Command) -> bool {
    let state = session.snapshot();
    match command {
        Command::Query(query) => session.on_query_changed(query),
        Command::Clear => session.on_clear(),
        Command::Select(code) => {
            if let Some(airport) = state.suggestions.iter().find(|a| a.iata_code == code) {
                session.on_airport_selected(airport.clone());
            } else if let Some(route) = state.favorites.iter().find(|r| r.departure.iata_code == code) {
                session.on_favorite_selected(route);
            } else {
                println!("{code} is not among the suggestions or favorites");
            }
        },
        Command::Favorite(code) => match &state.selected {
            None => println!("select a departure first"),
            Some(departure) => match state.destinations.iter().find(|a| a.iata_code == code) {
                Some(destination) => session.on_toggle_favorite(departure, destination),
                None => println!("{code} is not a destination from {}", departure.iata_code),
            },
        },
        Command::Remove(id) => session.on_remove_favorite(id),
        Command::Show => print!("{}", render(&state)),
        Command::Help => println!("{HELP}"),
        Command::Quit => return false,
    }
    true
}

/// Run until `quit` or end of input.
pub async fn run(session: &Session) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut state = session.subscribe();
    let mut last = render(&state.borrow_and_update());
    print!("{last}");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.or_raise(|| ErrorKind::Terminal)? else {
                    break;
                };
                match line.parse::<Command>() {
                    Ok(command) => {
                        tracing::debug!(?command, "command");
                        if !execute(session, command) {
                            break;
                        }
                    },
                    Err(err) => println!("{err}"),
                }
            },
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let screen = render(&state.borrow_and_update());
                if screen != last {
                    print!("{screen}");
                    last = screen;
                }
            },
        }
    }
    Ok(())
}
