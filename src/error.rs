//! Application Error Types

use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("could not load configuration")]
    Config,
    /// The airport catalog could not be opened; nothing works without it.
    #[display("airport catalog unavailable")]
    Catalog,
    #[display("terminal I/O failed")]
    Terminal,
}

/// A line that is not a valid command.
#[derive(Debug, Display, Error, PartialEq, Eq)]
pub enum CommandError {
    #[display("unknown command `{_0}`; type `help` for a list")]
    Unknown(#[error(not(source))] String),
    #[display("`{_0}` needs an argument")]
    MissingArgument(#[error(not(source))] &'static str),
    #[display("`{_0}` is not a favorite id")]
    InvalidId(#[error(not(source))] String),
}
