use crate::error::{Error, ErrorKind};
use exn::ResultExt;
use std::fmt;

/// An airport from the bundled dataset.
///
/// Airports are immutable: the application never creates, updates or deletes
/// them. The IATA code is the natural key used everywhere else (favorites
/// store codes, not ids).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Airport {
    pub id: i64,
    pub iata_code: String,
    pub name: String,
    /// Yearly passenger volume, used only to order results.
    pub passengers: u64,
}

impl fmt::Display for Airport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.iata_code, self.name)
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct AirportRow {
    pub(crate) id: i64,
    pub(crate) iata_code: String,
    pub(crate) name: String,
    pub(crate) passengers: i64,
}
impl TryFrom<AirportRow> for Airport {
    type Error = Error;
    fn try_from(row: AirportRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            iata_code: row.iata_code,
            name: row.name,
            passengers: u64::try_from(row.passengers).or_raise(|| ErrorKind::InvalidData("passengers"))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_shows_code_and_name() {
        let airport = Airport {
            id: 13,
            iata_code: "JFK".to_string(),
            name: "John F. Kennedy International Airport".to_string(),
            passengers: 62_464_000,
        };
        assert_eq!(airport.to_string(), "JFK - John F. Kennedy International Airport");
    }

    #[test]
    fn test_negative_passengers_are_rejected() {
        let row = AirportRow { id: 1, iata_code: "XXX".to_string(), name: "Nowhere".to_string(), passengers: -1 };
        assert!(Airport::try_from(row).is_err());
    }
}
