/// A saved departure → destination route.
///
/// The id is a surrogate assigned on insert. Two favorites never share the
/// same `(departure_code, destination_code)` pair; re-adding a pair replaces
/// the old row and may hand out a new id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Favorite {
    pub id: i64,
    pub departure_code: String,
    pub destination_code: String,
}

#[derive(sqlx::FromRow)]
pub(crate) struct FavoriteRow {
    pub(crate) id: i64,
    pub(crate) departure_code: String,
    pub(crate) destination_code: String,
}
impl From<FavoriteRow> for Favorite {
    fn from(row: FavoriteRow) -> Self {
        Self { id: row.id, departure_code: row.departure_code, destination_code: row.destination_code }
    }
}

