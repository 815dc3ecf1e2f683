use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::{Airport, AirportRow};
use crate::repo::AirportCatalog;
use async_trait::async_trait;
use exn::ResultExt;
use sqlx::SqlitePool;

/// Escape `LIKE` metacharacters so user input only ever matches literally,
/// then wrap it for a "contains" match. Pairs with `ESCAPE '\'` in the query.
fn contains_pattern(substring: &str) -> String {
    let mut pattern = String::with_capacity(substring.len() + 2);
    pattern.push('%');
    for ch in substring.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

/// Repository over the read-only `airport` relation.
#[derive(Debug, Clone)]
pub struct AirportRepository {
    pool: SqlitePool,
}
impl From<&Database> for AirportRepository {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }
}
impl AirportRepository {
    /// Number of airports in the dataset.
    pub async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(include_str!("../../queries/count_airports.sql"))
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        u64::try_from(count).or_raise(|| ErrorKind::InvalidData("airport count"))
    }
}

#[async_trait]
impl AirportCatalog for AirportRepository {
    async fn search_airports(&self, substring: &str) -> Result<Vec<Airport>> {
        let rows: Vec<AirportRow> = sqlx::query_as(include_str!("../../queries/search_airports.sql"))
            .bind(contains_pattern(substring))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(Airport::try_from).collect()
    }

    async fn get_all_airports(&self) -> Result<Vec<Airport>> {
        let rows: Vec<AirportRow> = sqlx::query_as(include_str!("../../queries/get_all_airports.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(Airport::try_from).collect()
    }

    async fn get_airport_by_code(&self, code: &str) -> Result<Option<Airport>> {
        let row: Option<AirportRow> = sqlx::query_as(include_str!("../../queries/get_airport_by_code.sql"))
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(Airport::try_from).transpose()
    }
}
