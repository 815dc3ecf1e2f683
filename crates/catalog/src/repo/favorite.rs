use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::{Favorite, FavoriteRow};
use crate::repo::{FavoriteStore, FavoriteStream};
use async_stream::stream;
use async_trait::async_trait;
use exn::ResultExt;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::watch;

/// Repository for the `favorite` relation.
///
/// All repositories created from the same [`Database`] share one change
/// signal, so a mutation through any of them wakes every observer.
#[derive(Debug, Clone)]
pub struct FavoriteRepository {
    pool: SqlitePool,
    changes: Arc<watch::Sender<u64>>,
}
impl From<&Database> for FavoriteRepository {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone(), changes: db.favorites_changed() }
    }
}
impl FavoriteRepository {
    async fn fetch_all(pool: &SqlitePool) -> Result<Vec<Favorite>> {
        let rows: Vec<FavoriteRow> = sqlx::query_as(include_str!("../../queries/list_favorites.sql"))
            .fetch_all(pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(rows.into_iter().map(Favorite::from).collect())
    }

    fn notify(&self) {
        // `send_modify` never fails, even when nobody is observing.
        self.changes.send_modify(|revision| *revision = revision.wrapping_add(1));
    }
}

#[async_trait]
impl FavoriteStore for FavoriteRepository {
    fn observe(&self) -> FavoriteStream {
        let pool = self.pool.clone();
        let mut changes = self.changes.subscribe();
        Box::pin(stream! {
            loop {
                // Mark the current revision as seen *before* reading, so a
                // write landing mid-query still triggers another snapshot.
                changes.borrow_and_update();
                yield FavoriteRepository::fetch_all(&pool).await;
                if changes.changed().await.is_err() {
                    break;
                }
            }
        })
    }

    async fn list(&self) -> Result<Vec<Favorite>> {
        Self::fetch_all(&self.pool).await
    }

    async fn add(&self, departure_code: &str, destination_code: &str) -> Result<Favorite> {
        let row: FavoriteRow = sqlx::query_as(include_str!("../../queries/upsert_favorite.sql"))
            .bind(departure_code)
            .bind(destination_code)
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        self.notify();
        Ok(Favorite::from(row))
    }

    async fn remove(&self, departure_code: &str, destination_code: &str) -> Result<bool> {
        let deleted = sqlx::query(include_str!("../../queries/delete_favorite.sql"))
            .bind(departure_code)
            .bind(destination_code)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?
            .rows_affected();
        if deleted > 0 {
            self.notify();
        }
        Ok(deleted > 0)
    }

    async fn remove_by_id(&self, id: i64) -> Result<bool> {
        let deleted = sqlx::query(include_str!("../../queries/delete_favorite_by_id.sql"))
            .bind(id)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?
            .rows_affected();
        if deleted > 0 {
            self.notify();
        }
        Ok(deleted > 0)
    }

    async fn toggle(&self, departure_code: &str, destination_code: &str) -> Result<bool> {
        // The DELETE is the first statement, so the transaction takes the
        // write lock straight away and concurrent toggles queue behind it.
        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        let deleted = sqlx::query(include_str!("../../queries/delete_favorite.sql"))
            .bind(departure_code)
            .bind(destination_code)
            .execute(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?
            .rows_affected();
        let is_favorite = if deleted == 0 {
            let _: FavoriteRow = sqlx::query_as(include_str!("../../queries/upsert_favorite.sql"))
                .bind(departure_code)
                .bind(destination_code)
                .fetch_one(&mut *tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
            true
        } else {
            false
        };
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        self.notify();
        Ok(is_favorite)
    }

    async fn contains(&self, departure_code: &str, destination_code: &str) -> Result<bool> {
        sqlx::query_scalar(include_str!("../../queries/contains_favorite.sql"))
            .bind(departure_code)
            .bind(destination_code)
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::time::Duration;

    async fn repository() -> FavoriteRepository {
        let db = Database::connect_in_memory().await.unwrap();
        FavoriteRepository::from(&db)
    }

    fn pairs(favorites: &[Favorite]) -> Vec<(&str, &str)> {
        favorites.iter().map(|f| (f.departure_code.as_str(), f.destination_code.as_str())).collect()
    }

    #[tokio::test]
    async fn test_add_and_list_in_insertion_order() {
        let repo = repository().await;
        repo.add("JFK", "LAX").await.unwrap();
        repo.add("CDG", "JFK").await.unwrap();
        let favorites = repo.list().await.unwrap();
        assert_eq!(pairs(&favorites), vec![("JFK", "LAX"), ("CDG", "JFK")]);
    }

    #[tokio::test]
    async fn test_adding_same_pair_replaces_instead_of_duplicating() {
        let repo = repository().await;
        let first = repo.add("JFK", "LAX").await.unwrap();
        let second = repo.add("JFK", "LAX").await.unwrap();
        assert_ne!(first.id, second.id, "replace hands out a fresh id");
        let favorites = repo.list().await.unwrap();
        assert_eq!(favorites, vec![second]);
    }

    #[tokio::test]
    async fn test_direction_matters() {
        let repo = repository().await;
        repo.add("JFK", "LAX").await.unwrap();
        assert!(repo.contains("JFK", "LAX").await.unwrap());
        assert!(!repo.contains("LAX", "JFK").await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let repo = repository().await;
        repo.add("JFK", "LAX").await.unwrap();
        assert!(repo.remove("JFK", "LAX").await.unwrap());
        assert!(!repo.remove("JFK", "LAX").await.unwrap());
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_by_id() {
        let repo = repository().await;
        let favorite = repo.add("JFK", "LAX").await.unwrap();
        repo.add("LAX", "JFK").await.unwrap();
        assert!(repo.remove_by_id(favorite.id).await.unwrap());
        assert!(!repo.remove_by_id(favorite.id).await.unwrap());
        assert_eq!(pairs(&repo.list().await.unwrap()), vec![("LAX", "JFK")]);
    }

    #[tokio::test]
    async fn test_toggle_twice_restores_membership() {
        let repo = repository().await;
        assert!(repo.toggle("JFK", "LAX").await.unwrap());
        assert!(repo.contains("JFK", "LAX").await.unwrap());
        assert!(!repo.toggle("JFK", "LAX").await.unwrap());
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_toggles_never_duplicate() {
        let repo = repository().await;
        let (a, b, c) =
            tokio::join!(repo.toggle("JFK", "LAX"), repo.toggle("JFK", "LAX"), repo.toggle("JFK", "LAX"));
        a.unwrap();
        b.unwrap();
        c.unwrap();
        // Three toggles from empty: net effect is a single favorite.
        assert_eq!(pairs(&repo.list().await.unwrap()), vec![("JFK", "LAX")]);
    }

    #[tokio::test]
    async fn test_favorites_may_reference_unknown_airports() {
        let repo = repository().await;
        repo.add("JFK", "XXX").await.unwrap();
        assert!(repo.contains("JFK", "XXX").await.unwrap());
    }

    #[tokio::test]
    async fn test_observe_emits_current_list_then_changes() {
        let repo = repository().await;
        repo.add("JFK", "LAX").await.unwrap();
        let mut stream = repo.observe();
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(pairs(&first), vec![("JFK", "LAX")]);

        repo.add("CDG", "ORY").await.unwrap();
        let second = tokio::time::timeout(Duration::from_secs(5), stream.next()).await.unwrap().unwrap().unwrap();
        assert_eq!(pairs(&second), vec![("JFK", "LAX"), ("CDG", "ORY")]);
    }

    #[tokio::test]
    async fn test_observers_see_changes_from_other_repositories() {
        let db = Database::connect_in_memory().await.unwrap();
        let reader = FavoriteRepository::from(&db);
        let writer = FavoriteRepository::from(&db);
        let mut stream = reader.observe();
        assert!(stream.next().await.unwrap().unwrap().is_empty());

        writer.toggle("JFK", "LAX").await.unwrap();
        let snapshot = tokio::time::timeout(Duration::from_secs(5), stream.next()).await.unwrap().unwrap().unwrap();
        assert_eq!(pairs(&snapshot), vec![("JFK", "LAX")]);
    }

    #[tokio::test]
    async fn test_noop_removal_does_not_wake_observers() {
        let repo = repository().await;
        let mut stream = repo.observe();
        stream.next().await.unwrap().unwrap();
        assert!(!repo.remove("JFK", "LAX").await.unwrap());
        let woke = tokio::time::timeout(Duration::from_millis(100), stream.next()).await;
        assert!(woke.is_err(), "no snapshot expected after a no-op removal");
    }
}
