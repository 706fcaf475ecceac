//! In-process [`GameStore`] used when no database is configured and by the test suites.

use std::{collections::BTreeMap, sync::Arc};

use dashmap::DashMap;
use futures::future::{BoxFuture, ready};

use crate::dao::{
    game_store::GameStore,
    models::{CellEntity, GameEntity},
    storage::StorageResult,
};

/// Cells of one game keyed by `(row, col)`, acting as the per-game secondary index.
type CellIndex = BTreeMap<(u8, u8), CellEntity>;

#[derive(Clone, Default)]
pub struct MemoryGameStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    games: DashMap<String, GameEntity>,
    cells: DashMap<String, CellIndex>,
}

impl MemoryGameStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl GameStore for MemoryGameStore {
    fn find_game(&self, id: String) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let game = self.inner.games.get(&id).map(|entry| entry.value().clone());
        Box::pin(ready(Ok(game)))
    }

    fn put_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.games.insert(game.id.clone(), game);
        Box::pin(ready(Ok(())))
    }

    fn delete_game(&self, id: String) -> BoxFuture<'static, StorageResult<bool>> {
        let removed = self.inner.games.remove(&id).is_some();
        Box::pin(ready(Ok(removed)))
    }

    fn find_cell(
        &self,
        game_id: String,
        row: u8,
        col: u8,
    ) -> BoxFuture<'static, StorageResult<Option<CellEntity>>> {
        let cell = self
            .inner
            .cells
            .get(&game_id)
            .and_then(|index| index.get(&(row, col)).cloned());
        Box::pin(ready(Ok(cell)))
    }

    fn list_cells(&self, game_id: String) -> BoxFuture<'static, StorageResult<Vec<CellEntity>>> {
        let cells = self
            .inner
            .cells
            .get(&game_id)
            .map(|index| index.values().cloned().collect())
            .unwrap_or_default();
        Box::pin(ready(Ok(cells)))
    }

    fn put_cell(&self, cell: CellEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.inner
            .cells
            .entry(cell.game_id.clone())
            .or_default()
            .insert((cell.row, cell.col), cell);
        Box::pin(ready(Ok(())))
    }

    fn delete_cell(
        &self,
        game_id: String,
        row: u8,
        col: u8,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let removed = self
            .inner
            .cells
            .get_mut(&game_id)
            .map(|mut index| index.remove(&(row, col)).is_some())
            .unwrap_or(false);
        self.inner.cells.remove_if(&game_id, |_, index| index.is_empty());
        Box::pin(ready(Ok(removed)))
    }

    fn list_game_ids(&self) -> BoxFuture<'static, StorageResult<Vec<String>>> {
        let mut ids = self
            .inner
            .games
            .iter()
            .map(|entry| entry.key().clone())
            .collect::<Vec<_>>();
        ids.sort();
        Box::pin(ready(Ok(ids)))
    }

    fn count_cells(&self) -> BoxFuture<'static, StorageResult<u64>> {
        let count = self
            .inner
            .cells
            .iter()
            .map(|entry| entry.value().len() as u64)
            .sum();
        Box::pin(ready(Ok(count)))
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(ready(Ok(())))
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(ready(Ok(())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cells_are_indexed_per_game() {
        let store = MemoryGameStore::new();
        for cell in CellEntity::full_board("g1") {
            store.put_cell(cell).await.unwrap();
        }
        store
            .put_cell(CellEntity::unclaimed("g2", 0, 0))
            .await
            .unwrap();

        assert_eq!(store.list_cells("g1".into()).await.unwrap().len(), 9);
        assert_eq!(store.list_cells("g2".into()).await.unwrap().len(), 1);
        assert_eq!(store.count_cells().await.unwrap(), 10);
        assert!(store.find_cell("g2".into(), 1, 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_reports_whether_something_was_removed() {
        let store = MemoryGameStore::new();
        store
            .put_game(GameEntity::new("g1".into(), "a".into(), "b".into()))
            .await
            .unwrap();
        store
            .put_cell(CellEntity::unclaimed("g1", 2, 2))
            .await
            .unwrap();

        assert!(store.delete_cell("g1".into(), 2, 2).await.unwrap());
        assert!(!store.delete_cell("g1".into(), 2, 2).await.unwrap());
        assert!(store.delete_game("g1".into()).await.unwrap());
        assert!(!store.delete_game("g1".into()).await.unwrap());
        assert!(store.list_game_ids().await.unwrap().is_empty());
        assert_eq!(store.count_cells().await.unwrap(), 0);
    }
}
