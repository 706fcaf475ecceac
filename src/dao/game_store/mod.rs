#[cfg(feature = "couch-store")]
pub mod couchdb;
pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::{CellEntity, GameEntity};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;

/// Abstraction over the persistence layer for games and their cells.
///
/// Cell lookups are always keyed by game identifier; backends maintain the
/// corresponding secondary index so no call scans every game's cells.
pub trait GameStore: Send + Sync {
    fn find_game(&self, id: String) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;
    fn put_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Returns whether a record was actually removed.
    fn delete_game(&self, id: String) -> BoxFuture<'static, StorageResult<bool>>;
    fn find_cell(
        &self,
        game_id: String,
        row: u8,
        col: u8,
    ) -> BoxFuture<'static, StorageResult<Option<CellEntity>>>;
    fn list_cells(&self, game_id: String) -> BoxFuture<'static, StorageResult<Vec<CellEntity>>>;
    fn put_cell(&self, cell: CellEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Returns whether a record was actually removed.
    fn delete_cell(
        &self,
        game_id: String,
        row: u8,
        col: u8,
    ) -> BoxFuture<'static, StorageResult<bool>>;
    fn list_game_ids(&self) -> BoxFuture<'static, StorageResult<Vec<String>>>;
    fn count_cells(&self) -> BoxFuture<'static, StorageResult<u64>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
