use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{Client, Collection, Database, bson::doc, options::IndexOptions};
use tokio::sync::RwLock;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{MongoCellDocument, MongoGameDocument, cell_key, cells_of, doc_id},
};
use crate::dao::{
    game_store::GameStore,
    models::{CellEntity, GameEntity},
    storage::StorageResult,
};

const GAME_COLLECTION_NAME: &str = "games";
const CELL_COLLECTION_NAME: &str = "cells";

/// MongoDB-backed [`GameStore`]: one document per game, one per cell.
#[derive(Clone)]
pub struct MongoGameStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    // Kept alive alongside the database handle it produced.
    #[allow(dead_code)]
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoGameStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    /// The cell collection is only ever queried by game, so the compound index
    /// doubles as the per-game secondary index and rejects duplicate coordinates.
    async fn ensure_indexes(&self) -> MongoResult<()> {
        let collection = self.cell_collection().await;
        let index = mongodb::IndexModel::builder()
            .keys(doc! {"game_id": 1, "row": 1, "col": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("cell_game_coord_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();

        collection
            .create_index(index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: CELL_COLLECTION_NAME,
                index: "game_id,row,col",
                source,
            })?;

        Ok(())
    }

    async fn collection(&self) -> Collection<MongoGameDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoGameDocument>(GAME_COLLECTION_NAME)
    }

    async fn cell_collection(&self) -> Collection<MongoCellDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoCellDocument>(CELL_COLLECTION_NAME)
    }

    async fn find_game(&self, id: String) -> MongoResult<Option<GameEntity>> {
        let collection = self.collection().await;
        let document = collection
            .find_one(doc_id(&id))
            .await
            .map_err(|source| MongoDaoError::LoadGame { id, source })?;
        Ok(document.map(Into::into))
    }

    async fn put_game(&self, game: GameEntity) -> MongoResult<()> {
        let id = game.id.clone();
        let document: MongoGameDocument = game.into();
        let collection = self.collection().await;
        collection
            .replace_one(doc_id(&id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveGame { id, source })?;
        Ok(())
    }

    async fn delete_game(&self, id: String) -> MongoResult<bool> {
        let collection = self.collection().await;
        let result = collection
            .delete_one(doc_id(&id))
            .await
            .map_err(|source| MongoDaoError::DeleteGame { id, source })?;
        Ok(result.deleted_count > 0)
    }

    async fn find_cell(&self, game_id: String, row: u8, col: u8) -> MongoResult<Option<CellEntity>> {
        let collection = self.cell_collection().await;
        let document = collection
            .find_one(cell_key(&game_id, row, col))
            .await
            .map_err(|source| MongoDaoError::LoadCells { game_id, source })?;
        document.map(MongoCellDocument::into_entity).transpose()
    }

    async fn list_cells(&self, game_id: String) -> MongoResult<Vec<CellEntity>> {
        let collection = self.cell_collection().await;
        let documents: Vec<MongoCellDocument> = collection
            .find(cells_of(&game_id))
            .sort(doc! {"row": 1, "col": 1})
            .await
            .map_err(|source| MongoDaoError::LoadCells {
                game_id: game_id.clone(),
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::LoadCells { game_id, source })?;

        documents
            .into_iter()
            .map(MongoCellDocument::into_entity)
            .collect()
    }

    async fn put_cell(&self, cell: CellEntity) -> MongoResult<()> {
        let (game_id, row, col) = (cell.game_id.clone(), cell.row, cell.col);
        let document: MongoCellDocument = cell.into();
        let collection = self.cell_collection().await;
        collection
            .replace_one(cell_key(&game_id, row, col), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveCell {
                game_id,
                row,
                col,
                source,
            })?;
        Ok(())
    }

    async fn delete_cell(&self, game_id: String, row: u8, col: u8) -> MongoResult<bool> {
        let collection = self.cell_collection().await;
        let result = collection
            .delete_one(cell_key(&game_id, row, col))
            .await
            .map_err(|source| MongoDaoError::DeleteCell {
                game_id,
                row,
                col,
                source,
            })?;
        Ok(result.deleted_count > 0)
    }

    async fn list_game_ids(&self) -> MongoResult<Vec<String>> {
        let collection = self.collection().await;
        let documents: Vec<MongoGameDocument> = collection
            .find(doc! {})
            .sort(doc! {"_id": 1})
            .await
            .map_err(|source| MongoDaoError::ListGames { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListGames { source })?;

        Ok(documents
            .into_iter()
            .map(|document| GameEntity::from(document).id)
            .collect())
    }

    async fn count_cells(&self) -> MongoResult<u64> {
        let collection = self.cell_collection().await;
        collection
            .count_documents(doc! {})
            .await
            .map_err(|source| MongoDaoError::CountCells { source })
    }
}

impl GameStore for MongoGameStore {
    fn find_game(&self, id: String) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_game(id).await.map_err(Into::into) })
    }

    fn put_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.put_game(game).await.map_err(Into::into) })
    }

    fn delete_game(&self, id: String) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_game(id).await.map_err(Into::into) })
    }

    fn find_cell(
        &self,
        game_id: String,
        row: u8,
        col: u8,
    ) -> BoxFuture<'static, StorageResult<Option<CellEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_cell(game_id, row, col)
                .await
                .map_err(Into::into)
        })
    }

    fn list_cells(&self, game_id: String) -> BoxFuture<'static, StorageResult<Vec<CellEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_cells(game_id).await.map_err(Into::into) })
    }

    fn put_cell(&self, cell: CellEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.put_cell(cell).await.map_err(Into::into) })
    }

    fn delete_cell(
        &self,
        game_id: String,
        row: u8,
        col: u8,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .delete_cell(game_id, row, col)
                .await
                .map_err(Into::into)
        })
    }

    fn list_game_ids(&self) -> BoxFuture<'static, StorageResult<Vec<String>>> {
        let store = self.clone();
        Box::pin(async move { store.list_game_ids().await.map_err(Into::into) })
    }

    fn count_cells(&self) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move { store.count_cells().await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
