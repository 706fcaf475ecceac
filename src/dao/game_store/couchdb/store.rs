use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, StatusCode, Url};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::from_value;

use crate::dao::{
    game_store::GameStore,
    models::{CellEntity, GameEntity},
    storage::StorageResult,
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{
        AllDocsResponse, CELL_PREFIX, CouchCellDocument, CouchGameDocument,
        GAME_PREFIX, RevisionOnly, cell_doc_id, cell_prefix, game_doc_id, prefix_range,
    },
};

const ALL_DOCS: &str = "_all_docs";

/// CouchDB-backed [`GameStore`] addressing games and cells through prefixed document ids.
#[derive(Clone)]
pub struct CouchGameStore {
    client: Client,
    database_url: Arc<Url>,
    database: Arc<str>,
    auth: Option<(Arc<str>, Arc<str>)>,
}

impl CouchGameStore {
    /// Establish a connection to CouchDB and ensure the database exists.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;

        let mut database_url =
            Url::parse(config.base_url.trim_end_matches('/')).map_err(|_| {
                CouchDaoError::InvalidBaseUrl {
                    url: config.base_url.clone(),
                }
            })?;
        database_url
            .path_segments_mut()
            .map_err(|_| CouchDaoError::InvalidBaseUrl {
                url: config.base_url.clone(),
            })?
            .pop_if_empty()
            .push(&config.database);

        let auth = config
            .credentials
            .map(|(user, pass)| (Arc::<str>::from(user), Arc::<str>::from(pass)));

        let store = Self {
            client,
            database_url: Arc::new(database_url),
            database: Arc::from(config.database),
            auth,
        };

        store.ensure_database().await?;
        Ok(store)
    }

    /// Build a request against `database/<path>`; the path is percent-encoded as a
    /// single segment so caller-supplied game ids cannot escape the database.
    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let mut url = (*self.database_url).clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(path);
        }
        self.with_auth(self.client.request(method, url))
    }

    fn with_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.auth {
            Some((ref user, ref pass)) => builder.basic_auth(user.as_ref(), Some(pass.as_ref())),
            None => builder,
        }
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let database = self.database.to_string();
        let url = (*self.database_url).clone();

        let response = self
            .with_auth(self.client.get(url.clone()))
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                doc_id: database.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                let create = self
                    .with_auth(self.client.put(url))
                    .send()
                    .await
                    .map_err(|source| CouchDaoError::RequestSend {
                        doc_id: database.clone(),
                        source,
                    })?;
                if create.status().is_success() {
                    Ok(())
                } else {
                    Err(CouchDaoError::DatabaseStatus {
                        database,
                        status: create.status(),
                    })
                }
            }
            other => Err(CouchDaoError::DatabaseStatus {
                database,
                status: other,
            }),
        }
    }

    async fn get_document<T>(&self, doc_id: &str) -> CouchResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::GET, doc_id)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                doc_id: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                response.json::<T>().await.map(Some).map_err(|source| {
                    CouchDaoError::DecodeResponse {
                        doc_id: doc_id.to_string(),
                        source,
                    }
                })
            }
            other => Err(CouchDaoError::RequestStatus {
                doc_id: doc_id.to_string(),
                status: other,
            }),
        }
    }

    async fn current_rev(&self, doc_id: &str) -> CouchResult<Option<String>> {
        Ok(self
            .get_document::<RevisionOnly>(doc_id)
            .await?
            .map(|doc| doc.rev))
    }

    async fn put_document<T>(&self, doc_id: &str, document: &T) -> CouchResult<()>
    where
        T: ?Sized + Serialize,
    {
        let response = self
            .request(Method::PUT, doc_id)
            .json(document)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                doc_id: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::CONFLICT => Err(CouchDaoError::RevisionConflict {
                doc_id: doc_id.to_string(),
            }),
            status if status.is_success() => Ok(()),
            other => Err(CouchDaoError::RequestStatus {
                doc_id: doc_id.to_string(),
                status: other,
            }),
        }
    }

    async fn delete_document(&self, doc_id: &str) -> CouchResult<bool> {
        let Some(rev) = self.current_rev(doc_id).await? else {
            return Ok(false);
        };

        let response = self
            .request(Method::DELETE, doc_id)
            .query(&[("rev", rev)])
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                doc_id: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            other => Err(CouchDaoError::RequestStatus {
                doc_id: doc_id.to_string(),
                status: other,
            }),
        }
    }

    async fn all_docs(&self, prefix: &str, include_docs: bool) -> CouchResult<AllDocsResponse> {
        let (startkey, endkey) =
            prefix_range(prefix).map_err(|source| CouchDaoError::EncodeKey {
                prefix: prefix.to_string(),
                source,
            })?;
        let query = [
            ("include_docs", include_docs.to_string()),
            ("startkey", startkey),
            ("endkey", endkey),
        ];

        let response = self
            .request(Method::GET, ALL_DOCS)
            .query(&query)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                doc_id: ALL_DOCS.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(CouchDaoError::RequestStatus {
                doc_id: ALL_DOCS.to_string(),
                status: response.status(),
            });
        }

        response
            .json::<AllDocsResponse>()
            .await
            .map_err(|source| CouchDaoError::DecodeResponse {
                doc_id: ALL_DOCS.to_string(),
                source,
            })
    }

    async fn list_documents<T>(&self, prefix: &str) -> CouchResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let payload = self.all_docs(prefix, true).await?;

        let mut documents = Vec::new();
        for row in payload.rows {
            if let Some(doc) = row.doc {
                let parsed = from_value(doc).map_err(|source| CouchDaoError::DeserializeValue {
                    doc_id: row.id,
                    source,
                })?;
                documents.push(parsed);
            }
        }

        Ok(documents)
    }

    async fn list_cells(&self, game_id: String) -> CouchResult<Vec<CellEntity>> {
        let docs = self
            .list_documents::<CouchCellDocument>(&cell_prefix(&game_id))
            .await?;
        // A game id may itself contain the separator, so the prefix range can
        // overlap another game's cells.
        Ok(docs
            .into_iter()
            .map(|doc| doc.cell)
            .filter(|cell| cell.game_id == game_id)
            .collect())
    }
}

impl GameStore for CouchGameStore {
    fn find_game(&self, id: String) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let doc = store
                .get_document::<CouchGameDocument>(&game_doc_id(&id))
                .await?;
            Ok(doc.map(Into::into))
        })
    }

    fn put_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let doc_id = game_doc_id(&game.id);
            let rev = store.current_rev(&doc_id).await?;
            let doc = CouchGameDocument::from((game, rev));
            store.put_document(&doc_id, &doc).await.map_err(Into::into)
        })
    }

    fn delete_game(&self, id: String) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .delete_document(&game_doc_id(&id))
                .await
                .map_err(Into::into)
        })
    }

    fn find_cell(
        &self,
        game_id: String,
        row: u8,
        col: u8,
    ) -> BoxFuture<'static, StorageResult<Option<CellEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let doc = store
                .get_document::<CouchCellDocument>(&cell_doc_id(&game_id, row, col))
                .await?;
            Ok(doc.map(|doc| doc.cell))
        })
    }

    fn list_cells(&self, game_id: String) -> BoxFuture<'static, StorageResult<Vec<CellEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_cells(game_id).await.map_err(Into::into) })
    }

    fn put_cell(&self, cell: CellEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let doc_id = cell_doc_id(&cell.game_id, cell.row, cell.col);
            let rev = store.current_rev(&doc_id).await?;
            let doc = CouchCellDocument::from((cell, rev));
            store.put_document(&doc_id, &doc).await.map_err(Into::into)
        })
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
                .delete_document(&cell_doc_id(&game_id, row, col))
                .await
                .map_err(Into::into)
        })
    }

    fn list_game_ids(&self) -> BoxFuture<'static, StorageResult<Vec<String>>> {
        let store = self.clone();
        Box::pin(async move {
            let payload = store.all_docs(GAME_PREFIX, false).await?;
            Ok(payload
                .rows
                .into_iter()
                .filter_map(|row| row.id.strip_prefix(GAME_PREFIX).map(str::to_owned))
                .collect())
        })
    }

    fn count_cells(&self) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move {
            let payload = store.all_docs(CELL_PREFIX, false).await?;
            Ok(payload.rows.len() as u64)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let url = (*store.database_url).clone();
            let response = store
                .with_auth(store.client.get(url.clone()))
                .send()
                .await
                .map_err(|source| CouchDaoError::RequestSend {
                    doc_id: url.to_string(),
                    source,
                })?;

            if response.status().is_success() {
                Ok(())
            } else {
                Err(CouchDaoError::RequestStatus {
                    doc_id: url.to_string(),
                    status: response.status(),
                }
                .into())
            }
        })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_database().await.map_err(Into::into) })
    }
}
