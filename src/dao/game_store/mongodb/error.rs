use mongodb::error::Error as MongoError;
use thiserror::Error;

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("missing MongoDB environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to save game `{id}`")]
    SaveGame {
        id: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to load game `{id}`")]
    LoadGame {
        id: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to delete game `{id}`")]
    DeleteGame {
        id: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to save cell ({row},{col}) of game `{game_id}`")]
    SaveCell {
        game_id: String,
        row: u8,
        col: u8,
        #[source]
        source: MongoError,
    },
    #[error("failed to load cells of game `{game_id}`")]
    LoadCells {
        game_id: String,
        #[source]
        source: MongoError,
    },
    /// A stored cell carries coordinates no board can have.
    #[error("stored cell ({row},{col}) of game `{game_id}` lies outside the board")]
    CorruptCell { game_id: String, row: i32, col: i32 },
    #[error("failed to delete cell ({row},{col}) of game `{game_id}`")]
    DeleteCell {
        game_id: String,
        row: u8,
        col: u8,
        #[source]
        source: MongoError,
    },
    #[error("failed to list games")]
    ListGames {
        #[source]
        source: MongoError,
    },
    #[error("failed to count cells")]
    CountCells {
        #[source]
        source: MongoError,
    },
}
