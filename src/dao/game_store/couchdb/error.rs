use reqwest::StatusCode;
use thiserror::Error;

pub type CouchResult<T> = Result<T, CouchDaoError>;

/// Failures raised while storing games and cells in CouchDB.
#[derive(Debug, Error)]
pub enum CouchDaoError {
    #[error("missing CouchDB environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    #[error("invalid CouchDB base URL `{url}`")]
    InvalidBaseUrl { url: String },
    #[error("failed to build CouchDB HTTP client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    /// The database could neither be found nor created.
    #[error("CouchDB database `{database}` unavailable (status {status})")]
    DatabaseStatus {
        database: String,
        status: StatusCode,
    },
    #[error("CouchDB request for `{doc_id}` could not be sent")]
    RequestSend {
        doc_id: String,
        #[source]
        source: reqwest::Error,
    },
    /// The document changed between reading its revision and writing it.
    #[error("CouchDB revision conflict on `{doc_id}`")]
    RevisionConflict { doc_id: String },
    #[error("CouchDB answered {status} for `{doc_id}`")]
    RequestStatus { doc_id: String, status: StatusCode },
    #[error("range key for prefix `{prefix}` could not be encoded")]
    EncodeKey {
        prefix: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("CouchDB response for `{doc_id}` is not valid JSON")]
    DecodeResponse {
        doc_id: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("CouchDB document `{doc_id}` does not match the game/cell layout")]
    DeserializeValue {
        doc_id: String,
        #[source]
        source: serde_json::Error,
    },
}
