use super::error::{CouchDaoError, CouchResult};

const DEFAULT_DATABASE: &str = "tictactoe";

/// Where the CouchDB store lives and how to authenticate against it.
#[derive(Debug, Clone)]
pub struct CouchConfig {
    pub base_url: String,
    pub database: String,
    /// Basic-auth pair; only used when both halves are present.
    pub credentials: Option<(String, String)>,
}

impl CouchConfig {
    /// Read `COUCH_BASE_URL` (required), `COUCH_DB` and the optional
    /// `COUCH_USERNAME` / `COUCH_PASSWORD` pair from the environment.
    pub fn from_env() -> CouchResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> CouchResult<Self> {
        let base_url = lookup("COUCH_BASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or(CouchDaoError::MissingEnvVar {
                var: "COUCH_BASE_URL",
            })?;
        let database = lookup("COUCH_DB")
            .filter(|db| !db.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATABASE.to_owned());
        let credentials = lookup("COUCH_USERNAME").zip(lookup("COUCH_PASSWORD"));

        Ok(Self {
            base_url,
            database,
            credentials,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup<'a>(vars: &'a HashMap<&str, &str>) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| vars.get(key).map(|value| value.to_string())
    }

    #[test]
    fn defaults_database_and_skips_half_credentials() {
        let vars = HashMap::from([
            ("COUCH_BASE_URL", "http://localhost:5984"),
            ("COUCH_USERNAME", "admin"),
        ]);
        let config = CouchConfig::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(config.database, DEFAULT_DATABASE);
        assert!(config.credentials.is_none());
    }

    #[test]
    fn base_url_is_required() {
        let vars = HashMap::from([("COUCH_DB", "games")]);
        assert!(matches!(
            CouchConfig::from_lookup(lookup(&vars)),
            Err(CouchDaoError::MissingEnvVar { var: "COUCH_BASE_URL" })
        ));
    }
}
