use libsql::{Builder, Connection};
use std::sync::Arc;

use crate::config::DatabaseConfig;
use crate::error::Result;

use super::schema;

/// Where the database lives, derived from the configured URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Location<'a> {
    Remote { url: &'a str },
    Replica { url: &'a str, local_path: &'a str },
    Memory,
    File { path: &'a str },
}

impl<'a> Location<'a> {
    fn from_config(config: &'a DatabaseConfig) -> Self {
        let url = config.url.as_str();
        if url.starts_with("libsql://") || url.starts_with("https://") {
            match config.local_path.as_deref() {
                Some(local_path) => Self::Replica { url, local_path },
                None => Self::Remote { url },
            }
        } else if url == ":memory:" {
            Self::Memory
        } else {
            Self::File {
                path: url.strip_prefix("file:").unwrap_or(url),
            }
        }
    }
}

#[derive(Clone)]
pub struct Database {
    db: Arc<libsql::Database>,
    /// Per-connection pragmas; empty for remote databases.
    pragmas: Arc<Vec<String>>,
}

impl Database {
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let token = config.auth_token.clone().unwrap_or_default();
        let location = Location::from_config(config);

        let db = match location {
            Location::Replica { url, local_path } => {
                Builder::new_remote_replica(local_path, url.to_string(), token)
                    .build()
                    .await?
            }
            Location::Remote { url } => Builder::new_remote(url.to_string(), token).build().await?,
            Location::Memory => Builder::new_local(":memory:").build().await?,
            Location::File { path } => Builder::new_local(path).build().await?,
        };

        let pragmas = match location {
            Location::Remote { .. } => Vec::new(),
            _ => vec![
                format!("PRAGMA busy_timeout = {}", config.busy_timeout_ms),
                format!("PRAGMA synchronous = {}", normalize_synchronous(&config.synchronous)),
            ],
        };

        let database = Self {
            db: Arc::new(db),
            pragmas: Arc::new(pragmas),
        };

        let conn = database.connect().await?;
        if !matches!(location, Location::Remote { .. }) {
            let journal_mode =
                format!("PRAGMA journal_mode = {}", normalize_journal_mode(&config.journal_mode));
            if let Err(error) = conn.execute_batch(&journal_mode).await {
                tracing::warn!(pragma = %journal_mode, error = %error, "Failed to apply SQLite pragma");
            }
        }
        schema::init_schema(&conn).await?;

        tracing::debug!(location = ?location, "Database ready");
        Ok(database)
    }

    /// Open a connection with the busy timeout and synchronous mode applied.
    pub async fn connect(&self) -> Result<Connection> {
        let conn = self.db.connect()?;
        for pragma in self.pragmas.iter() {
            if let Err(error) = conn.execute_batch(pragma).await {
                tracing::warn!(pragma = %pragma, error = %error, "Failed to apply SQLite pragma");
            }
        }
        Ok(conn)
    }

    pub async fn sync(&self) -> Result<()> {
        if let Ok(sync) = self.db.sync().await {
            tracing::info!("Database synced: {:?}", sync);
        }
        Ok(())
    }
}

fn normalize_journal_mode(value: &str) -> &'static str {
    match value.trim().to_uppercase().as_str() {
        "DELETE" => "DELETE",
        "TRUNCATE" => "TRUNCATE",
        "PERSIST" => "PERSIST",
        "MEMORY" => "MEMORY",
        "OFF" => "OFF",
        _ => "WAL",
    }
}

fn normalize_synchronous(value: &str) -> &'static str {
    match value.trim().to_uppercase().as_str() {
        "OFF" => "OFF",
        "FULL" => "FULL",
        "EXTRA" => "EXTRA",
        _ => "NORMAL",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_location_parsing() {
        let mut config = DatabaseConfig::local("/tmp/mohe.db");
        assert_eq!(
            Location::from_config(&config),
            Location::File {
                path: "/tmp/mohe.db"
            }
        );

        config.url = ":memory:".to_string();
        assert_eq!(Location::from_config(&config), Location::Memory);

        config.url = "libsql://mohe.turso.io".to_string();
        assert_eq!(
            Location::from_config(&config),
            Location::Remote {
                url: "libsql://mohe.turso.io"
            }
        );

        config.local_path = Some("replica.db".to_string());
        assert_eq!(
            Location::from_config(&config),
            Location::Replica {
                url: "libsql://mohe.turso.io",
                local_path: "replica.db"
            }
        );
    }

    #[test]
    fn test_pragma_normalisation() {
        assert_eq!(normalize_journal_mode("delete"), "DELETE");
        assert_eq!(normalize_journal_mode("bogus"), "WAL");
        assert_eq!(normalize_synchronous(" full "), "FULL");
        assert_eq!(normalize_synchronous(""), "NORMAL");
    }

    #[tokio::test]
    async fn test_new_creates_schema_in_file() {
        let temp_file = NamedTempFile::new().unwrap();
        let config = DatabaseConfig::local(temp_file.path().to_str().unwrap());

        let db = Database::new(&config).await.unwrap();
        let conn = db.connect().await.unwrap();
        let mut rows = conn
            .query(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'place_similarity'",
                (),
            )
            .await
            .unwrap();
        assert!(rows.next().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_every_connection_gets_busy_timeout() {
        let temp_file = NamedTempFile::new().unwrap();
        let mut config = DatabaseConfig::local(temp_file.path().to_str().unwrap());
        config.busy_timeout_ms = 4321;
        let db = Database::new(&config).await.unwrap();

        for _ in 0..2 {
            let conn = db.connect().await.unwrap();
            let mut rows = conn.query("PRAGMA busy_timeout", ()).await.unwrap();
            let row = rows.next().await.unwrap().unwrap();
            assert_eq!(row.get::<i64>(0).unwrap(), 4321);
        }
    }
}
