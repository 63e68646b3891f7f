// src/storage/sqlite.rs

//! SQLite-backed registration store.
//!
//! ## Schema
//!
//! ```text
//! chats
//! ├── id            TEXT PRIMARY KEY
//! ├── groupme_id    TEXT     ┐ UNIQUE
//! ├── env           TEXT     ┘
//! ├── building_id   INTEGER  (indexed with env)
//! ├── floor_number  INTEGER
//! └── created_at    TEXT     (RFC 3339)
//! ```
//!
//! rusqlite is synchronous, so every call runs on the blocking pool while
//! holding the connection mutex.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};

use crate::error::{AppError, Result};
use crate::models::{BuildingId, ChatRegistration};
use crate::storage::{ChatStore, StoreConnector};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS chats (
    id           TEXT PRIMARY KEY,
    groupme_id   TEXT NOT NULL,
    building_id  INTEGER NOT NULL,
    floor_number INTEGER NOT NULL,
    env          TEXT NOT NULL,
    created_at   TEXT NOT NULL,
    UNIQUE (groupme_id, env)
);
CREATE INDEX IF NOT EXISTS idx_chats_building_env ON chats (building_id, env);
";

const COLUMNS: &str = "id, groupme_id, building_id, floor_number, env, created_at";

/// Durable store over a single SQLite file.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (creating if needed) the database file and apply the schema.
    ///
    /// The parent directory must already exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() && !parent.is_dir() => {
                return Err(AppError::config(format!(
                    "database directory does not exist: {}",
                    parent.display()
                )));
            }
            _ => {}
        }
        Self::with_connection(Connection::open(path)?)
    }

    /// In-memory SQLite database, for tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a closure against the connection on the blocking pool.
    async fn call<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| AppError::internal("registry connection lock poisoned"))?;
            f(&guard).map_err(AppError::from)
        })
        .await
        .map_err(AppError::internal)?
    }
}

fn row_to_chat(row: &Row<'_>) -> rusqlite::Result<ChatRegistration> {
    Ok(ChatRegistration {
        id: row.get(0)?,
        chat_id: row.get(1)?,
        building_id: row.get(2)?,
        floor_number: row.get(3)?,
        env: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn select_one(
    conn: &Connection,
    chat_id: &str,
    env: &str,
) -> rusqlite::Result<Option<ChatRegistration>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM chats WHERE groupme_id = ?1 AND env = ?2"),
        params![chat_id, env],
        row_to_chat,
    )
    .optional()
}

#[async_trait]
impl ChatStore for SqliteStore {
    async fn find(&self, chat_id: &str, env: &str) -> Result<Option<ChatRegistration>> {
        let (chat_id, env) = (chat_id.to_string(), env.to_string());
        self.call(move |conn| select_one(conn, &chat_id, &env)).await
    }

    async fn insert(&self, chat: ChatRegistration) -> Result<ChatRegistration> {
        self.call(move |conn| {
            conn.execute(
                &format!(
                    "INSERT INTO chats ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT (groupme_id, env) DO NOTHING"
                ),
                params![
                    chat.id,
                    chat.chat_id,
                    chat.building_id,
                    chat.floor_number,
                    chat.env,
                    chat.created_at,
                ],
            )?;
            select_one(conn, &chat.chat_id, &chat.env)?
                .ok_or(rusqlite::Error::QueryReturnedNoRows)
        })
        .await
    }

    async fn list_by_buildings(
        &self,
        building_ids: &[BuildingId],
        env: &str,
    ) -> Result<Vec<ChatRegistration>> {
        if building_ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; building_ids.len()].join(", ");
        let sql = format!(
            "SELECT {COLUMNS} FROM chats WHERE env = ? AND building_id IN ({placeholders})
             ORDER BY building_id, floor_number, groupme_id"
        );
        let mut values = vec![Value::Text(env.to_string())];
        values.extend(building_ids.iter().map(|id| Value::Integer(i64::from(*id))));

        self.call(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let chats = stmt
                .query_map(params_from_iter(values.iter()), row_to_chat)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(chats)
        })
        .await
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}

/// Opens a [`SqliteStore`] at a fixed path.
#[derive(Debug, Clone)]
pub struct SqliteConnector {
    path: PathBuf,
}

impl SqliteConnector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl StoreConnector for SqliteConnector {
    async fn connect(&self) -> Result<Arc<dyn ChatStore>> {
        let path = self.path.clone();
        let store = tokio::task::spawn_blocking(move || SqliteStore::open(path))
            .await
            .map_err(AppError::internal)??;
        log::info!("Connected to chat registry at {}", self.path.display());
        Ok(Arc::new(store))
    }

    fn describe(&self) -> String {
        format!("sqlite:{}", self.path.display())
    }
}
