//! Local persistence of fetched documents.
//!
//! Snapshots keep the exact document the provider returned; a [`CacheSink`]
//! stores that document under a caller-chosen name so later runs can replay
//! it instead of querying the API again. Nothing here reshapes the document:
//! what is read back equals what was written.

use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use chrono::Utc;
use log::{info, warn};
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;
use walkdir::WalkDir;

use crate::{error::Result, provider::InMemoryProvider};

/// Somewhere a named document can be written to.
pub trait CacheSink {
    fn write(&self, name: &str, document: &Value) -> Result<()>;
}

/// Writes each document as a pretty-printed JSON file below `root`.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    root: PathBuf,
}

impl JsonFileSink {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl CacheSink for JsonFileSink {
    fn write(&self, name: &str, document: &Value) -> Result<()> {
        let path = self.path_for(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(&mut writer, document)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        info!("cached document at {}", path.display());
        Ok(())
    }
}

/// Reads back a document written by [`JsonFileSink`].
pub fn load_document(path: impl AsRef<Path>) -> Result<Value> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    Ok(serde_json::from_reader(reader)?)
}

/// Builds a provider answering from every `*.json` document below `root`.
///
/// Files that are not list responses are skipped with a warning. A missing
/// `root` yields an empty provider.
pub fn replay_directory(root: impl AsRef<Path>) -> Result<InMemoryProvider> {
    let root = root.as_ref();
    let mut provider = InMemoryProvider::new();
    if !root.exists() {
        warn!("replay directory {} does not exist", root.display());
        return Ok(provider);
    }

    for entry in WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
    {
        if entry.path().extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }
        let document = load_document(entry.path())?;
        match provider.insert_cached(&document) {
            Some(kind) => info!("replaying {kind} document {}", entry.path().display()),
            None => warn!("skipping {}: not a list response", entry.path().display()),
        }
    }
    Ok(provider)
}

/// SQLite-backed document cache: one row per name, replaced on rewrite.
#[derive(Debug)]
pub struct DocumentStore {
    conn: Connection,
}

impl DocumentStore {
    /// Opens (and if necessary creates) the database and its table. WAL mode
    /// keeps readers from blocking the writer.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        let store = Self { conn };
        store.ensure_tables()?;
        Ok(store)
    }

    fn ensure_tables(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                name TEXT PRIMARY KEY,
                body TEXT NOT NULL,
                stored_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Option<Value>> {
        let body: Option<String> = self
            .conn
            .query_row(
                "SELECT body FROM documents WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;

        match body {
            Some(body) => Ok(Some(serde_json::from_str(&body)?)),
            None => Ok(None),
        }
    }

    /// Names of all stored documents with their RFC 3339 write time, most
    /// recent first.
    pub fn list(&self) -> Result<Vec<(String, String)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, stored_at FROM documents ORDER BY stored_at DESC, name ASC")?;
        let mut rows = stmt.query([])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push((row.get(0)?, row.get(1)?));
        }
        Ok(entries)
    }

    /// Builds a provider answering from every stored document.
    pub fn replay(&self) -> Result<InMemoryProvider> {
        let mut provider = InMemoryProvider::new();
        for (name, _) in self.list()? {
            let Some(document) = self.get(&name)? else {
                continue;
            };
            match provider.insert_cached(&document) {
                Some(kind) => info!("replaying {kind} document {name}"),
                None => warn!("skipping stored document {name}: not a list response"),
            }
        }
        Ok(provider)
    }
}

impl CacheSink for DocumentStore {
    fn write(&self, name: &str, document: &Value) -> Result<()> {
        let body = serde_json::to_string(document)?;
        self.conn.execute(
            r#"
            INSERT INTO documents (name, body, stored_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(name) DO UPDATE SET
                body = excluded.body,
                stored_at = excluded.stored_at
            "#,
            params![name, body, Utc::now().to_rfc3339()],
        )?;
        info!("cached document {name} in metadata store");
        Ok(())
    }
}
