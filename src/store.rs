use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use chrono::Utc;
use color_eyre::eyre::{Context, Result, eyre};
use rusqlite::{Connection, OptionalExtension, params};

use crate::{log_util::log_debug, output_manager::OutputManager, review::AnsweredRecord};

const DATABASE_FILENAME: &str = "stagequiz.sqlite";

pub const USERNAME_KEY: &str = "quiz_username";
pub const PROGRESS_KEY: &str = "quiz_progress";
const ANSWERS_KEY_PREFIX: &str = "answers_";

/// Completed stage numbers per topic file key.
pub type StageProgress = BTreeMap<String, BTreeSet<u8>>;

pub fn answers_key(topic: &str) -> String {
    format!("{ANSWERS_KEY_PREFIX}{topic}")
}

/// Minimal string key-value backend.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, keys: &[&str]) -> Result<()>;
}

/// SQLite-backed store. A connection is opened per call so the handle can be
/// moved freely between threads.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db_path: PathBuf,
}

impl SqliteStore {
    /// Open (and if needed create) the store in the configured output directory.
    pub fn open_default() -> Result<Self> {
        let db_path = OutputManager::new()
            .artifact_path(DATABASE_FILENAME)
            .map_err(|err| eyre!(err))?;
        Self::open_at(db_path)
    }

    pub fn open_at<P: Into<PathBuf>>(db_path: P) -> Result<Self> {
        let store = Self {
            db_path: db_path.into(),
        };
        let connection = connection_for_path(&store.db_path)?;
        initialize_schema(&connection)?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn connection(&self) -> Result<Connection> {
        connection_for_path(&self.db_path)
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let connection = self.connection()?;
        connection
            .query_row(
                "SELECT value FROM kv_entries WHERE key = ?1",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .wrap_err_with(|| format!("failed to read key {key} from store"))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let connection = self.connection()?;
        connection
            .execute(
                "INSERT INTO kv_entries (key, value, updated_at) VALUES (?1, ?2, ?3)
                ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value, Utc::now().to_rfc3339()],
            )
            .wrap_err_with(|| format!("failed to write key {key} to store"))?;
        Ok(())
    }

    fn remove(&self, keys: &[&str]) -> Result<()> {
        let mut connection = self.connection()?;
        let transaction = connection
            .transaction()
            .wrap_err("failed to start transaction for key removal")?;
        for key in keys {
            transaction
                .execute("DELETE FROM kv_entries WHERE key = ?1", [key])
                .wrap_err_with(|| format!("failed to remove key {key} from store"))?;
        }
        transaction
            .commit()
            .wrap_err("failed to commit key removal")?;
        Ok(())
    }
}

/// Process-local store used when the database cannot be opened, and in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| eyre!("memory store lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| eyre!("memory store lock poisoned"))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, keys: &[&str]) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| eyre!("memory store lock poisoned"))?;
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }
}

/// Username and progress as read at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileSnapshot {
    pub username: Option<String>,
    pub progress: StageProgress,
}

/// Typed access to the quiz records. Every failure is logged and degrades to an
/// empty value or a no-op; callers never observe a storage error.
#[derive(Clone)]
pub struct PersistentStore {
    backend: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for PersistentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistentStore").finish_non_exhaustive()
    }
}

impl PersistentStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// SQLite store in the output directory, or an in-memory store if that fails.
    pub fn open_default() -> Self {
        match SqliteStore::open_default() {
            Ok(store) => {
                log_debug(&format!("Store: opened {}", store.path().display()));
                Self::new(Arc::new(store))
            }
            Err(err) => {
                log_debug(&format!(
                    "Store: falling back to in-memory storage: {:#}",
                    err
                ));
                Self::in_memory()
            }
        }
    }

    pub fn get_username(&self) -> Option<String> {
        match self.backend.get(USERNAME_KEY) {
            Ok(name) => name,
            Err(err) => {
                log_debug(&format!("Store: error fetching username: {:#}", err));
                None
            }
        }
    }

    pub fn save_username(&self, username: &str) {
        if let Err(err) = self.backend.set(USERNAME_KEY, username) {
            log_debug(&format!("Store: error saving username: {:#}", err));
        }
    }

    pub fn get_all_progress(&self) -> StageProgress {
        match self.read_progress() {
            Ok(progress) => progress,
            Err(err) => {
                log_debug(&format!("Store: error fetching progress: {:#}", err));
                StageProgress::new()
            }
        }
    }

    /// Replace the completed stages of `topic`, leaving other topics untouched.
    pub fn save_progress(&self, topic: &str, completed_stages: &BTreeSet<u8>) {
        let result = self.read_progress().and_then(|mut progress| {
            progress.insert(topic.to_string(), completed_stages.clone());
            let serialized =
                serde_json::to_string(&progress).wrap_err("failed to serialise progress")?;
            self.backend.set(PROGRESS_KEY, &serialized)
        });
        if let Err(err) = result {
            log_debug(&format!("Store: error saving progress: {:#}", err));
        }
    }

    pub fn get_progress_by_topic(&self, topic: &str) -> BTreeSet<u8> {
        self.get_all_progress().remove(topic).unwrap_or_default()
    }

    /// Remove the username and progress records.
    pub fn clear_all_progress(&self) {
        match self.backend.remove(&[USERNAME_KEY, PROGRESS_KEY]) {
            Ok(()) => log_debug("Store: cleared quiz_username and quiz_progress keys"),
            Err(err) => log_debug(&format!("Store: error clearing data: {:#}", err)),
        }
    }

    pub fn save_answers(&self, topic: &str, records: &[AnsweredRecord]) {
        let result = serde_json::to_string(records)
            .wrap_err("failed to serialise answers")
            .and_then(|serialized| self.backend.set(&answers_key(topic), &serialized));
        if let Err(err) = result {
            log_debug(&format!(
                "Store: failed to save answers for {}: {:#}",
                topic, err
            ));
        }
    }

    pub fn load_answers(&self, topic: &str) -> Vec<AnsweredRecord> {
        let result = self.backend.get(&answers_key(topic)).and_then(|stored| {
            match stored {
                Some(json) => serde_json::from_str(&json).wrap_err("failed to parse answers"),
                None => Ok(Vec::new()),
            }
        });
        match result {
            Ok(records) => records,
            Err(err) => {
                log_debug(&format!(
                    "Store: failed to load review data for {}: {:#}",
                    topic, err
                ));
                Vec::new()
            }
        }
    }

    pub fn load_snapshot(&self) -> ProfileSnapshot {
        ProfileSnapshot {
            username: self.get_username(),
            progress: self.get_all_progress(),
        }
    }

    fn read_progress(&self) -> Result<StageProgress> {
        match self.backend.get(PROGRESS_KEY)? {
            Some(json) => serde_json::from_str(&json).wrap_err("failed to parse stored progress"),
            None => Ok(StageProgress::new()),
        }
    }
}

fn initialize_schema(connection: &Connection) -> Result<()> {
    connection
        .execute(
            "CREATE TABLE IF NOT EXISTS kv_entries (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )
        .wrap_err("failed to create kv_entries table")?;
    Ok(())
}

fn connection_for_path(db_path: &Path) -> Result<Connection> {
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent).wrap_err_with(|| {
            format!(
                "failed to create directory for quiz store at {}",
                parent.display()
            )
        })?;
    }

    Connection::open(db_path)
        .wrap_err_with(|| format!("failed to open quiz store at {}", db_path.display()))
}

#[cfg(test)]
pub(crate) struct FailingStore;

#[cfg(test)]
impl KeyValueStore for FailingStore {
    fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(eyre!("disk unavailable"))
    }

    fn set(&self, _key: &str, _value: &str) -> Result<()> {
        Err(eyre!("disk unavailable"))
    }

    fn remove(&self, _keys: &[&str]) -> Result<()> {
        Err(eyre!("disk unavailable"))
    }
}
