//! SQLite-backed persistence collaborator.
//!
//! Provides persistent storage for:
//! - Rated work sessions, per user
//! - Per-user preference documents (merged on save)

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::{CoreError, DatabaseError, PersistenceError};
use crate::persistence::{CompletedSessionRecord, PersistenceService, Preferences, UserId};

/// Default number of sessions returned by [`Database::recent_sessions`].
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    pub id: String,
    pub user_id: String,
    pub session_type: String,
    pub duration_secs: u64,
    pub rating: Option<u8>,
    pub completed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// SQLite database for rated sessions and preferences.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open the database at `<data dir>/pomobot.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("pomobot.db");
        Ok(Self::open_at(&path)?)
    }

    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, DatabaseError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, DatabaseError> {
        migrate(&conn).map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, DatabaseError> {
        self.conn
            .lock()
            .map_err(|_| DatabaseError::QueryFailed("connection mutex poisoned".into()))
    }

    /// Insert a rated session and return its generated id.
    pub fn record_session(
        &self,
        user: &UserId,
        record: &CompletedSessionRecord,
    ) -> Result<String, DatabaseError> {
        let id = uuid::Uuid::new_v4().to_string();
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO sessions (id, user_id, session_type, duration_secs, rating, completed_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id,
                user.as_str(),
                record.session_type.as_str(),
                record.duration_secs,
                record.rating.map(|r| r.value()),
                record.completed_at.to_rfc3339(),
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(id)
    }

    /// Sessions of `user`, newest first.
    pub fn recent_sessions(
        &self,
        user: &UserId,
        limit: usize,
    ) -> Result<Vec<StoredSession>, DatabaseError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, session_type, duration_secs, rating, completed_at, created_at
             FROM sessions
             WHERE user_id = ?1
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![user.as_str(), limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, u64>(3)?,
                row.get::<_, Option<u8>>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
            ))
        })?;

        let mut sessions = Vec::new();
        for row in rows {
            let (id, user_id, session_type, duration_secs, rating, completed_at, created_at) = row?;
            sessions.push(StoredSession {
                id,
                user_id,
                session_type,
                duration_secs,
                rating,
                completed_at: parse_timestamp(&completed_at)?,
                created_at: parse_timestamp(&created_at)?,
            });
        }
        Ok(sessions)
    }

    pub fn preferences(&self, user: &UserId) -> Result<Option<Preferences>, PersistenceError> {
        let conn = self.lock()?;
        read_preferences(&conn, user)
    }

    /// Merge `prefs` into the stored document for `user`.
    ///
    /// The read and the upsert share one guard and one transaction, so
    /// concurrent saves never drop each other's fields.
    pub fn store_preferences(
        &self,
        user: &UserId,
        prefs: &Preferences,
    ) -> Result<(), PersistenceError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut merged = read_preferences(&tx, user)?.unwrap_or_default();
        merged.merge(prefs);
        let document = serde_json::to_string(&merged)?;
        tx.execute(
            "INSERT INTO preferences (user_id, document, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET document = excluded.document, updated_at = excluded.updated_at",
            params![user.as_str(), document, Utc::now().to_rfc3339()],
        )?;
        tx.commit()?;
        Ok(())
    }
}

fn read_preferences(conn: &Connection, user: &UserId) -> Result<Option<Preferences>, PersistenceError> {
    let doc: Option<String> = conn
        .query_row(
            "SELECT document FROM preferences WHERE user_id = ?1",
            params![user.as_str()],
            |row| row.get(0),
        )
        .optional()?;
    match doc {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

fn migrate(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS sessions (
            id            TEXT PRIMARY KEY,
            user_id       TEXT NOT NULL,
            session_type  TEXT NOT NULL,
            duration_secs INTEGER NOT NULL,
            rating        INTEGER,
            completed_at  TEXT NOT NULL,
            created_at    TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS preferences (
            user_id    TEXT PRIMARY KEY,
            document   TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_sessions_user_created ON sessions(user_id, created_at);",
    )
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::QueryFailed(format!("bad timestamp '{raw}': {e}")))
}

#[async_trait]
impl PersistenceService for Database {
    async fn load_preferences(&self, user: &UserId) -> Result<Option<Preferences>, PersistenceError> {
        self.preferences(user)
    }

    async fn save_preferences(
        &self,
        user: &UserId,
        prefs: &Preferences,
    ) -> Result<(), PersistenceError> {
        self.store_preferences(user, prefs)
    }

    async fn save_completed_session(
        &self,
        user: &UserId,
        record: CompletedSessionRecord,
    ) -> Result<String, PersistenceError> {
        Ok(self.record_session(user, &record)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::Rating;

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    #[test]
    fn record_and_list_sessions() {
        let db = Database::open_memory().unwrap();
        let ana = user("ana");
        let first = CompletedSessionRecord::work(1500, Rating::try_from(4).ok(), Utc::now());
        let second = CompletedSessionRecord::work(1800, None, Utc::now());
        let id1 = db.record_session(&ana, &first).unwrap();
        let id2 = db.record_session(&ana, &second).unwrap();
        db.record_session(&user("bo"), &first).unwrap();

        let sessions = db.recent_sessions(&ana, DEFAULT_HISTORY_LIMIT).unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].id, id2);
        assert_eq!(sessions[1].id, id1);
        assert_eq!(sessions[1].rating, Some(4));
        assert_eq!(sessions[0].rating, None);
        assert_eq!(sessions[1].session_type, "work");
        assert_eq!(sessions[1].duration_secs, 1500);
    }

    #[test]
    fn history_respects_limit() {
        let db = Database::open_memory().unwrap();
        let ana = user("ana");
        for _ in 0..5 {
            db.record_session(&ana, &CompletedSessionRecord::work(60, None, Utc::now()))
                .unwrap();
        }
        assert_eq!(db.recent_sessions(&ana, 3).unwrap().len(), 3);
    }

    #[test]
    fn preferences_merge_on_save() {
        let db = Database::open_memory().unwrap();
        let ana = user("ana");
        assert!(db.preferences(&ana).unwrap().is_none());

        db.store_preferences(
            &ana,
            &Preferences {
                work_duration_min: Some(30),
                dark_mode: Some(false),
                ..Preferences::default()
            },
        )
        .unwrap();
        db.store_preferences(
            &ana,
            &Preferences {
                break_duration_min: Some(10),
                ..Preferences::default()
            },
        )
        .unwrap();

        let prefs = db.preferences(&ana).unwrap().unwrap();
        assert_eq!(prefs.work_duration_min, Some(30));
        assert_eq!(prefs.break_duration_min, Some(10));
        assert_eq!(prefs.dark_mode, Some(false));
        assert_eq!(prefs.audio_enabled, None);
    }

    #[test]
    fn concurrent_saves_keep_every_field() {
        let db = Database::open_memory().unwrap();
        let ana = user("ana");
        std::thread::scope(|scope| {
            for round in 0..20u32 {
                let (db, ana) = (&db, &ana);
                scope.spawn(move || {
                    let prefs = if round % 2 == 0 {
                        Preferences {
                            work_duration_min: Some(30),
                            ..Preferences::default()
                        }
                    } else {
                        Preferences {
                            dark_mode: Some(false),
                            ..Preferences::default()
                        }
                    };
                    db.store_preferences(ana, &prefs).unwrap();
                });
            }
        });

        let prefs = db.preferences(&ana).unwrap().unwrap();
        assert_eq!(prefs.work_duration_min, Some(30));
        assert_eq!(prefs.dark_mode, Some(false));
    }

    #[test]
    fn open_at_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pomobot.db");
        let db = Database::open_at(&path).unwrap();
        db.record_session(&user("ana"), &CompletedSessionRecord::work(60, None, Utc::now()))
            .unwrap();
        drop(db);
        let reopened = Database::open_at(&path).unwrap();
        assert_eq!(reopened.recent_sessions(&user("ana"), 10).unwrap().len(), 1);
    }
}
