// ABOUTME: SQLite persistence for sessions, session pointers, pairing codes, and the allow-set.
// ABOUTME: One store object constructed at startup and injected everywhere; row-level upserts.

use crate::error::{Error, Result};
use crate::traits::UserInfo;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Prefix marking a locally-generated session handle that has never been
/// acknowledged by the execution port. Never valid as a resume token.
pub const PLACEHOLDER_PREFIX: &str = "local-";

/// Mint a fresh placeholder handle
pub fn placeholder_handle() -> String {
    format!("{}{}", PLACEHOLDER_PREFIX, uuid::Uuid::new_v4())
}

/// Lifecycle state of a session row
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Idle,
    Closed,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Idle => write!(f, "idle"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "active" => Ok(Self::Active),
            "idle" => Ok(Self::Idle),
            "closed" => Ok(Self::Closed),
            other => Err(Error::Config(format!("Unknown session status: {}", other))),
        }
    }
}

/// One persisted agent conversation, unique on (chat_key, session_name)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub chat_key: String,
    pub session_name: String,
    /// Agent-session handle; a placeholder until the first turn completes
    pub handle: String,
    pub agent_id: String,
    /// Workspace the session was bound to at creation
    pub workspace: String,
    pub status: SessionStatus,
    pub created_at: String,
    pub last_active_at: String,
}

impl Session {
    /// Whether the stored handle is a local placeholder
    pub fn is_placeholder(&self) -> bool {
        self.handle.starts_with(PLACEHOLDER_PREFIX)
    }

    /// The handle to resume from, if the session has ever completed a turn
    pub fn resume_handle(&self) -> Option<&str> {
        if self.is_placeholder() {
            None
        } else {
            Some(&self.handle)
        }
    }
}

/// A pending pairing code awaiting operator approval
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairingRequest {
    pub code: String,
    pub chat_key: String,
    pub user: UserInfo,
    pub created_at: String,
    pub expires_at: String,
}

/// One allow-set row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllowlistEntry {
    pub chat_key: String,
    pub added_at: String,
    pub added_by: Option<String>,
}

/// Counts for status surfaces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    pub active: u32,
    pub total: u32,
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Row-level persistence for the bridge core.
///
/// Cheap to clone; all clones share one connection. Timestamps are UTC
/// RFC 3339 strings, so string order is time order.
#[derive(Clone)]
pub struct Store {
    db: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open (or create) the store in the given data directory
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        std::fs::create_dir_all(data_dir)
            .map_err(|e| Error::Config(format!("Failed to create data directory: {}", e)))?;

        let db_path = data_dir.join("bridge.db");
        let conn = Connection::open(&db_path)?;
        let store = Self::from_connection(conn)?;

        tracing::info!(db = %db_path.display(), "Store initialized");
        Ok(store)
    }

    /// In-memory store for tests
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS sessions (
                chat_key TEXT NOT NULL,
                session_name TEXT NOT NULL,
                handle TEXT NOT NULL,
                agent_id TEXT NOT NULL,
                workspace TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'active',
                created_at TEXT NOT NULL,
                last_active_at TEXT NOT NULL,
                PRIMARY KEY (chat_key, session_name)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS active_sessions (
                chat_key TEXT PRIMARY KEY,
                session_name TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS pairing_requests (
                code TEXT PRIMARY KEY,
                chat_key TEXT NOT NULL,
                user_id TEXT NOT NULL,
                username TEXT,
                display_name TEXT,
                platform TEXT NOT NULL,
                created_at TEXT NOT NULL,
                expires_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS allowlist (
                chat_key TEXT PRIMARY KEY,
                added_at TEXT NOT NULL,
                added_by TEXT
            )",
            [],
        )?;

        Ok(Store {
            db: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.db.lock().map_err(|_| Error::LockPoisoned)
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    fn row_to_session(row: &rusqlite::Row) -> rusqlite::Result<Session> {
        let status_str: String = row.get(5)?;
        let status = status_str.parse().map_err(|_| {
            rusqlite::Error::FromSqlConversionFailure(
                5,
                rusqlite::types::Type::Text,
                format!("Unknown session status: {}", status_str).into(),
            )
        })?;
        Ok(Session {
            chat_key: row.get(0)?,
            session_name: row.get(1)?,
            handle: row.get(2)?,
            agent_id: row.get(3)?,
            workspace: row.get(4)?,
            status,
            created_at: row.get(6)?,
            last_active_at: row.get(7)?,
        })
    }

    const SESSION_COLUMNS: &'static str =
        "chat_key, session_name, handle, agent_id, workspace, status, created_at, last_active_at";

    /// Get a session row if it exists
    pub fn get_session(&self, chat_key: &str, session_name: &str) -> Result<Option<Session>> {
        let db = self.conn()?;
        let mut stmt = db.prepare(&format!(
            "SELECT {} FROM sessions WHERE chat_key = ?1 AND session_name = ?2",
            Self::SESSION_COLUMNS
        ))?;

        match stmt.query_row(params![chat_key, session_name], Self::row_to_session) {
            Ok(s) => Ok(Some(s)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Return the existing row or insert a fresh one with a placeholder
    /// handle. Idempotent under retry: concurrent inserts on the same key
    /// collapse onto one row.
    pub fn get_or_create_session(
        &self,
        chat_key: &str,
        session_name: &str,
        agent_id: &str,
        workspace: &str,
    ) -> Result<Session> {
        if let Some(session) = self.get_session(chat_key, session_name)? {
            return Ok(session);
        }

        let now = now_rfc3339();
        let handle = placeholder_handle();
        {
            let db = self.conn()?;
            db.execute(
                "INSERT OR IGNORE INTO sessions
                     (chat_key, session_name, handle, agent_id, workspace, status, created_at, last_active_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 'active', ?6, ?6)",
                params![chat_key, session_name, handle, agent_id, workspace, now],
            )?;
        }

        tracing::info!(
            chat_key = %chat_key,
            session_name = %session_name,
            agent_id = %agent_id,
            "Session created"
        );

        self.get_session(chat_key, session_name)?
            .ok_or_else(|| Error::SessionNotFound(session_name.to_string()))
    }

    /// Persist the real handle the execution port returned for a turn.
    /// Upsert on the natural key; bumps last_active_at.
    pub fn record_handle(
        &self,
        chat_key: &str,
        session_name: &str,
        handle: &str,
        agent_id: &str,
    ) -> Result<()> {
        let now = now_rfc3339();
        let db = self.conn()?;
        db.execute(
            "INSERT INTO sessions
                 (chat_key, session_name, handle, agent_id, workspace, status, created_at, last_active_at)
             VALUES (?1, ?2, ?3, ?4, '', 'active', ?5, ?5)
             ON CONFLICT(chat_key, session_name) DO UPDATE SET
                handle = ?3,
                agent_id = ?4,
                status = 'active',
                last_active_at = ?5",
            params![chat_key, session_name, handle, agent_id, now],
        )?;

        tracing::debug!(
            chat_key = %chat_key,
            session_name = %session_name,
            "Session handle recorded"
        );
        Ok(())
    }

    /// Bump a session's last-active timestamp
    pub fn touch_session(&self, chat_key: &str, session_name: &str) -> Result<()> {
        let now = now_rfc3339();
        let db = self.conn()?;
        db.execute(
            "UPDATE sessions SET last_active_at = ?1 WHERE chat_key = ?2 AND session_name = ?3",
            params![now, chat_key, session_name],
        )?;
        Ok(())
    }

    /// All sessions for a conversation, most recently active first
    pub fn list_sessions(&self, chat_key: &str) -> Result<Vec<Session>> {
        let db = self.conn()?;
        let mut stmt = db.prepare(&format!(
            "SELECT {} FROM sessions WHERE chat_key = ?1 ORDER BY last_active_at DESC",
            Self::SESSION_COLUMNS
        ))?;
        let sessions = stmt
            .query_map(params![chat_key], Self::row_to_session)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(sessions)
    }

    /// Delete one named session. Returns whether a row existed.
    pub fn delete_session(&self, chat_key: &str, session_name: &str) -> Result<bool> {
        let db = self.conn()?;
        let deleted = db.execute(
            "DELETE FROM sessions WHERE chat_key = ?1 AND session_name = ?2",
            params![chat_key, session_name],
        )?;
        Ok(deleted > 0)
    }

    /// Delete every session for a conversation. Returns the row count.
    pub fn delete_all_sessions(&self, chat_key: &str) -> Result<usize> {
        let db = self.conn()?;
        let deleted = db.execute("DELETE FROM sessions WHERE chat_key = ?1", params![chat_key])?;
        tracing::info!(chat_key = %chat_key, deleted, "Sessions deleted");
        Ok(deleted)
    }

    /// Active/total session counts. A session counts as active when it saw
    /// a turn within the last hour.
    pub fn session_stats(&self) -> Result<SessionStats> {
        let cutoff = (chrono::Utc::now() - chrono::Duration::hours(1)).to_rfc3339();
        let db = self.conn()?;
        let total: u32 =
            db.query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?;
        let active: u32 = db.query_row(
            "SELECT COUNT(*) FROM sessions WHERE last_active_at >= ?1",
            params![cutoff],
            |row| row.get(0),
        )?;
        Ok(SessionStats { active, total })
    }

    // =========================================================================
    // Active session pointer
    // =========================================================================

    /// Which named session un-namespaced traffic targets; "main" if unset
    pub fn active_session_name(&self, chat_key: &str) -> Result<String> {
        let db = self.conn()?;
        let mut stmt =
            db.prepare("SELECT session_name FROM active_sessions WHERE chat_key = ?1")?;
        match stmt.query_row(params![chat_key], |row| row.get::<_, String>(0)) {
            Ok(name) => Ok(name),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                Ok(crate::chat_key::DEFAULT_SESSION.to_string())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Point un-namespaced traffic at a named session (upserts)
    pub fn set_active_session_name(&self, chat_key: &str, session_name: &str) -> Result<()> {
        let db = self.conn()?;
        db.execute(
            "INSERT INTO active_sessions (chat_key, session_name) VALUES (?1, ?2)
             ON CONFLICT(chat_key) DO UPDATE SET session_name = ?2",
            params![chat_key, session_name],
        )?;
        Ok(())
    }

    /// Drop the pointer, reverting to the "main" default
    pub fn clear_active_session(&self, chat_key: &str) -> Result<()> {
        let db = self.conn()?;
        db.execute(
            "DELETE FROM active_sessions WHERE chat_key = ?1",
            params![chat_key],
        )?;
        Ok(())
    }

    // =========================================================================
    // Pairing requests
    // =========================================================================

    fn row_to_pairing(row: &rusqlite::Row) -> rusqlite::Result<PairingRequest> {
        Ok(PairingRequest {
            code: row.get(0)?,
            chat_key: row.get(1)?,
            user: UserInfo {
                id: row.get(2)?,
                username: row.get(3)?,
                display_name: row.get(4)?,
                platform: row.get(5)?,
            },
            created_at: row.get(6)?,
            expires_at: row.get(7)?,
        })
    }

    const PAIRING_COLUMNS: &'static str =
        "code, chat_key, user_id, username, display_name, platform, created_at, expires_at";

    /// Insert a pairing request row
    pub fn insert_pairing(&self, request: &PairingRequest) -> Result<()> {
        let db = self.conn()?;
        db.execute(
            "INSERT INTO pairing_requests
                 (code, chat_key, user_id, username, display_name, platform, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                request.code,
                request.chat_key,
                request.user.id,
                request.user.username,
                request.user.display_name,
                request.user.platform,
                request.created_at,
                request.expires_at,
            ],
        )?;
        Ok(())
    }

    /// Fetch a pairing request by code, expired or not
    pub fn get_pairing(&self, code: &str) -> Result<Option<PairingRequest>> {
        let db = self.conn()?;
        let mut stmt = db.prepare(&format!(
            "SELECT {} FROM pairing_requests WHERE code = ?1",
            Self::PAIRING_COLUMNS
        ))?;
        match stmt.query_row(params![code], Self::row_to_pairing) {
            Ok(r) => Ok(Some(r)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a pairing request. Returns whether a row existed.
    pub fn delete_pairing(&self, code: &str) -> Result<bool> {
        let db = self.conn()?;
        let deleted = db.execute(
            "DELETE FROM pairing_requests WHERE code = ?1",
            params![code],
        )?;
        Ok(deleted > 0)
    }

    /// Remove rows past their expiry. Returns the reaped count.
    pub fn reap_expired_pairings(&self, now: &str) -> Result<usize> {
        let db = self.conn()?;
        let reaped = db.execute(
            "DELETE FROM pairing_requests WHERE expires_at <= ?1",
            params![now],
        )?;
        if reaped > 0 {
            tracing::debug!(reaped, "Expired pairing requests reaped");
        }
        Ok(reaped)
    }

    /// Unexpired pairing requests, oldest first
    pub fn list_pending_pairings(&self, now: &str) -> Result<Vec<PairingRequest>> {
        let db = self.conn()?;
        let mut stmt = db.prepare(&format!(
            "SELECT {} FROM pairing_requests WHERE expires_at > ?1 ORDER BY created_at ASC",
            Self::PAIRING_COLUMNS
        ))?;
        let requests = stmt
            .query_map(params![now], Self::row_to_pairing)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(requests)
    }

    /// The outstanding unexpired request for a conversation, if any
    pub fn pending_pairing_for(&self, chat_key: &str, now: &str) -> Result<Option<PairingRequest>> {
        let db = self.conn()?;
        let mut stmt = db.prepare(&format!(
            "SELECT {} FROM pairing_requests WHERE chat_key = ?1 AND expires_at > ?2
             ORDER BY created_at DESC LIMIT 1",
            Self::PAIRING_COLUMNS
        ))?;
        match stmt.query_row(params![chat_key, now], Self::row_to_pairing) {
            Ok(r) => Ok(Some(r)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    // =========================================================================
    // Allow-set
    // =========================================================================

    /// Add a conversation to the allow-set (upserts)
    pub fn allow_add(&self, chat_key: &str, added_by: Option<&str>) -> Result<()> {
        let now = now_rfc3339();
        let db = self.conn()?;
        db.execute(
            "INSERT INTO allowlist (chat_key, added_at, added_by) VALUES (?1, ?2, ?3)
             ON CONFLICT(chat_key) DO NOTHING",
            params![chat_key, now, added_by],
        )?;
        tracing::info!(chat_key = %chat_key, added_by = ?added_by, "Allow-set entry added");
        Ok(())
    }

    /// Remove a conversation from the allow-set. Returns whether a row existed.
    pub fn allow_remove(&self, chat_key: &str) -> Result<bool> {
        let db = self.conn()?;
        let removed = db.execute("DELETE FROM allowlist WHERE chat_key = ?1", params![chat_key])?;
        if removed > 0 {
            tracing::info!(chat_key = %chat_key, "Allow-set entry removed");
        }
        Ok(removed > 0)
    }

    /// Whether a conversation is in the allow-set
    pub fn allow_contains(&self, chat_key: &str) -> Result<bool> {
        let db = self.conn()?;
        let mut stmt = db.prepare("SELECT 1 FROM allowlist WHERE chat_key = ?1")?;
        Ok(stmt.exists(params![chat_key])?)
    }

    /// All allow-set entries, oldest first
    pub fn allow_list(&self) -> Result<Vec<AllowlistEntry>> {
        let db = self.conn()?;
        let mut stmt =
            db.prepare("SELECT chat_key, added_at, added_by FROM allowlist ORDER BY added_at ASC")?;
        let entries = stmt
            .query_map([], |row| {
                Ok(AllowlistEntry {
                    chat_key: row.get(0)?,
                    added_at: row.get(1)?,
                    added_by: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_inserts_placeholder() {
        let store = Store::open_in_memory().unwrap();
        let session = store
            .get_or_create_session("telegram:555", "main", "coder", "/srv/coder")
            .unwrap();

        assert!(session.is_placeholder());
        assert!(session.resume_handle().is_none());
        assert_eq!(session.agent_id, "coder");
        assert_eq!(session.status, SessionStatus::Active);
    }

    #[test]
    fn test_get_or_create_is_idempotent() {
        let store = Store::open_in_memory().unwrap();
        let first = store
            .get_or_create_session("telegram:555", "main", "coder", "/srv/coder")
            .unwrap();
        let second = store
            .get_or_create_session("telegram:555", "main", "coder", "/srv/coder")
            .unwrap();
        assert_eq!(first.handle, second.handle);
    }

    #[test]
    fn test_record_handle_makes_session_resumable() {
        let store = Store::open_in_memory().unwrap();
        store
            .get_or_create_session("telegram:555", "main", "coder", "/srv/coder")
            .unwrap();
        store
            .record_handle("telegram:555", "main", "real-handle-1", "coder")
            .unwrap();

        let session = store.get_session("telegram:555", "main").unwrap().unwrap();
        assert!(!session.is_placeholder());
        assert_eq!(session.resume_handle(), Some("real-handle-1"));
    }

    #[test]
    fn test_record_handle_upserts_missing_row() {
        let store = Store::open_in_memory().unwrap();
        store
            .record_handle("telegram:555", "main", "real-handle-1", "coder")
            .unwrap();
        let session = store.get_session("telegram:555", "main").unwrap().unwrap();
        assert_eq!(session.handle, "real-handle-1");
    }

    #[test]
    fn test_list_sessions_recency_order() {
        let store = Store::open_in_memory().unwrap();
        store
            .get_or_create_session("telegram:555", "main", "coder", "/srv")
            .unwrap();
        store
            .get_or_create_session("telegram:555", "work", "coder", "/srv")
            .unwrap();
        // "main" becomes the most recently active
        store
            .record_handle("telegram:555", "main", "h1", "coder")
            .unwrap();

        let sessions = store.list_sessions("telegram:555").unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].session_name, "main");
    }

    #[test]
    fn test_delete_all_sessions() {
        let store = Store::open_in_memory().unwrap();
        store
            .get_or_create_session("telegram:555", "main", "coder", "/srv")
            .unwrap();
        store
            .get_or_create_session("telegram:555", "work", "coder", "/srv")
            .unwrap();
        store
            .get_or_create_session("telegram:556", "main", "coder", "/srv")
            .unwrap();

        assert_eq!(store.delete_all_sessions("telegram:555").unwrap(), 2);
        assert!(store.get_session("telegram:555", "main").unwrap().is_none());
        assert!(store.get_session("telegram:556", "main").unwrap().is_some());
    }

    #[test]
    fn test_active_session_pointer_defaults_to_main() {
        let store = Store::open_in_memory().unwrap();
        assert_eq!(store.active_session_name("telegram:555").unwrap(), "main");

        store
            .set_active_session_name("telegram:555", "work")
            .unwrap();
        assert_eq!(store.active_session_name("telegram:555").unwrap(), "work");

        store.clear_active_session("telegram:555").unwrap();
        assert_eq!(store.active_session_name("telegram:555").unwrap(), "main");
    }

    #[test]
    fn test_session_stats_counts_recent_as_active() {
        let store = Store::open_in_memory().unwrap();
        store
            .get_or_create_session("telegram:555", "main", "coder", "/srv")
            .unwrap();
        let stats = store.session_stats().unwrap();
        assert_eq!(stats, SessionStats { active: 1, total: 1 });
    }

    fn pairing(code: &str, chat_key: &str, expires_at: &str) -> PairingRequest {
        PairingRequest {
            code: code.to_string(),
            chat_key: chat_key.to_string(),
            user: UserInfo::new("42", "telegram"),
            created_at: "2026-01-01T00:00:00+00:00".to_string(),
            expires_at: expires_at.to_string(),
        }
    }

    #[test]
    fn test_pairing_roundtrip_and_delete() {
        let store = Store::open_in_memory().unwrap();
        store
            .insert_pairing(&pairing("ABCD2345", "telegram:555", "2099-01-01T00:00:00+00:00"))
            .unwrap();

        let fetched = store.get_pairing("ABCD2345").unwrap().unwrap();
        assert_eq!(fetched.chat_key, "telegram:555");
        assert_eq!(fetched.user.id, "42");

        assert!(store.delete_pairing("ABCD2345").unwrap());
        assert!(!store.delete_pairing("ABCD2345").unwrap());
    }

    #[test]
    fn test_reap_and_list_pending() {
        let store = Store::open_in_memory().unwrap();
        store
            .insert_pairing(&pairing("OLD23456", "telegram:1", "2020-01-01T00:00:00+00:00"))
            .unwrap();
        store
            .insert_pairing(&pairing("NEW23456", "telegram:2", "2099-01-01T00:00:00+00:00"))
            .unwrap();

        let now = "2026-01-02T00:00:00+00:00";
        let pending = store.list_pending_pairings(now).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].code, "NEW23456");

        assert_eq!(store.reap_expired_pairings(now).unwrap(), 1);
        assert!(store.get_pairing("OLD23456").unwrap().is_none());
    }

    #[test]
    fn test_pending_pairing_for_chat_key() {
        let store = Store::open_in_memory().unwrap();
        store
            .insert_pairing(&pairing("AAAA2345", "telegram:1", "2099-01-01T00:00:00+00:00"))
            .unwrap();

        let now = "2026-01-02T00:00:00+00:00";
        assert!(store
            .pending_pairing_for("telegram:1", now)
            .unwrap()
            .is_some());
        assert!(store
            .pending_pairing_for("telegram:2", now)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_allowlist_add_remove_check() {
        let store = Store::open_in_memory().unwrap();
        assert!(!store.allow_contains("telegram:555").unwrap());

        store.allow_add("telegram:555", Some("operator")).unwrap();
        // double add is a no-op
        store.allow_add("telegram:555", None).unwrap();
        assert!(store.allow_contains("telegram:555").unwrap());

        let entries = store.allow_list().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].added_by.as_deref(), Some("operator"));

        assert!(store.allow_remove("telegram:555").unwrap());
        assert!(!store.allow_contains("telegram:555").unwrap());
        assert!(!store.allow_remove("telegram:555").unwrap());
    }

    #[test]
    fn test_store_open_creates_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested");
        let store = Store::open(&path).unwrap();
        store
            .get_or_create_session("telegram:555", "main", "coder", "/srv")
            .unwrap();
        assert!(path.join("bridge.db").exists());
    }
}
