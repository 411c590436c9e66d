// ── Engine: Identity Store ─────────────────────────────────────────────────
// Supplies the stable per-installation identity attached to every outbound
// request as `X-User-Id`. Stored as a single key-value pair in a small
// SQLite database under the user's home directory, via rusqlite — no other
// client-side state is persisted.

use std::path::{Path, PathBuf};

use log::info;
use parking_lot::Mutex;
use rusqlite::{params, Connection};

use crate::atoms::constants::IDENTITY_KEY;
use crate::atoms::error::{ClientError, ClientResult};

/// Get the path to the client's SQLite database.
fn client_db_path() -> ClientResult<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ClientError::Config("Cannot resolve home directory".into()))?;
    let dir = home.join(".taskos");
    std::fs::create_dir_all(&dir)?;
    Ok(dir.join("client.db"))
}

/// Local persistent key-value store holding the installation identity.
///
/// The connection mutex is held across the read-check and the insert in
/// `user_id()`, so a re-entrant or concurrent first access can never
/// generate two identities. Once a non-empty value is stored it is never
/// regenerated.
pub struct IdentityStore {
    conn: Mutex<Connection>,
}

impl IdentityStore {
    /// Open (or create) the client database at the default location.
    pub fn open() -> ClientResult<Self> {
        Self::open_at(&client_db_path()?)
    }

    /// Open (or create) the client database at an explicit path.
    pub fn open_at(path: &Path) -> ClientResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS client_config (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        Ok(IdentityStore { conn: Mutex::new(conn) })
    }

    /// Return the installation identity, generating and persisting it on
    /// first access.
    pub fn user_id(&self) -> ClientResult<String> {
        let conn = self.conn.lock();
        if let Some(existing) = Self::get(&conn, IDENTITY_KEY)? {
            if !existing.is_empty() {
                return Ok(existing);
            }
        }
        let fresh = uuid::Uuid::new_v4().to_string();
        Self::set(&conn, IDENTITY_KEY, &fresh)?;
        info!("[identity] Generated installation identity");
        Ok(fresh)
    }

    fn get(conn: &Connection, key: &str) -> ClientResult<Option<String>> {
        let result = conn.query_row(
            "SELECT value FROM client_config WHERE key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );
        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(conn: &Connection, key: &str, value: &str) -> ClientResult<()> {
        conn.execute(
            "INSERT OR REPLACE INTO client_config (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_idempotent_within_one_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = IdentityStore::open_at(&dir.path().join("client.db")).unwrap();
        let first = store.user_id().unwrap();
        let second = store.user_id().unwrap();
        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn identity_survives_persistence_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.db");
        let first = {
            let store = IdentityStore::open_at(&path).unwrap();
            store.user_id().unwrap()
        };
        let store = IdentityStore::open_at(&path).unwrap();
        assert_eq!(store.user_id().unwrap(), first);
    }

    #[test]
    fn empty_stored_value_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let store = IdentityStore::open_at(&dir.path().join("client.db")).unwrap();
        {
            let conn = store.conn.lock();
            IdentityStore::set(&conn, IDENTITY_KEY, "").unwrap();
        }
        let id = store.user_id().unwrap();
        assert!(!id.is_empty());
        assert_eq!(store.user_id().unwrap(), id);
    }
}
