//! SQLite-backed credential store.
//!
//! All three token columns are encrypted with the injected cipher before
//! the row is written. The upsert is a single statement, so concurrent
//! refreshes for the same principal can never interleave into a record
//! holding a mix of old and new tokens.

use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use super::{CredentialKey, TokenSet};
use crate::crypto::TokenCipher;
use crate::error::Result;

/// Encrypted credential storage backed by SQLite.
///
/// # Schema
/// ```sql
/// CREATE TABLE microsoft_credentials (
///     id INTEGER PRIMARY KEY,
///     principal_kind TEXT NOT NULL,   -- "user" | "email"
///     principal TEXT NOT NULL,
///     access_token TEXT NOT NULL,     -- Encrypted
///     refresh_token TEXT NOT NULL,    -- Encrypted
///     id_token TEXT NOT NULL,         -- Encrypted
///     created_at TEXT NOT NULL,       -- ISO 8601 timestamp
///     updated_at TEXT NOT NULL,       -- ISO 8601 timestamp
///     UNIQUE(principal_kind, principal)
/// );
/// ```
///
/// # Thread Safety
/// - Connection is wrapped in Mutex for safe concurrent access
/// - Conflicting writes to the same key serialize at the storage layer via
///   the single upsert statement
pub struct CredentialStore {
    conn: Mutex<Connection>,
    cipher: Arc<TokenCipher>,
}

impl CredentialStore {
    /// Creates or opens a credential store.
    pub fn new<P: AsRef<Path>>(db_path: P, cipher: Arc<TokenCipher>) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS microsoft_credentials (
                id INTEGER PRIMARY KEY,
                principal_kind TEXT NOT NULL,
                principal TEXT NOT NULL,
                access_token TEXT NOT NULL,
                refresh_token TEXT NOT NULL,
                id_token TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE(principal_kind, principal)
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_credentials_principal
             ON microsoft_credentials(principal_kind, principal)",
            [],
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
            cipher,
        })
    }

    /// Inserts a grant or replaces all three token fields of the existing
    /// one for that key, atomically.
    ///
    /// `created_at` survives the conflict path; `updated_at` is rewritten.
    pub fn upsert(&self, key: &CredentialKey, tokens: &TokenSet) -> Result<()> {
        let access = self.cipher.encrypt(&tokens.access_token);
        let refresh = self.cipher.encrypt(&tokens.refresh_token);
        let id = self.cipher.encrypt(&tokens.id_token);
        let now = Utc::now().to_rfc3339();

        self.conn.lock().unwrap().execute(
            r#"
            INSERT INTO microsoft_credentials (
                principal_kind, principal,
                access_token, refresh_token, id_token,
                created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(principal_kind, principal) DO UPDATE SET
                access_token = excluded.access_token,
                refresh_token = excluded.refresh_token,
                id_token = excluded.id_token,
                updated_at = excluded.updated_at
            "#,
            params![key.kind(), key.value(), access, refresh, id, now, now],
        )?;

        Ok(())
    }

    /// Retrieves and decrypts the grant for a principal.
    ///
    /// Returns `Ok(None)` when no grant is on file. Fails with
    /// [`crate::error::Error::Integrity`] when a stored blob does not
    /// authenticate.
    pub fn get(&self, key: &CredentialKey) -> Result<Option<TokenSet>> {
        let row: Option<(String, String, String)> = {
            let conn = self.conn.lock().unwrap();
            conn.query_row(
                r#"
                SELECT access_token, refresh_token, id_token
                FROM microsoft_credentials
                WHERE principal_kind = ?1 AND principal = ?2
                "#,
                params![key.kind(), key.value()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?
        };

        let Some((access, refresh, id)) = row else {
            return Ok(None);
        };

        Ok(Some(TokenSet {
            access_token: self.cipher.decrypt(&access)?,
            refresh_token: self.cipher.decrypt(&refresh)?,
            id_token: self.cipher.decrypt(&id)?,
        }))
    }

    /// Deletes the grant for a principal.
    ///
    /// Idempotent: deleting a missing record succeeds and returns `false`.
    pub fn delete(&self, key: &CredentialKey) -> Result<bool> {
        let rows_affected = self.conn.lock().unwrap().execute(
            "DELETE FROM microsoft_credentials WHERE principal_kind = ?1 AND principal = ?2",
            params![key.kind(), key.value()],
        )?;

        Ok(rows_affected > 0)
    }
}
