//! Principal directory seam.
//!
//! The relational user store proper (sign-up, password handling, CRUD) is
//! an external collaborator. This module defines the read interface the
//! session issuer needs for refresh-time re-lookup, plus a minimal SQLite
//! implementation so the binary runs against the same database file as the
//! credential store.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Application role carried in session-token claims.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::User => "USER",
        }
    }
}

/// The local user on whose behalf Microsoft credentials are held.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub email: String,
    pub role: Role,
}

/// Read access to the application's user records.
pub trait PrincipalDirectory: Send + Sync {
    fn find_by_id(&self, id: &str) -> Result<Option<Principal>>;
}

/// SQLite-backed directory.
pub struct SqliteDirectory {
    conn: Mutex<Connection>,
}

impl SqliteDirectory {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS principals (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL,
                role TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Insert a principal record. Used by provisioning tooling and tests;
    /// the public API never creates principals.
    pub fn insert(&self, principal: &Principal) -> Result<()> {
        self.conn.lock().unwrap().execute(
            "INSERT INTO principals (id, email, role, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                principal.id,
                principal.email,
                principal.role.as_str(),
                chrono::Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    /// Remove a principal record.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn
            .lock()
            .unwrap()
            .execute("DELETE FROM principals WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }
}

impl PrincipalDirectory for SqliteDirectory {
    fn find_by_id(&self, id: &str) -> Result<Option<Principal>> {
        let conn = self.conn.lock().unwrap();
        let principal = conn
            .query_row(
                "SELECT id, email, role FROM principals WHERE id = ?1",
                params![id],
                |row| {
                    let role_text: String = row.get(2)?;
                    let role = match role_text.as_str() {
                        "ADMIN" => Role::Admin,
                        "USER" => Role::User,
                        other => {
                            return Err(rusqlite::Error::FromSqlConversionFailure(
                                2,
                                rusqlite::types::Type::Text,
                                format!("unknown role '{other}'").into(),
                            ))
                        }
                    };
                    Ok(Principal {
                        id: row.get(0)?,
                        email: row.get(1)?,
                        role,
                    })
                },
            )
            .optional()?;
        Ok(principal)
    }
}
