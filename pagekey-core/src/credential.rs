//! Stored credentials. Uniqueness of (domain, username) is enforced here,
//! not by the schema.

use crate::database::{Database, now_millis};
use crate::error::{Result, StoreError};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};
use tracing::debug;

const COLUMNS: &str = "id, domain, url, username, password, title, created_at, last_used";

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub id: i64,
    pub domain: String,
    pub url: String,
    pub username: String,
    pub password: String,
    pub title: Option<String>,
    pub created_at: i64,
    pub last_used: i64,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("id", &self.id)
            .field("domain", &self.domain)
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"********")
            .field("title", &self.title)
            .field("created_at", &self.created_at)
            .field("last_used", &self.last_used)
            .finish()
    }
}

impl Credential {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Credential {
            id: row.get(0)?,
            domain: row.get(1)?,
            url: row.get(2)?,
            username: row.get(3)?,
            password: row.get(4)?,
            title: row.get(5)?,
            created_at: row.get(6)?,
            last_used: row.get(7)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewCredential {
    pub domain: String,
    pub url: String,
    pub username: String,
    pub password: String,
    pub title: Option<String>,
}

/// What a save did to the credential table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "id", rename_all = "snake_case")]
pub enum Upsert {
    Inserted(i64),
    /// Password changed.
    Updated(i64),
    /// Same password; only `last_used` moved.
    Touched(i64),
}

impl Upsert {
    pub fn id(&self) -> i64 {
        match self {
            Upsert::Inserted(id) | Upsert::Updated(id) | Upsert::Touched(id) => *id,
        }
    }
}

fn find(conn: &Connection, domain: &str, username: &str) -> Result<Option<Credential>> {
    let credential = conn
        .query_row(
            &format!(
                "SELECT {} FROM credentials WHERE domain = ?1 AND username = ?2 ORDER BY id LIMIT 1",
                COLUMNS
            ),
            params![domain, username],
            Credential::from_row,
        )
        .optional()?;
    Ok(credential)
}

fn insert(conn: &Connection, new: &NewCredential) -> Result<i64> {
    let now = now_millis();
    conn.execute(
        "INSERT INTO credentials (domain, url, username, password, title, created_at, last_used)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            &new.domain,
            &new.url,
            &new.username,
            &new.password,
            &new.title,
            now,
            now,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn expect_one(changed: usize, id: i64) -> Result<()> {
    if changed == 0 {
        Err(StoreError::NotFound(id))
    } else {
        Ok(())
    }
}

fn update(conn: &Connection, id: i64, password: &str, url: Option<&str>) -> Result<()> {
    let changed = conn.execute(
        "UPDATE credentials
         SET password = ?1, url = COALESCE(?2, url), last_used = MAX(?3, last_used + 1)
         WHERE id = ?4",
        params![password, url, now_millis(), id],
    )?;
    expect_one(changed, id)
}

fn touch(conn: &Connection, id: i64) -> Result<()> {
    let changed = conn.execute(
        "UPDATE credentials SET last_used = MAX(?1, last_used + 1) WHERE id = ?2",
        params![now_millis(), id],
    )?;
    expect_one(changed, id)
}

/// Move credentials stored under one key to another.
pub(crate) fn rekey(conn: &Connection, from: &str, to: &str) -> Result<usize> {
    let moved = conn.execute(
        "UPDATE credentials SET domain = ?1 WHERE domain = ?2",
        params![to, from],
    )?;
    Ok(moved)
}

pub(crate) fn upsert(conn: &Connection, new: &NewCredential) -> Result<Upsert> {
    match find(conn, &new.domain, &new.username)? {
        Some(existing) if existing.password != new.password => {
            let url = Some(new.url.as_str()).filter(|u| !u.is_empty());
            update(conn, existing.id, &new.password, url)?;
            debug!("Updated password for {} on {}", new.username, new.domain);
            Ok(Upsert::Updated(existing.id))
        }
        Some(existing) => {
            touch(conn, existing.id)?;
            Ok(Upsert::Touched(existing.id))
        }
        None => {
            let id = insert(conn, new)?;
            debug!("Stored new credential for {} on {}", new.username, new.domain);
            Ok(Upsert::Inserted(id))
        }
    }
}

impl Database {
    /// Credentials saved for `domain`, most recently used first.
    pub fn credentials_for_domain(&self, domain: &str) -> Result<Vec<Credential>> {
        self.read(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM credentials WHERE domain = ?1 ORDER BY last_used DESC, id DESC",
                COLUMNS
            ))?;
            let credentials = stmt
                .query_map(params![domain], Credential::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(credentials)
        })
    }

    pub fn find_credential(&self, domain: &str, username: &str) -> Result<Option<Credential>> {
        self.read(|conn| find(conn, domain, username))
    }

    pub fn all_credentials(&self) -> Result<Vec<Credential>> {
        self.read(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM credentials ORDER BY domain, last_used DESC",
                COLUMNS
            ))?;
            let credentials = stmt
                .query_map([], Credential::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(credentials)
        })
    }

    pub fn insert_credential(&self, new: &NewCredential) -> Result<i64> {
        self.write(|tx| insert(tx, new))
    }

    /// Replace the password, and the url when one is given.
    pub fn update_credential(&self, id: i64, password: &str, url: Option<&str>) -> Result<()> {
        self.write(|tx| update(tx, id, password, url))
    }

    pub fn touch_credential(&self, id: i64) -> Result<()> {
        self.write(|tx| touch(tx, id))
    }

    pub fn delete_credential(&self, id: i64) -> Result<()> {
        self.write(|tx| {
            let deleted = tx.execute("DELETE FROM credentials WHERE id = ?1", params![id])?;
            expect_one(deleted, id)
        })
    }

    /// Insert, or update the existing (domain, username) row, in one transaction.
    pub fn upsert_credential(&self, new: &NewCredential) -> Result<Upsert> {
        self.write(|tx| upsert(tx, new))
    }
}
