//! Persisted sites: one row per distinct page, keyed by page id.

use crate::database::{Database, now_millis};
use crate::error::{Result, StoreError};
use pagekey_engine::PageInfo;
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};

const COLUMNS: &str =
    "id, name, page_id, url, domain, signature, is_user_named, created_at, last_used";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub id: i64,
    pub name: String,
    pub page_id: String,
    pub url: Option<String>,
    pub domain: Option<String>,
    pub signature: String,
    pub is_user_named: bool,
    pub created_at: i64,
    pub last_used: i64,
}

impl Site {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Site {
            id: row.get(0)?,
            name: row.get(1)?,
            page_id: row.get(2)?,
            url: row.get(3)?,
            domain: row.get(4)?,
            signature: row.get(5)?,
            is_user_named: row.get(6)?,
            created_at: row.get(7)?,
            last_used: row.get(8)?,
        })
    }
}

/// Strictly after `previous`, even when the clock has not moved.
fn next_use(previous: i64) -> i64 {
    now_millis().max(previous + 1)
}

pub(crate) fn by_page_id(conn: &Connection, page_id: &str) -> Result<Option<Site>> {
    let site = conn
        .query_row(
            &format!("SELECT {} FROM sites WHERE page_id = ?1", COLUMNS),
            params![page_id],
            Site::from_row,
        )
        .optional()?;
    Ok(site)
}

pub(crate) fn by_id(conn: &Connection, id: i64) -> Result<Option<Site>> {
    let site = conn
        .query_row(
            &format!("SELECT {} FROM sites WHERE id = ?1", COLUMNS),
            params![id],
            Site::from_row,
        )
        .optional()?;
    Ok(site)
}

/// Every site, most recently used first.
pub(crate) fn all(conn: &Connection) -> Result<Vec<Site>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM sites ORDER BY last_used DESC, id DESC",
        COLUMNS
    ))?;

    let sites = stmt
        .query_map([], Site::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(sites)
}

pub(crate) fn insert(
    conn: &Connection,
    name: &str,
    page: &PageInfo,
    signature: &str,
    is_user_named: bool,
) -> Result<Site> {
    if by_page_id(conn, &page.page_id)?.is_some() {
        return Err(StoreError::PageIdTaken(page.page_id.clone()));
    }

    let now = now_millis();
    conn.execute(
        "INSERT INTO sites (
            name, page_id, url, domain, signature, is_user_named, created_at, last_used
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            name,
            &page.page_id,
            &page.url,
            &page.domain,
            signature,
            is_user_named,
            now,
            now,
        ],
    )?;

    Ok(Site {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
        page_id: page.page_id.clone(),
        url: page.url.clone(),
        domain: page.domain.clone(),
        signature: signature.to_string(),
        is_user_named,
        created_at: now,
        last_used: now,
    })
}

pub(crate) fn touch(conn: &Connection, site: Site) -> Result<Site> {
    let last_used = next_use(site.last_used);
    conn.execute(
        "UPDATE sites SET last_used = ?1 WHERE id = ?2",
        params![last_used, site.id],
    )?;
    Ok(Site { last_used, ..site })
}

/// Point `site` at the page id of `page`. Url and domain only change when
/// the page supplies them.
pub(crate) fn reassign(conn: &Connection, site: Site, page: &PageInfo) -> Result<Site> {
    if let Some(owner) = by_page_id(conn, &page.page_id)?
        && owner.id != site.id
    {
        return Err(StoreError::PageIdTaken(page.page_id.clone()));
    }

    let url = page.url.clone().or(site.url.clone());
    let domain = page.domain.clone().or(site.domain.clone());
    let last_used = next_use(site.last_used);

    conn.execute(
        "UPDATE sites SET page_id = ?1, url = ?2, domain = ?3, last_used = ?4 WHERE id = ?5",
        params![&page.page_id, &url, &domain, last_used, site.id],
    )?;

    Ok(Site {
        page_id: page.page_id.clone(),
        url,
        domain,
        last_used,
        ..site
    })
}

pub(crate) fn rename(conn: &Connection, id: i64, name: &str) -> Result<Site> {
    let changed = conn.execute(
        "UPDATE sites SET name = ?1, is_user_named = 1 WHERE id = ?2",
        params![name, id],
    )?;
    if changed == 0 {
        return Err(StoreError::NotFound(id));
    }
    by_id(conn, id)?.ok_or(StoreError::NotFound(id))
}

impl Database {
    pub fn site(&self, id: i64) -> Result<Option<Site>> {
        self.read(|conn| by_id(conn, id))
    }

    pub fn site_by_page_id(&self, page_id: &str) -> Result<Option<Site>> {
        self.read(|conn| by_page_id(conn, page_id))
    }

    pub fn all_sites(&self) -> Result<Vec<Site>> {
        self.read(all)
    }

    pub fn delete_site(&self, id: i64) -> Result<()> {
        self.write(|tx| {
            let deleted = tx.execute("DELETE FROM sites WHERE id = ?1", params![id])?;
            if deleted == 0 {
                return Err(StoreError::NotFound(id));
            }
            Ok(())
        })
    }
}
