//! Site registry: maps a page visit to a persisted [`Site`].
//!
//! Exact page-id hits are the fast path. Otherwise the page's signature is
//! compared against every stored site with token-set Jaccard similarity, and
//! a new site is created only when nothing is close enough.

use crate::credential;
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::site::{self, Site};
use pagekey_engine::PageInfo;
use pagekey_engine::identify::PAGE_ID_PREFIX;
use rusqlite::Connection;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.6;

const MAX_NAME_LEN: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegistryConfig {
    pub similarity_threshold: f64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

/// Outcome of [`SiteRegistry::resolve`].
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    ExactMatch(Site),
    /// Close matches, most recently used first. Picking one is the caller's call.
    SimilarSites {
        sites: Vec<Site>,
        page: PageInfo,
    },
    NewSite(Site),
}

#[derive(Clone)]
pub struct SiteRegistry {
    db: Arc<Database>,
    config: RegistryConfig,
}

impl SiteRegistry {
    pub fn new(db: Arc<Database>) -> Self {
        Self::with_config(db, RegistryConfig::default())
    }

    pub fn with_config(db: Arc<Database>, config: RegistryConfig) -> Self {
        Self { db, config }
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    pub fn resolve(&self, page: &PageInfo) -> Result<Resolution> {
        self.db.write(|tx| self.resolve_in(tx, page))
    }

    /// Adopt `page`'s id for `selected`, so the next visit is an exact match.
    /// Credentials filed under the old synthetic id follow the site.
    pub fn confirm_match(&self, page: &PageInfo, selected: &Site) -> Result<Site> {
        self.db.write(|tx| confirm_in(tx, page, selected))
    }

    /// Register `page` as its own site even though similar ones exist.
    pub fn create_from_similar(&self, page: &PageInfo, name: &str) -> Result<Site> {
        self.db.write(|tx| create_in(tx, page, name))
    }

    /// Resolution inside a caller's transaction.
    pub(crate) fn resolve_in(&self, conn: &Connection, page: &PageInfo) -> Result<Resolution> {
        if let Some(existing) = site::by_page_id(conn, &page.page_id)? {
            let site = site::touch(conn, existing)?;
            debug!("Exact match for {}: site {}", page.page_id, site.id);
            return Ok(Resolution::ExactMatch(site));
        }

        let signature = signature_for(page);
        let threshold = self.config.similarity_threshold;
        let similar: Vec<Site> = site::all(conn)?
            .into_iter()
            .filter(|s| similarity(&signature, &s.signature) >= threshold)
            .collect();

        if !similar.is_empty() {
            info!(
                "{} similar sites for {} (best: {})",
                similar.len(),
                page.page_id,
                similar[0].name
            );
            return Ok(Resolution::SimilarSites {
                sites: similar,
                page: page.clone(),
            });
        }

        let site = site::insert(conn, &generate_site_name(page), page, &signature, false)?;
        info!("New site {} '{}' for {}", site.id, site.name, page.page_id);
        Ok(Resolution::NewSite(site))
    }

    pub fn rename(&self, site_id: i64, name: &str) -> Result<Site> {
        self.db.write(|tx| site::rename(tx, site_id, name))
    }
}

pub(crate) fn confirm_in(conn: &Connection, page: &PageInfo, selected: &Site) -> Result<Site> {
    let current = site::by_id(conn, selected.id)?.ok_or(StoreError::NotFound(selected.id))?;
    let old_page_id = current.page_id.clone();
    let site = site::reassign(conn, current, page)?;

    if old_page_id != site.page_id && old_page_id.starts_with(PAGE_ID_PREFIX) {
        let moved = credential::rekey(conn, &old_page_id, &site.page_id)?;
        debug!("Moved {} credentials from {}", moved, old_page_id);
    }

    info!("Site {} now answers to {}", site.id, site.page_id);
    Ok(site)
}

pub(crate) fn create_in(conn: &Connection, page: &PageInfo, name: &str) -> Result<Site> {
    let site = site::insert(conn, name, page, &signature_for(page), true)?;
    info!("New site {} '{}' split from similar sites", site.id, site.name);
    Ok(site)
}

/// Sorted `|`-joined `key:value` tokens of the non-empty page components.
pub fn signature_for(page: &PageInfo) -> String {
    let mut tokens: Vec<String> = [
        ("url", page.url.as_deref()),
        ("domain", page.domain.as_deref()),
        ("title", page.title.as_deref()),
        ("pageId", Some(page.page_id.as_str())),
    ]
    .into_iter()
    .filter_map(|(key, value)| {
        value
            .filter(|v| !v.is_empty())
            .map(|v| format!("{}:{}", key, v))
    })
    .collect();

    tokens.sort();
    tokens.join("|")
}

/// Jaccard similarity of two signatures' token sets. Zero when both are empty.
pub fn similarity(a: &str, b: &str) -> f64 {
    let tokens = |s: &str| -> HashSet<String> {
        s.split('|')
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    };
    let (a, b) = (tokens(a), tokens(b));

    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(&b).count() as f64 / union as f64
}

/// Domain, else a short title, else the start of the url, else a name
/// derived from the page id.
pub fn generate_site_name(page: &PageInfo) -> String {
    if let Some(domain) = page.domain.as_deref().filter(|d| !d.is_empty()) {
        return domain.to_string();
    }

    if let Some(title) = page
        .title
        .as_deref()
        .filter(|t| !t.is_empty() && t.chars().count() <= MAX_NAME_LEN)
    {
        return title.to_string();
    }

    if let Some(url) = page.url.as_deref().filter(|u| !u.is_empty()) {
        return url.chars().take(MAX_NAME_LEN).collect();
    }

    let short: String = page.page_id.chars().take(8).collect();
    format!("Site {}", short)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(page_id: &str, title: Option<&str>) -> PageInfo {
        PageInfo {
            url: None,
            domain: None,
            page_id: page_id.to_string(),
            title: title.map(str::to_string),
        }
    }

    #[test]
    fn signature_skips_missing_components() {
        assert_eq!(
            signature_for(&page("page_1234abcd", Some("Acme"))),
            "pageId:page_1234abcd|title:Acme"
        );
    }

    #[test]
    fn long_titles_are_not_names() {
        let long = "A title that is well over thirty characters long";
        assert_eq!(
            generate_site_name(&page("page_1234abcd", Some(long))),
            "Site page_123"
        );
    }
}
