//! The fill and save pipelines: classify, identify, overlay, resolve, then
//! read or write credentials.
//!
//! Analysis runs on the caller's task. Storage runs on tokio's blocking pool.
//! Storage failures never escape: fill degrades to no suggestions and save
//! reports [`SaveOutcome::Failed`].

use crate::credential::{self, Credential, NewCredential, Upsert};
use crate::database::Database;
use crate::error::Result;
use crate::registry::{self, Resolution, SiteRegistry};
use crate::site::Site;
use pagekey_engine::compat;
use pagekey_engine::submit::{CredentialPair, credential_pairs, extract_submitted};
use pagekey_engine::title::display_title;
use pagekey_engine::{ClassifiedField, FieldId, FieldRole, PageInfo, ViewTree, classify, identify};
use rusqlite::Connection;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What to do when the registry reports similar sites instead of an exact match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SimilarSitePolicy {
    /// Reuse the most recently used similar site as is.
    #[default]
    UseMostRecent,
    /// Reuse it and adopt the new page id, so the next visit matches exactly.
    ConfirmMostRecent,
    /// Register the page as a separate site.
    CreateNew,
}

impl SimilarSitePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SimilarSitePolicy::UseMostRecent => "use",
            SimilarSitePolicy::ConfirmMostRecent => "confirm",
            SimilarSitePolicy::CreateNew => "new",
        }
    }
}

impl fmt::Display for SimilarSitePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SimilarSitePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "use" => Ok(SimilarSitePolicy::UseMostRecent),
            "confirm" => Ok(SimilarSitePolicy::ConfirmMostRecent),
            "new" => Ok(SimilarSitePolicy::CreateNew),
            other => Err(format!(
                "unknown policy '{}', expected use, confirm or new",
                other
            )),
        }
    }
}

/// One suggestion: values to put into fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    pub label: String,
    pub credential_id: i64,
    pub values: Vec<(FieldId, String)>,
}

/// Fields the host should watch for a later save.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaveInfo {
    pub fields: Vec<FieldId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FillResponse {
    pub page: PageInfo,
    pub title: String,
    pub site: Option<Site>,
    pub fields: Vec<ClassifiedField>,
    pub datasets: Vec<Dataset>,
    pub save_info: Option<SaveInfo>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Saved { site: Site, stored: Vec<Upsert> },
    NothingToSave,
    Failed(String),
}

pub struct AutofillService {
    registry: SiteRegistry,
    policy: SimilarSitePolicy,
}

impl AutofillService {
    pub fn new(db: Arc<Database>) -> Self {
        Self::with_registry(SiteRegistry::new(db))
    }

    pub fn with_registry(registry: SiteRegistry) -> Self {
        Self {
            registry,
            policy: SimilarSitePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: SimilarSitePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn registry(&self) -> &SiteRegistry {
        &self.registry
    }

    /// Build fill suggestions for `tree`. `None` when nothing on the page can
    /// be filled.
    pub async fn fill(&self, tree: &ViewTree) -> Option<FillResponse> {
        let fields = classify(tree);
        if fields.is_empty() {
            debug!("No autofillable fields");
            return None;
        }

        let page = identify(tree);
        let fields = apply_overlay(&page, fields);
        let title = display_title(tree, &page);
        let save_info = save_info_for(&fields);

        let (site, credentials) = match self.lookup(page.clone(), title.clone()).await {
            Ok((site, credentials)) => (Some(site), credentials),
            Err(e) => {
                warn!("Credential lookup failed for {}: {}", page.page_id, e);
                (None, Vec::new())
            }
        };

        let datasets: Vec<Dataset> = credentials
            .iter()
            .filter_map(|c| dataset_for(c, &fields, &title))
            .collect();
        info!(
            "{} suggestions for {} ({} fields)",
            datasets.len(),
            page.page_id,
            fields.len()
        );

        Some(FillResponse {
            page,
            title,
            site,
            fields,
            datasets,
            save_info,
        })
    }

    /// Store the credentials typed into `tree`.
    pub async fn save(&self, tree: &ViewTree) -> SaveOutcome {
        let submitted = extract_submitted(tree);
        let page = identify(tree);
        let bank = page.domain.as_deref().and_then(compat::lookup);
        let pairs = credential_pairs(&submitted, bank);

        if pairs.is_empty() {
            debug!(
                "No username/password pair among {} submitted fields",
                submitted.len()
            );
            return SaveOutcome::NothingToSave;
        }

        let title = display_title(tree, &page);
        let page_id = page.page_id.clone();
        match self.store(page, title, pairs).await {
            Ok((site, stored)) => {
                info!("Saved {} credentials for site {}", stored.len(), site.id);
                SaveOutcome::Saved { site, stored }
            }
            Err(e) => {
                warn!("Dropping save for {}: {}", page_id, e);
                SaveOutcome::Failed(e.to_string())
            }
        }
    }

    async fn lookup(&self, page: PageInfo, title: String) -> Result<(Site, Vec<Credential>)> {
        let registry = self.registry.clone();
        let policy = self.policy;

        tokio::task::spawn_blocking(move || -> Result<(Site, Vec<Credential>)> {
            let site = registry
                .database()
                .write(|tx| settle(&registry, tx, &page, &title, policy))?;
            let key = credential_key(&page, &site);
            let credentials = registry.database().credentials_for_domain(&key)?;
            debug!("{} stored credentials under {}", credentials.len(), key);
            Ok((site, credentials))
        })
        .await?
    }

    /// Resolve the site and upsert every pair in one transaction, so a failed
    /// save leaves no rows behind.
    async fn store(
        &self,
        page: PageInfo,
        title: String,
        pairs: Vec<CredentialPair>,
    ) -> Result<(Site, Vec<Upsert>)> {
        let registry = self.registry.clone();
        let policy = self.policy;

        tokio::task::spawn_blocking(move || -> Result<(Site, Vec<Upsert>)> {
            registry.database().write(|tx| {
                let site = settle(&registry, tx, &page, &title, policy)?;
                let key = credential_key(&page, &site);
                let url = page
                    .url
                    .clone()
                    .unwrap_or_else(|| format!("https://{}", key));
                let title = if page.has_real_domain() {
                    title.clone()
                } else {
                    site.name.clone()
                };

                let stored = pairs
                    .iter()
                    .map(|pair| {
                        credential::upsert(
                            tx,
                            &NewCredential {
                                domain: key.clone(),
                                url: url.clone(),
                                username: pair.username.clone(),
                                password: pair.password.clone(),
                                title: Some(title.clone()),
                            },
                        )
                    })
                    .collect::<Result<Vec<_>>>()?;

                Ok((site, stored))
            })
        })
        .await?
    }
}

/// Reduce a resolution to one site according to `policy`. A page split off
/// from similar sites is named after `title`.
fn settle(
    registry: &SiteRegistry,
    conn: &Connection,
    page: &PageInfo,
    title: &str,
    policy: SimilarSitePolicy,
) -> Result<Site> {
    match registry.resolve_in(conn, page)? {
        Resolution::ExactMatch(site) | Resolution::NewSite(site) => Ok(site),
        Resolution::SimilarSites { sites, page } => {
            let recent = sites.into_iter().next();
            match (policy, recent) {
                (SimilarSitePolicy::UseMostRecent, Some(site)) => Ok(site),
                (SimilarSitePolicy::ConfirmMostRecent, Some(site)) => {
                    registry::confirm_in(conn, &page, &site)
                }
                _ => registry::create_in(conn, &page, title),
            }
        }
    }
}

/// Real domain when the page has one, otherwise the site's page id.
fn credential_key(page: &PageInfo, site: &Site) -> String {
    match page.domain.as_deref() {
        Some(domain) if page.has_real_domain() => domain.to_string(),
        _ => site.page_id.clone(),
    }
}

fn apply_overlay(page: &PageInfo, fields: Vec<ClassifiedField>) -> Vec<ClassifiedField> {
    match page.domain.as_deref() {
        Some(domain) if compat::is_known(domain) => compat::enhance(domain, &fields),
        _ => fields,
    }
}

fn dataset_for(credential: &Credential, fields: &[ClassifiedField], title: &str) -> Option<Dataset> {
    let values: Vec<(FieldId, String)> = fields
        .iter()
        .filter_map(|field| match &field.role {
            role if role.is_login() => Some((field.id.clone(), credential.username.clone())),
            FieldRole::Password => Some((field.id.clone(), credential.password.clone())),
            _ => None,
        })
        .collect();

    if values.is_empty() {
        return None;
    }

    let title = credential.title.as_deref().unwrap_or(title);
    Some(Dataset {
        label: format!("{} - {}", credential.username, title),
        credential_id: credential.id,
        values,
    })
}

/// Password fields, else login fields, else everything.
fn save_info_for(fields: &[ClassifiedField]) -> Option<SaveInfo> {
    if fields.is_empty() {
        return None;
    }

    let ids = |keep: fn(&FieldRole) -> bool| -> Vec<FieldId> {
        fields
            .iter()
            .filter(|f| keep(&f.role))
            .map(|f| f.id.clone())
            .collect()
    };

    let mut chosen = ids(|r| *r == FieldRole::Password);
    if chosen.is_empty() {
        chosen = ids(FieldRole::is_login);
    }
    if chosen.is_empty() {
        chosen = ids(|_| true);
    }

    Some(SaveInfo { fields: chosen })
}
