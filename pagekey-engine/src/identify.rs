//! Page identity: a real domain when the snapshot exposes one, otherwise a
//! synthetic id hashed from form elements that stay put between visits.

use crate::title;
use crate::tree::{Node, ViewTree};
use crate::urls::{BrowserFamily, extract_domain, extract_url, extract_web_domain};
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

pub const PAGE_ID_PREFIX: &str = "page_";
const MIN_STABLE_ELEMENTS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    pub url: Option<String>,
    pub domain: Option<String>,
    pub page_id: String,
    pub title: Option<String>,
}

impl PageInfo {
    pub fn has_real_domain(&self) -> bool {
        self.domain.as_deref().is_some_and(|d| !d.trim().is_empty())
    }
}

/// Identify the page shown by `tree`. Deterministic and total.
pub fn identify(tree: &ViewTree) -> PageInfo {
    let url = extract_url(tree);
    let url_domain = url.as_deref().and_then(extract_domain);
    let web_domain = extract_web_domain(tree);
    let from_web = web_domain.is_some();

    if let Some(domain) = web_domain.or(url_domain) {
        debug!(
            "Real domain {} (from {})",
            domain,
            if from_web { "web domain" } else { "URL" }
        );
        return PageInfo {
            url: Some(url.unwrap_or_else(|| format!("https://{}", domain))),
            domain: Some(domain.clone()),
            page_id: domain.clone(),
            title: Some(domain),
        };
    }

    let signature = page_signature(tree);
    let page_id = page_id_for(&signature);
    let title = title::best_title(tree, None, None).unwrap_or_else(|| page_id.clone());
    debug!(
        "Synthetic page id {} from signature '{}', title '{}'",
        page_id, signature, title
    );

    PageInfo {
        url: None,
        domain: None,
        page_id,
        title: Some(title),
    }
}

/// Sorted `|`-joined tokens from labels and attributes that do not vary
/// between visits to the same form. Never empty.
pub fn page_signature(tree: &ViewTree) -> String {
    let mut tokens: BTreeSet<String> = tree.nodes().flat_map(stable_tokens).collect();

    if tokens.len() < MIN_STABLE_ELEMENTS {
        let browser = BrowserFamily::detect(tree.package());
        tokens.insert(format!("browser:{}", browser.as_str()));
        tokens.insert("form:login".to_string());
    }

    tokens.into_iter().collect::<Vec<_>>().join("|")
}

pub fn page_id_for(signature: &str) -> String {
    let digest = hex::encode(Md5::digest(signature.as_bytes()));
    format!("{}{}", PAGE_ID_PREFIX, &digest[..8])
}

fn stable_tokens(node: &Node) -> Vec<String> {
    let mut tokens = Vec::new();

    if let Some(text) = node.text() {
        let label = match text.trim().to_lowercase().as_str() {
            "username" => Some("username"),
            "password" => Some("password"),
            "email" => Some("email"),
            "login" => Some("login"),
            "sign in" => Some("signin"),
            "usuario" => Some("usuario"),
            "contraseña" => Some("contraseña"),
            "correo" => Some("correo"),
            "iniciar sesión" => Some("iniciar"),
            _ => None,
        };
        if let Some(label) = label {
            tokens.push(format!("label:{}", label));
        }
    }

    if let Some(html) = &node.html {
        for (key, value) in &html.attributes {
            let value = value.to_lowercase();
            match (key.as_str(), value.as_str()) {
                ("name", "username" | "user" | "email" | "password" | "pass") => {
                    tokens.push(format!("name:{}", value))
                }
                ("type", "email" | "password" | "text") => tokens.push(format!("type:{}", value)),
                _ => {}
            }
        }
    }

    tokens
}
