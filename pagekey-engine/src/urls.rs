//! URL and domain discovery over view snapshots.
//!
//! Strategies run in a fixed priority order and the first hit wins. Nothing
//! here fails: unparseable input degrades to manual string handling or `None`.

use crate::tree::{Node, ViewTree};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;
use url::Url;

pub const WEBVIEW_CLASS: &str = "android.webkit.WebView";

static URL_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://\S+").unwrap());

static DOMAIN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:www\.)?(?:[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?\.)+[a-zA-Z]{2,}")
        .unwrap()
});

static VALID_DOMAIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9]([a-zA-Z0-9-]*[a-zA-Z0-9])?(\.[a-zA-Z0-9]([a-zA-Z0-9-]*[a-zA-Z0-9])?)*\.[a-zA-Z]{2,}$",
    )
    .unwrap()
});

/// Package-style identifiers that hosts sometimes report as web domains.
const INTERNAL_PREFIXES: &[&str] = &[
    "com.android",
    "com.google.android",
    "com.chrome",
    "com.firefox",
    "org.mozilla",
    "com.microsoft",
    "com.samsung",
    "com.huawei",
];

/// Same idea for free text, where any Google package name is noise.
const TEXT_INTERNAL_PREFIXES: &[&str] = &[
    "com.android",
    "com.google",
    "com.chrome",
    "com.firefox",
    "org.mozilla",
    "com.microsoft",
    "com.samsung",
    "com.huawei",
];

const WEB_SUFFIXES: &[&str] = &[".com", ".org", ".net", ".edu", ".gov", ".io", ".co", ".app"];

const CHROME_ADDRESS_IDS: &[&str] = &[
    "url_bar",
    "location_bar",
    "omnibox_text",
    "location_bar_status",
    "location_bar_verbose_status",
    "url_text",
    "address_bar",
];

const FIREFOX_ADDRESS_IDS: &[&str] = &[
    "mozac_browser_toolbar_url_view",
    "mozac_browser_toolbar_edit_url_view",
    "url_bar_title",
];

const MAX_TEXT_SCAN_LEN: usize = 200;
const MAX_DOMAIN_TEXT_LEN: usize = 100;

/// Browser family of the hosting application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserFamily {
    Chrome,
    Firefox,
    Generic,
}

impl BrowserFamily {
    pub fn detect(package: Option<&str>) -> Self {
        match package {
            Some(p) if p.contains("chrome") => BrowserFamily::Chrome,
            Some(p) if p.contains("firefox") => BrowserFamily::Firefox,
            _ => BrowserFamily::Generic,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BrowserFamily::Chrome => "chrome",
            BrowserFamily::Firefox => "firefox",
            BrowserFamily::Generic => "generic",
        }
    }
}

/// Find the page URL using every strategy in priority order.
pub fn extract_url(tree: &ViewTree) -> Option<String> {
    if let Some(domain) = extract_web_domain(tree) {
        debug!("URL from web domain: {}", domain);
        return Some(format!("https://{}", domain));
    }

    for title in tree.windows.iter().filter_map(|w| w.title.as_deref()) {
        if let Some(url) = url_from_location_text(title) {
            debug!("URL from window title: {}", url);
            return Some(url);
        }
    }

    let browser_url = match BrowserFamily::detect(tree.package()) {
        BrowserFamily::Chrome => chrome_url(tree),
        BrowserFamily::Firefox => firefox_url(tree),
        BrowserFamily::Generic => None,
    };
    if let Some(url) = browser_url {
        debug!("URL from browser chrome: {}", url);
        return Some(url);
    }

    if let Some(url) = tree.nodes().find_map(url_in_node) {
        debug!("URL from node scan: {}", url);
        return Some(url);
    }

    let url = domain_in_any_text(tree);
    if url.is_none() {
        debug!("No URL found in snapshot");
    }
    url
}

/// First valid web domain exposed directly by any node. Authoritative when present.
pub fn extract_web_domain(tree: &ViewTree) -> Option<String> {
    tree.nodes()
        .filter_map(|n| n.web_domain.as_deref())
        .find(|d| {
            let ok = !d.trim().is_empty() && is_valid_domain(d);
            if !ok {
                debug!("Ignoring invalid web domain: {}", d);
            }
            ok
        })
        .map(str::to_string)
}

/// Host of `url` without a leading `www.`. Falls back to manual stripping
/// when the string does not parse as a URL.
pub fn extract_domain(url: &str) -> Option<String> {
    if url.is_empty() {
        return None;
    }

    if let Ok(parsed) = Url::parse(url)
        && let Some(host) = parsed.host_str()
        && !host.is_empty()
    {
        return Some(strip_www(host).to_string());
    }

    let clean = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"))
        .unwrap_or(url);
    let host = clean.split('/').next().unwrap_or("");
    let host = host.split('?').next().unwrap_or("");
    let host = strip_www(host);
    if host.is_empty() {
        None
    } else {
        Some(host.to_string())
    }
}

pub fn same_domain(a: Option<&str>, b: Option<&str>) -> bool {
    match (a.and_then(extract_domain), b.and_then(extract_domain)) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(&b),
        _ => false,
    }
}

pub fn is_valid_domain(domain: &str) -> bool {
    if INTERNAL_PREFIXES.iter().any(|p| domain.starts_with(p)) {
        return false;
    }
    VALID_DOMAIN.is_match(domain) && domain.len() < 100 && domain.contains('.')
}

/// Lowercase and drop a leading `www.`.
pub fn normalize_domain(domain: &str) -> String {
    strip_www(&domain.trim().to_lowercase()).to_string()
}

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

fn has_web_suffix(domain: &str) -> bool {
    let lower = domain.to_lowercase();
    WEB_SUFFIXES.iter().any(|s| lower.ends_with(s))
}

/// Absolute URL in `text`, or a bare domain that looks like a real website.
/// Bare domains must end in one of the common web suffixes.
pub fn url_from_text(text: &str) -> Option<String> {
    find_url(text, true)
}

/// Like [`url_from_text`] for text that names a location by construction
/// (address bars, window titles), so any valid domain is accepted.
pub fn url_from_location_text(text: &str) -> Option<String> {
    find_url(text, false)
}

fn find_url(text: &str, free_text: bool) -> Option<String> {
    if let Some(m) = URL_PATTERN.find(text) {
        return Some(m.as_str().to_string());
    }

    if text.chars().count() >= MAX_DOMAIN_TEXT_LEN {
        return None;
    }

    let found = DOMAIN_PATTERN.find(text)?;
    let domain = found.as_str();

    if TEXT_INTERNAL_PREFIXES.iter().any(|p| domain.starts_with(p)) {
        debug!("Filtered package-like domain: {}", domain);
        return None;
    }

    // part of an email address
    if let Some(at) = text.find('@')
        && found.start() >= at
    {
        return None;
    }

    if free_text && !has_web_suffix(domain) {
        return None;
    }
    if !free_text && !is_valid_domain(domain) {
        return None;
    }

    Some(format!("https://{}", domain))
}

fn webview_domain(node: &Node) -> Option<String> {
    if node.class_name.as_deref() != Some(WEBVIEW_CLASS) {
        return None;
    }
    node.web_domain
        .as_deref()
        .filter(|d| is_valid_domain(d))
        .map(|d| format!("https://{}", d))
}

fn text_or_description_url(node: &Node) -> Option<String> {
    node.text
        .as_deref()
        .and_then(url_from_text)
        .or_else(|| node.content_description.as_deref().and_then(url_from_text))
}

fn address_bar_url(tree: &ViewTree, ids: &[&str]) -> Option<String> {
    tree.nodes()
        .filter(|n| n.id_entry.as_deref().is_some_and(|id| ids.contains(&id)))
        .find_map(|n| {
            n.text
                .as_deref()
                .and_then(url_from_location_text)
                .or_else(|| {
                    n.content_description
                        .as_deref()
                        .and_then(url_from_location_text)
                })
        })
}

fn chrome_url(tree: &ViewTree) -> Option<String> {
    tree.nodes()
        .find_map(webview_domain)
        .or_else(|| address_bar_url(tree, CHROME_ADDRESS_IDS))
        .or_else(|| tree.nodes().find_map(text_or_description_url))
}

fn firefox_url(tree: &ViewTree) -> Option<String> {
    address_bar_url(tree, FIREFOX_ADDRESS_IDS).or_else(|| {
        tree.nodes()
            .filter_map(|n| n.text.as_deref())
            .filter(|t| t.contains("http://") || t.contains("https://"))
            .find_map(|t| URL_PATTERN.find(t).map(|m| m.as_str().to_string()))
    })
}

fn url_in_node(node: &Node) -> Option<String> {
    if let Some(url) = webview_domain(node) {
        return Some(url);
    }

    if let Some(html) = &node.html {
        let from_attr = html
            .attributes
            .iter()
            .filter(|(key, _)| {
                let key = key.to_lowercase();
                key.contains("url") || key.contains("href")
            })
            .find_map(|(_, value)| url_from_text(value));
        if from_attr.is_some() {
            return from_attr;
        }
    }

    node.text
        .as_deref()
        .and_then(url_from_text)
        .or_else(|| node.hint.as_deref().and_then(url_from_text))
}

fn domain_in_any_text(tree: &ViewTree) -> Option<String> {
    tree.nodes()
        .flat_map(|n| {
            [
                n.text.as_deref(),
                n.content_description.as_deref(),
                n.hint.as_deref(),
            ]
        })
        .flatten()
        .filter(|t| !t.trim().is_empty() && t.chars().count() < MAX_TEXT_SCAN_LEN)
        .find_map(url_from_text)
}
