//! Human-friendly page titles.
//!
//! Strategies run from most to least trustworthy and the first non-empty
//! result wins: known domain names, HTML headings, meta tags, navigation
//! chrome, then a scored pass over every visible text.

use crate::identify::PageInfo;
use crate::tree::ViewTree;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use tracing::debug;

pub const FALLBACK_TITLE: &str = "Website";

static LETTERS_THEN_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z]+[0-9]+").unwrap());
static UPPER_BEFORE_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Z].*[0-9]").unwrap());
static NUMERIC_ONLY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]+$").unwrap());
static PHONE_LIKE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?[0-9\-()\s]+$").unwrap());

const BRANDS: &[(&str, &str)] = &[
    ("github", "GitHub"),
    ("google", "Google"),
    ("facebook", "Facebook"),
    ("twitter", "Twitter"),
    ("linkedin", "LinkedIn"),
    ("instagram", "Instagram"),
    ("youtube", "YouTube"),
    ("netflix", "Netflix"),
    ("amazon", "Amazon"),
    ("microsoft", "Microsoft"),
    ("apple", "Apple"),
    ("stackoverflow", "Stack Overflow"),
    ("reddit", "Reddit"),
    ("wikipedia", "Wikipedia"),
    ("medium", "Medium"),
    ("dropbox", "Dropbox"),
    ("slack", "Slack"),
    ("discord", "Discord"),
    ("zoom", "Zoom"),
    ("paypal", "PayPal"),
    ("stripe", "Stripe"),
    ("shopify", "Shopify"),
    ("wordpress", "WordPress"),
    ("blogger", "Blogger"),
    ("tumblr", "Tumblr"),
    ("pinterest", "Pinterest"),
    ("twitch", "Twitch"),
    ("spotify", "Spotify"),
    ("soundcloud", "SoundCloud"),
    ("vimeo", "Vimeo"),
    ("dailymotion", "Dailymotion"),
];

/// Environment words checked after brands and app-hosting suffixes.
const ENVIRONMENT_HINTS: &[(&str, &str)] = &[
    ("testautomation", "Test Automation"),
    ("practice", "Practice Site"),
    ("demo", "Demo Site"),
    ("test", "Test Site"),
    ("staging", "Staging Site"),
    ("dev", "Development Site"),
];

/// App-hosting suffixes whose first label names the app.
const HOSTED_APPS: &[(&str, &str)] = &[
    ("herokuapp.com", "Heroku App"),
    ("vercel.app", "Vercel App"),
    ("netlify.app", "Netlify App"),
    ("firebaseapp.com", "Firebase App"),
];

const URL_HINTS: &[(&str, &str)] = &[
    ("github.io", "GitHub Pages"),
    ("vercel.app", "Vercel App"),
    ("netlify.app", "Netlify App"),
    ("firebaseapp.com", "Firebase App"),
    ("testautomation", "Test Automation"),
    ("practice", "Practice Site"),
    ("demo", "Demo Site"),
    ("test", "Test Site"),
    ("staging", "Staging"),
    ("dev", "Development"),
];

const GENERIC_TEXTS: &[&str] = &[
    "preview", "loading", "submit", "button", "click", "here", "username", "password", "email",
    "login", "signin", "signup", "register", "forgot", "remember", "back", "next", "continue",
    "cancel", "close", "ok", "yes", "no", "save", "delete", "edit", "update", "refresh", "reload",
    "search", "filter",
];

const BROWSER_UI_TEXTS: &[&str] = &[
    "chrome", "firefox", "safari", "edge", "browser", "tab", "window", "bookmark", "history",
    "settings", "menu", "toolbar", "address", "url", "search",
];

const TITLE_WORDS: &[&str] = &[
    "login", "sign", "home", "dashboard", "app", "site", "page", "portal",
];

const NAV_CLASS_HINTS: &[&str] = &["toolbar", "header", "navbar", "navigation"];
const NAV_ID_HINTS: &[&str] = &["toolbar", "header", "title", "brand"];
const META_PROPERTIES: &[&str] = &["og:title", "twitter:title"];
const META_NAMES: &[&str] = &["title", "application-name"];

/// Best title the snapshot offers, or `None` when every strategy comes up empty.
pub fn best_title(tree: &ViewTree, url: Option<&str>, domain: Option<&str>) -> Option<String> {
    if let Some(domain) = domain
        && domain != "com.android"
    {
        let title = friendly_domain_title(domain);
        debug!("Domain title: {}", title);
        return Some(title);
    }

    let strategies: [(&str, fn(&ViewTree) -> Vec<String>); 3] = [
        ("HTML", html_titles),
        ("meta", meta_titles),
        ("navigation", navigation_titles),
    ];
    for (source, collect) in strategies {
        if let Some(title) = select_best_title(&collect(tree)) {
            debug!("{} title: {}", source, title);
            return Some(title);
        }
    }

    if let Some(title) = rank_candidates(text_candidates(tree)).into_iter().next() {
        debug!("Ranked text title: {}", title);
        return Some(title);
    }

    url.and_then(title_from_url)
}

/// Title for display and credential labels; never empty.
pub fn display_title(tree: &ViewTree, page: &PageInfo) -> String {
    best_title(tree, page.url.as_deref(), page.domain.as_deref())
        .unwrap_or_else(|| FALLBACK_TITLE.to_string())
}

pub fn friendly_domain_title(domain: &str) -> String {
    let lower = domain.to_lowercase();

    if let Some((_, name)) = BRANDS.iter().find(|(needle, _)| lower.contains(needle)) {
        return name.to_string();
    }

    if let Some(title) = hosted_app_title(&lower) {
        return title;
    }

    if let Some((_, name)) = ENVIRONMENT_HINTS
        .iter()
        .find(|(needle, _)| lower.contains(needle))
    {
        return name.to_string();
    }

    let parts: Vec<&str> = domain.split('.').collect();
    if parts.len() >= 2 {
        capitalize(parts[parts.len() - 2])
    } else {
        capitalize(domain)
    }
}

fn hosted_app_title(lower: &str) -> Option<String> {
    HOSTED_APPS.iter().find_map(|(suffix, fallback)| {
        if lower == *suffix {
            return Some(fallback.to_string());
        }
        let app = lower.strip_suffix(suffix)?.strip_suffix('.')?;
        Some(if app.is_empty() {
            fallback.to_string()
        } else {
            title_case_words(app)
        })
    })
}

/// `my-cool-app` becomes `My Cool App`.
fn title_case_words(slug: &str) -> String {
    slug.split('-')
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn push_distinct(titles: &mut Vec<String>, title: &str) {
    if !titles.iter().any(|t| t == title) {
        titles.push(title.to_string());
    }
}

fn html_titles(tree: &ViewTree) -> Vec<String> {
    let mut titles = Vec::new();
    for node in tree.nodes() {
        let Some(tag) = node.html.as_ref().and_then(|h| h.tag_lower()) else {
            continue;
        };
        let max = match tag.as_str() {
            "title" => 100,
            "h1" | "h2" | "h3" => 60,
            _ => continue,
        };
        if let Some(text) = node.text().map(str::trim)
            && (3..=max).contains(&char_len(text))
        {
            push_distinct(&mut titles, text);
        }
    }
    titles
}

fn meta_titles(tree: &ViewTree) -> Vec<String> {
    let mut titles = Vec::new();
    for html in tree.nodes().filter_map(|n| n.html.as_ref()) {
        if html.tag_lower().as_deref() != Some("meta") {
            continue;
        }
        let is_title_meta = html.attributes.iter().any(|(key, value)| {
            match key.to_lowercase().as_str() {
                "property" => META_PROPERTIES.contains(&value.as_str()),
                "name" => META_NAMES.contains(&value.as_str()),
                _ => false,
            }
        });
        if is_title_meta
            && let Some(content) = html.attr("content").map(str::trim)
            && (3..=100).contains(&char_len(content))
        {
            push_distinct(&mut titles, content);
        }
    }
    titles
}

fn navigation_titles(tree: &ViewTree) -> Vec<String> {
    let mut titles = Vec::new();
    for node in tree.nodes() {
        let class = node.class_lower().unwrap_or_default();
        let id = node.id_entry.as_deref().unwrap_or_default().to_lowercase();
        let is_nav = NAV_CLASS_HINTS.iter().any(|h| class.contains(h))
            || NAV_ID_HINTS.iter().any(|h| id.contains(h));
        if !is_nav {
            continue;
        }
        if let Some(text) = node.text().map(str::trim)
            && (3..=50).contains(&char_len(text))
            && !is_generic_text(text)
        {
            push_distinct(&mut titles, text);
        }
    }
    titles
}

fn text_candidates(tree: &ViewTree) -> Vec<String> {
    tree.nodes()
        .filter_map(|n| n.text())
        .filter(|t| (3..=100).contains(&char_len(t)) && !NUMERIC_ONLY.is_match(t))
        .map(|t| t.trim().to_string())
        .collect()
}

/// Highest-scoring non-generic title; ties keep document order.
fn select_best_title(titles: &[String]) -> Option<String> {
    let mut best: Option<(&String, i32)> = None;
    for title in titles.iter().filter(|t| !is_generic_text(t)) {
        let score = title_score(title);
        if best.is_none_or(|(_, top)| score > top) {
            best = Some((title, score));
        }
    }
    best.map(|(title, _)| title.clone())
}

/// Plausible titles from free text, best first.
pub fn rank_candidates(candidates: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut ranked: Vec<String> = candidates
        .into_iter()
        .filter(|t| {
            (3..=60).contains(&char_len(t))
                && !is_generic_text(t)
                && !looks_like_user_input(t)
                && !is_browser_ui(t)
        })
        .filter(|t| seen.insert(t.trim().to_lowercase()))
        .collect();
    ranked.sort_by_key(|t| std::cmp::Reverse(title_score(t)));
    ranked.truncate(5);
    ranked
}

pub fn title_score(title: &str) -> i32 {
    let len = char_len(title);
    let mut score = match len {
        5..=25 => 10,
        26..=40 => 8,
        3..=4 => 5,
        41..=60 => 3,
        _ => 0,
    };

    let digits = title.chars().filter(|c| c.is_ascii_digit()).count();
    if digits > len / 2 {
        score -= 5;
    }

    let lower = title.to_lowercase();
    if TITLE_WORDS.iter().any(|w| lower.contains(w)) {
        score += 3;
    }

    if LETTERS_THEN_DIGITS.is_match(title) || UPPER_BEFORE_DIGIT.is_match(title) {
        score -= 8;
    }

    let well_capitalized = title.split(' ').all(|word| {
        word.chars().next().is_some_and(|first| {
            first.is_uppercase() || word.chars().all(|c| c.is_lowercase())
        })
    });
    if well_capitalized {
        score += 2;
    }

    score
}

/// Button labels, field labels and numbers; never a page title.
pub fn is_generic_text(text: &str) -> bool {
    GENERIC_TEXTS.iter().any(|g| text.eq_ignore_ascii_case(g))
        || NUMERIC_ONLY.is_match(text)
        || char_len(text) < 3
}

/// Values a user would type: `student123`, `Password1`, emails, phone numbers.
pub fn looks_like_user_input(text: &str) -> bool {
    LETTERS_THEN_DIGITS.is_match(text)
        || UPPER_BEFORE_DIGIT.is_match(text)
        || text.contains('@')
        || PHONE_LIKE.is_match(text)
}

pub fn is_browser_ui(text: &str) -> bool {
    let lower = text.to_lowercase();
    BROWSER_UI_TEXTS.iter().any(|w| lower.contains(w))
}

pub fn title_from_url(url: &str) -> Option<String> {
    if url.contains("herokuapp.com") {
        let host = url.split_once("://").map_or(url, |(_, rest)| rest);
        let app = host.split(".herokuapp.com").next().unwrap_or_default();
        return Some(if app.is_empty() {
            "Heroku App".to_string()
        } else {
            title_case_words(app)
        });
    }

    URL_HINTS
        .iter()
        .find(|(needle, _)| url.contains(needle))
        .map(|(_, title)| title.to_string())
}
