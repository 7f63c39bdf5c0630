//! Read-only model of a view snapshot delivered by the host for one page visit.
//!
//! Every descriptor is optional: a missing text, id or attribute list is simply
//! "no signal" for the heuristics, never an error.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Opaque per-field identity, stable for the duration of one page visit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldId(String);

impl FieldId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Positional handle for nodes the host did not give an identity to.
    pub fn positional(window: usize, index: usize) -> Self {
        Self(format!("node:{}.{}", window, index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for FieldId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

/// HTML-like tag information exposed by web content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HtmlInfo {
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub attributes: Vec<(String, String)>,
}

impl HtmlInfo {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: Some(tag.to_string()),
            attributes: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.push((name.to_string(), value.to_string()));
        self
    }

    /// First value for `name`, compared case-insensitively.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Lowercased tag name, if any.
    pub fn tag_lower(&self) -> Option<String> {
        self.tag.as_ref().map(|t| t.to_lowercase())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(default)]
    pub autofill_id: Option<String>,
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub id_entry: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub content_description: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
    #[serde(default)]
    pub input_type: u32,
    #[serde(default)]
    pub autofill_hints: Vec<String>,
    #[serde(default)]
    pub html: Option<HtmlInfo>,
    #[serde(default)]
    pub web_domain: Option<String>,
    /// Value the user entered, present on save events.
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(class_name: &str) -> Self {
        Self {
            class_name: Some(class_name.to_string()),
            ..Self::default()
        }
    }

    pub fn with_autofill_id(mut self, id: &str) -> Self {
        self.autofill_id = Some(id.to_string());
        self
    }

    pub fn with_id_entry(mut self, id: &str) -> Self {
        self.id_entry = Some(id.to_string());
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    pub fn with_content_description(mut self, desc: &str) -> Self {
        self.content_description = Some(desc.to_string());
        self
    }

    pub fn with_hint(mut self, hint: &str) -> Self {
        self.hint = Some(hint.to_string());
        self
    }

    pub fn with_input_type(mut self, input_type: u32) -> Self {
        self.input_type = input_type;
        self
    }

    pub fn with_autofill_hint(mut self, hint: &str) -> Self {
        self.autofill_hints.push(hint.to_string());
        self
    }

    pub fn with_html(mut self, html: HtmlInfo) -> Self {
        self.html = Some(html);
        self
    }

    pub fn with_web_domain(mut self, domain: &str) -> Self {
        self.web_domain = Some(domain.to_string());
        self
    }

    pub fn with_value(mut self, value: &str) -> Self {
        self.value = Some(value.to_string());
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    /// Pre-order walk over this node and its descendants, children in order.
    pub fn walk(&self) -> PreOrder<'_> {
        PreOrder { stack: vec![self] }
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn class_lower(&self) -> Option<String> {
        self.class_name.as_ref().map(|c| c.to_lowercase())
    }

    pub fn html_attr(&self, name: &str) -> Option<&str> {
        self.html.as_ref().and_then(|h| h.attr(name))
    }
}

/// Iterative pre-order traversal; deep trees never touch the call stack.
pub struct PreOrder<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Window {
    #[serde(default)]
    pub title: Option<String>,
    pub root: Node,
}

/// One page-visit snapshot: the hosting package plus its windows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewTree {
    #[serde(default)]
    pub package: Option<String>,
    #[serde(default)]
    pub windows: Vec<Window>,
}

impl ViewTree {
    pub fn new(package: Option<&str>) -> Self {
        Self {
            package: package.map(str::to_string),
            windows: Vec::new(),
        }
    }

    /// Single-window snapshot, the common case.
    pub fn single(package: Option<&str>, root: Node) -> Self {
        Self::new(package).with_window(None, root)
    }

    pub fn with_window(mut self, title: Option<&str>, root: Node) -> Self {
        self.windows.push(Window {
            title: title.map(str::to_string),
            root,
        });
        self
    }

    /// All nodes of all windows, windows in order, each walked pre-order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.windows.iter().flat_map(|w| w.root.walk())
    }

    pub fn package(&self) -> Option<&str> {
        self.package.as_deref()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }
}
