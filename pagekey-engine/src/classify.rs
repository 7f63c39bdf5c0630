//! Field classification: which nodes take credentials, and in what role.

use crate::tree::{FieldId, Node, ViewTree};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Input-type bit flags as reported by the host.
pub mod input_type {
    pub const TEXT: u32 = 0x0000_0001;
    pub const EMAIL_ADDRESS: u32 = 0x0000_0021;
    pub const PASSWORD: u32 = 0x0000_0081;
    pub const NUMBER: u32 = 0x0000_0003;

    pub const TEXT_LIKE: [u32; 4] = [TEXT, EMAIL_ADDRESS, PASSWORD, NUMBER];
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldRole {
    Username,
    EmailAddress,
    Password,
    Phone,
    Name,
    /// Raw hint the host supplied that maps to none of the known roles.
    Other(String),
}

impl FieldRole {
    pub fn as_str(&self) -> &str {
        match self {
            FieldRole::Username => "username",
            FieldRole::EmailAddress => "emailAddress",
            FieldRole::Password => "password",
            FieldRole::Phone => "phone",
            FieldRole::Name => "name",
            FieldRole::Other(raw) => raw,
        }
    }

    /// Username and email fields both receive the stored username.
    pub fn is_login(&self) -> bool {
        matches!(self, FieldRole::Username | FieldRole::EmailAddress)
    }
}

impl From<&str> for FieldRole {
    fn from(raw: &str) -> Self {
        match raw {
            "username" => FieldRole::Username,
            "emailAddress" => FieldRole::EmailAddress,
            "password" => FieldRole::Password,
            "phone" => FieldRole::Phone,
            "name" => FieldRole::Name,
            other => FieldRole::Other(other.to_string()),
        }
    }
}

impl From<String> for FieldRole {
    fn from(raw: String) -> Self {
        FieldRole::from(raw.as_str())
    }
}

impl From<FieldRole> for String {
    fn from(role: FieldRole) -> Self {
        role.as_str().to_string()
    }
}

impl fmt::Display for FieldRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedField {
    pub id: FieldId,
    pub role: FieldRole,
    pub text: Option<String>,
}

const HTML_INPUT_TYPES: &[&str] = &["text", "email", "password", "tel"];

/// Classify every autofillable node, in document order.
pub fn classify(tree: &ViewTree) -> Vec<ClassifiedField> {
    autofillable_nodes(tree)
        .map(|(id, node)| {
            let role = detect_role(node);
            debug!("Field {} classified as {}", id, role);
            ClassifiedField {
                id,
                role,
                text: node.text.clone(),
            }
        })
        .collect()
}

/// Autofillable nodes with their handles. Nodes without a host identity get
/// a positional handle built from the window and pre-order index.
pub(crate) fn autofillable_nodes(tree: &ViewTree) -> impl Iterator<Item = (FieldId, &Node)> {
    tree.windows.iter().enumerate().flat_map(|(w, window)| {
        window
            .root
            .walk()
            .enumerate()
            .filter(|(_, node)| is_autofillable(node))
            .map(move |(i, node)| {
                let id = match node.autofill_id.as_deref() {
                    Some(raw) if !raw.is_empty() => FieldId::new(raw),
                    _ => FieldId::positional(w, i),
                };
                (id, node)
            })
    })
}

pub fn is_autofillable(node: &Node) -> bool {
    if !node.autofill_hints.is_empty() {
        return true;
    }

    if node.class_lower().is_some_and(|c| c.contains("edittext")) {
        return true;
    }

    if let Some(html) = &node.html
        && html.tag_lower().as_deref() == Some("input")
        && let Some(kind) = html.attr("type")
        && HTML_INPUT_TYPES.contains(&kind.to_lowercase().as_str())
    {
        return true;
    }

    node.input_type != 0
        && input_type::TEXT_LIKE
            .iter()
            .any(|flag| node.input_type & flag != 0)
}

/// Role for a single node; first matching signal wins.
pub fn detect_role(node: &Node) -> FieldRole {
    if let Some(hint) = node.autofill_hints.first() {
        return FieldRole::from(hint.as_str());
    }

    if let Some(role) = html_role(node) {
        return role;
    }

    if let Some(role) = input_type_role(node.input_type) {
        return role;
    }

    [node.text.as_deref(), node.hint.as_deref()]
        .into_iter()
        .flatten()
        .find_map(|s| keyword_role(&s.to_lowercase()))
        .unwrap_or(FieldRole::Username)
}

fn html_role(node: &Node) -> Option<FieldRole> {
    let html = node.html.as_ref()?;

    match html.attr("type").map(str::to_lowercase).as_deref() {
        Some("email") => return Some(FieldRole::EmailAddress),
        Some("password") => return Some(FieldRole::Password),
        Some("tel") => return Some(FieldRole::Phone),
        _ => {}
    }

    ["name", "id"]
        .iter()
        .filter_map(|attr| html.attr(attr))
        .find_map(|value| attribute_role(&value.to_lowercase()))
}

fn attribute_role(value: &str) -> Option<FieldRole> {
    if value.contains("email") || value.contains("mail") {
        Some(FieldRole::EmailAddress)
    } else if value.contains("user") || value.contains("login") {
        Some(FieldRole::Username)
    } else if value.contains("pass") {
        Some(FieldRole::Password)
    } else if value.contains("phone") || value.contains("tel") {
        Some(FieldRole::Phone)
    } else if value.contains("name") {
        Some(FieldRole::Name)
    } else {
        None
    }
}

fn input_type_role(mask: u32) -> Option<FieldRole> {
    let has = |flag: u32| mask & flag == flag;
    if has(input_type::EMAIL_ADDRESS) {
        Some(FieldRole::EmailAddress)
    } else if has(input_type::PASSWORD) {
        Some(FieldRole::Password)
    } else if has(input_type::NUMBER) {
        Some(FieldRole::Phone)
    } else {
        None
    }
}

fn keyword_role(text: &str) -> Option<FieldRole> {
    let any = |words: &[&str]| words.iter().any(|w| text.contains(w));
    if any(&["email", "correo"]) {
        Some(FieldRole::EmailAddress)
    } else if any(&["user", "usuario"]) {
        Some(FieldRole::Username)
    } else if any(&["pass", "contraseña"]) {
        Some(FieldRole::Password)
    } else if any(&["phone", "teléfono", "telefono"]) {
        Some(FieldRole::Phone)
    } else if any(&["name", "nombre"]) {
        Some(FieldRole::Name)
    } else {
        None
    }
}
