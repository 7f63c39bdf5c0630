//! Values the user typed into credential fields, and the username/password
//! pairs they form.

use crate::classify::{autofillable_nodes, detect_role};
use crate::compat::BankConfig;
use crate::tree::{FieldId, ViewTree};
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedField {
    pub id: FieldId,
    pub role: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialPair {
    pub username: String,
    pub password: String,
}

/// Non-blank values of autofillable fields, in document order.
pub fn extract_submitted(tree: &ViewTree) -> Vec<SubmittedField> {
    autofillable_nodes(tree)
        .filter_map(|(id, node)| {
            let value = node.value.as_deref()?.trim();
            if value.is_empty() {
                return None;
            }
            Some(SubmittedField {
                id,
                role: detect_role(node).as_str().to_string(),
                value: value.to_string(),
            })
        })
        .collect()
}

/// Build username/password pairs. Known sites read their own hint vocabulary;
/// everything else pairs every login-like value with every password-like one.
pub fn credential_pairs(
    fields: &[SubmittedField],
    config: Option<&BankConfig>,
) -> Vec<CredentialPair> {
    let values = by_role(fields);

    let mut pairs = Vec::new();
    match config {
        Some(config) => {
            let first_of = |hints: &[&str]| {
                hints
                    .iter()
                    .find_map(|h| values.iter().find(|(role, _)| role == h))
                    .map(|(_, v)| v.clone())
            };
            if let (Some(username), Some(password)) =
                (first_of(config.username_hints), first_of(config.password_hints))
            {
                debug!("Paired {} credential from site-specific fields", config.name);
                pairs.push(CredentialPair { username, password });
            }
        }
        None => {
            let users = values.iter().filter(|(role, _)| {
                ["username", "email", "user", "login"]
                    .iter()
                    .any(|k| role.to_lowercase().contains(k))
            });
            for (_, username) in users {
                let passwords = values
                    .iter()
                    .filter(|(role, _)| role.to_lowercase().contains("pass"));
                for (_, password) in passwords {
                    pairs.push(CredentialPair {
                        username: username.clone(),
                        password: password.clone(),
                    });
                }
            }
        }
    }

    let mut seen = std::collections::HashSet::new();
    pairs.retain(|p| seen.insert(p.username.clone()));
    pairs
}

/// One value per role; a later field with the same role replaces the earlier value.
fn by_role(fields: &[SubmittedField]) -> Vec<(String, String)> {
    let mut values: Vec<(String, String)> = Vec::new();
    for field in fields {
        match values.iter_mut().find(|(role, _)| *role == field.role) {
            Some(slot) => slot.1 = field.value.clone(),
            None => values.push((field.role.clone(), field.value.clone())),
        }
    }
    values
}
