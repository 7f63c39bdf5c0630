//! Site-specific corrections for login forms that defeat the generic classifier.
//!
//! The rules are data: supporting another site means adding a row to
//! [`KNOWN_SITES`], not writing code.

use crate::classify::{ClassifiedField, FieldRole};
use crate::urls::normalize_domain;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub struct BankConfig {
    pub domain: &'static str,
    pub name: &'static str,
    pub username_field_names: &'static [&'static str],
    pub password_field_names: &'static [&'static str],
    pub username_hints: &'static [&'static str],
    pub password_hints: &'static [&'static str],
    pub has_overlay: bool,
    pub requires_special_handling: bool,
}

impl BankConfig {
    /// Chilean online banking: RUT as the login and autocomplete hints misused
    /// as field roles.
    const fn chilean(domain: &'static str, name: &'static str) -> Self {
        Self {
            domain,
            name,
            username_field_names: &["rut", "usuario", "username"],
            password_field_names: &["pass", "password", "clave"],
            username_hints: &["off", "username", "rut"],
            password_hints: &["new-password", "current-password", "password"],
            has_overlay: true,
            requires_special_handling: true,
        }
    }
}

const KNOWN_SITES: &[BankConfig] = &[
    BankConfig::chilean("bancoestado.cl", "BancoEstado"),
    BankConfig::chilean("santander.cl", "Banco Santander"),
    BankConfig::chilean("bci.cl", "Banco BCI"),
    BankConfig::chilean("bancodechile.cl", "Banco de Chile"),
    BankConfig::chilean("corpbanca.cl", "CorpBanca"),
    BankConfig::chilean("bancofalabella.cl", "Banco Falabella"),
];

static BY_DOMAIN: Lazy<HashMap<&'static str, &'static BankConfig>> =
    Lazy::new(|| KNOWN_SITES.iter().map(|c| (c.domain, c)).collect());

const RUT_INDICATORS: &[&str] = &["rut", "usuario", "user", "login"];
const PASSWORD_INDICATORS: &[&str] = &["pass", "clave", "password", "pwd"];

pub fn lookup(domain: &str) -> Option<&'static BankConfig> {
    BY_DOMAIN.get(normalize_domain(domain).as_str()).copied()
}

pub fn is_known(domain: &str) -> bool {
    lookup(domain).is_some()
}

pub fn display_name(domain: &str) -> String {
    lookup(domain)
        .map(|c| c.name.to_string())
        .unwrap_or_else(|| domain.to_string())
}

pub fn has_overlay(domain: &str) -> bool {
    lookup(domain).is_some_and(|c| c.has_overlay)
}

pub fn requires_special_handling(domain: &str) -> bool {
    lookup(domain).is_some_and(|c| c.requires_special_handling)
}

/// Rewrite field roles for a known site. Unknown domains get the fields back
/// untouched.
pub fn enhance(domain: &str, fields: &[ClassifiedField]) -> Vec<ClassifiedField> {
    let Some(config) = lookup(domain) else {
        return fields.to_vec();
    };

    info!(
        "Applying {} compatibility rules to {} fields",
        config.name,
        fields.len()
    );

    fields
        .iter()
        .map(|field| {
            let role = corrected_role(config, field);
            if role != field.role {
                debug!("Field {}: {} -> {}", field.id, field.role, role);
            }
            ClassifiedField {
                role,
                ..field.clone()
            }
        })
        .collect()
}

fn corrected_role(config: &BankConfig, field: &ClassifiedField) -> FieldRole {
    let role = field.role.as_str();
    let text = field.text.as_deref().map(str::to_lowercase);
    let handle = field.id.as_str().to_lowercase();

    let text_has = |needle: &str| text.as_deref().is_some_and(|t| t.contains(needle));

    let rut_field = RUT_INDICATORS
        .iter()
        .any(|i| text_has(*i) || handle.contains(i));
    if config.username_hints.contains(&role) || text_has("rut") || rut_field {
        return FieldRole::Username;
    }

    let role_lower = role.to_lowercase();
    let password_field = PASSWORD_INDICATORS
        .iter()
        .any(|i| role_lower.contains(i) || handle.contains(i));
    if config.password_hints.contains(&role) || role.contains("password") || password_field {
        return FieldRole::Password;
    }

    field.role.clone()
}
