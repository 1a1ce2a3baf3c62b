//! Tenant registry data models
//!
//! Defines the canonical tenant configuration and the accepted shapes of
//! the registry document.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

/// Normalize a slug for lookup: trimmed and lower-cased
pub fn normalize_slug(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Widget color tokens for a municipality
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Theme {
    /// Background color
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bg: Option<String>,
    /// Accent color
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<String>,
}

/// Canonical tenant configuration, immutable once loaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantConfig {
    /// Normalized lookup key
    pub slug: String,
    /// Display name (falls back to the slug)
    pub name: String,
    /// Municipality website (empty when unknown)
    pub website_url: String,
    /// Upstream assistant answering for this tenant
    pub assistant_id: Option<String>,
    /// Optional widget theme
    pub theme: Option<Theme>,
}

impl TenantConfig {
    /// The tenant's own assistant identity, if it is non-empty
    pub fn assistant_id(&self) -> Option<&str> {
        self.assistant_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// A tenant record as written in the registry document
///
/// Every field is optional; the key comes from `slug`, `id` or the map key
/// depending on the document shape.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TenantRecord {
    #[serde(default)]
    slug: Option<String>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    website_url: Option<String>,
    #[serde(default, alias = "assistantId")]
    assistant_id: Option<String>,
    #[serde(default)]
    theme: Option<Theme>,
}

impl TenantRecord {
    fn key(&self) -> Option<String> {
        self.slug
            .as_deref()
            .or(self.id.as_deref())
            .map(normalize_slug)
            .filter(|s| !s.is_empty())
    }

    fn into_config(self, slug: String) -> TenantConfig {
        let name = self
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| slug.clone());
        TenantConfig {
            name,
            website_url: self.website_url.unwrap_or_default(),
            assistant_id: self.assistant_id,
            theme: self.theme,
            slug,
        }
    }
}

/// The registry document, in any of its accepted shapes
///
/// Variant order matters for untagged deserialization: an array is tried
/// first, then the `municipalities` wrapper, then the slug-keyed map.
/// Entries stay raw JSON here and are decoded one at a time, so a single
/// malformed entry does not take the whole registry down.
#[derive(Debug, Clone, Deserialize)]
#[serde(
    untagged,
    expecting = "an array of municipalities, a {\"municipalities\": [...]} object or a slug-keyed object"
)]
pub enum RegistryDocument {
    /// `[ { "slug": "radim", ... }, ... ]`
    List(Vec<Value>),
    /// `{ "municipalities": [ ... ] }`
    Wrapped {
        /// Tenant records
        municipalities: Vec<Value>,
    },
    /// `{ "radim": { "name": ... }, ... }`, iterated in sorted key order
    Keyed(BTreeMap<String, Value>),
}

fn decode_record(entry: Value, position: &str) -> Option<TenantRecord> {
    match serde_json::from_value(entry) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!(entry = %position, error = %e, "Skipping malformed registry record");
            None
        }
    }
}

impl RegistryDocument {
    /// Normalize the document into a slug → tenant map
    ///
    /// Malformed records and records without a key are skipped. On duplicate
    /// keys the first record wins: document order for arrays, sorted raw key
    /// order for the keyed shape.
    pub fn into_tenants(self) -> HashMap<String, TenantConfig> {
        let keyed: Vec<(Option<String>, TenantRecord)> = match self {
            RegistryDocument::List(entries)
            | RegistryDocument::Wrapped {
                municipalities: entries,
            } => entries
                .into_iter()
                .enumerate()
                .filter_map(|(i, entry)| decode_record(entry, &format!("#{}", i)))
                .map(|r| (r.key(), r))
                .collect(),
            RegistryDocument::Keyed(map) => map
                .into_iter()
                .filter_map(|(key, entry)| {
                    let record = decode_record(entry, &key)?;
                    Some((Some(normalize_slug(&key)).filter(|k| !k.is_empty()), record))
                })
                .collect(),
        };

        let mut tenants = HashMap::with_capacity(keyed.len());
        for (key, record) in keyed {
            let Some(slug) = key else {
                warn!("Skipping registry record without slug or id");
                continue;
            };
            if tenants.contains_key(&slug) {
                warn!(slug = %slug, "Duplicate registry record ignored");
                continue;
            }
            tenants.insert(slug.clone(), record.into_config(slug));
        }
        tenants
    }
}
