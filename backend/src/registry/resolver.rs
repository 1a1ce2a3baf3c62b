//! Tenant resolution
//!
//! The registry document is loaded at most once per resolver. The outcome,
//! success or failure, is cached for the resolver's lifetime.

use super::models::{normalize_slug, RegistryDocument, TenantConfig};
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

/// Errors returned by tenant resolution
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// No tenant is registered under the slug
    #[error("Municipality \"{0}\" is not in the registry")]
    NotFound(String),

    /// The registry could not be loaded; permanent for the process
    #[error("Registry unavailable: {0}")]
    Unavailable(String),
}

/// Point lookups of tenant configurations
pub trait TenantResolver: Send + Sync {
    /// Resolve a slug to its tenant configuration
    ///
    /// The slug is normalized before lookup.
    fn resolve(&self, slug: &str) -> Result<TenantConfig, RegistryError>;
}

/// Where the registry document comes from
pub trait RegistrySource: Send + Sync {
    /// Read and parse the registry document
    fn load(&self) -> Result<RegistryDocument, RegistryError>;
}

/// Registry document stored in a JSON file
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    /// Create a source reading the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RegistrySource for FileSource {
    fn load(&self) -> Result<RegistryDocument, RegistryError> {
        if !self.path.exists() {
            return Err(RegistryError::Unavailable(format!(
                "Registry not found: {}",
                self.path.display()
            )));
        }
        let raw = fs::read_to_string(&self.path).map_err(|e| {
            RegistryError::Unavailable(format!("Failed to read {}: {}", self.path.display(), e))
        })?;
        parse_document(&raw)
    }
}

/// Registry document held in memory as JSON text
#[derive(Debug, Clone)]
pub struct InlineSource(pub String);

impl RegistrySource for InlineSource {
    fn load(&self) -> Result<RegistryDocument, RegistryError> {
        parse_document(&self.0)
    }
}

fn parse_document(raw: &str) -> Result<RegistryDocument, RegistryError> {
    serde_json::from_str(raw)
        .map_err(|e| RegistryError::Unavailable(format!("Invalid registry document: {}", e)))
}

type LoadedRegistry = Result<Arc<HashMap<String, TenantConfig>>, RegistryError>;

/// Lazily loaded, cached registry
pub struct RegistryResolver<S> {
    source: S,
    cache: OnceCell<LoadedRegistry>,
}

impl<S: RegistrySource> RegistryResolver<S> {
    /// Create a resolver; nothing is read until the first lookup
    pub fn new(source: S) -> Self {
        Self {
            source,
            cache: OnceCell::new(),
        }
    }

    fn registry(&self) -> &LoadedRegistry {
        // Concurrent first callers block on the same initialization.
        self.cache.get_or_init(|| match self.source.load() {
            Ok(document) => {
                let tenants = document.into_tenants();
                info!(tenant_count = tenants.len(), "Tenant registry loaded");
                Ok(Arc::new(tenants))
            }
            Err(e) => {
                error!(error = %e, "Tenant registry failed to load");
                Err(e)
            }
        })
    }
}

impl<S: RegistrySource> TenantResolver for RegistryResolver<S> {
    fn resolve(&self, slug: &str) -> Result<TenantConfig, RegistryError> {
        let tenants = self.registry().as_ref().map_err(Clone::clone)?;
        let slug = normalize_slug(slug);
        match tenants.get(&slug) {
            Some(tenant) => {
                debug!(slug = %slug, "Tenant resolved");
                Ok(tenant.clone())
            }
            None => Err(RegistryError::NotFound(slug)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::NamedTempFile;

    struct CountingSource {
        raw: &'static str,
        loads: Arc<AtomicUsize>,
    }

    impl RegistrySource for CountingSource {
        fn load(&self) -> Result<RegistryDocument, RegistryError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            parse_document(self.raw)
        }
    }

    #[test]
    fn test_resolve_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"municipalities": [{{"slug": "radim", "assistant_id": "asst_123"}}]}}"#
        )
        .unwrap();

        let resolver = RegistryResolver::new(FileSource::new(file.path()));
        let tenant = resolver.resolve("  RADIM ").unwrap();
        assert_eq!(tenant.slug, "radim");
        assert_eq!(tenant.assistant_id(), Some("asst_123"));
    }

    #[test]
    fn test_resolve_is_idempotent_and_loads_once() {
        let loads = Arc::new(AtomicUsize::new(0));
        let resolver = RegistryResolver::new(CountingSource {
            raw: r#"[{"slug": "radim", "name": "Radim"}]"#,
            loads: loads.clone(),
        });

        let first = resolver.resolve("radim").unwrap();
        let second = resolver.resolve("radim").unwrap();
        assert_eq!(first, second);
        assert_eq!(
            resolver.resolve("kolin"),
            Err(RegistryError::NotFound("kolin".to_string()))
        );
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_first_lookups_load_once() {
        let loads = Arc::new(AtomicUsize::new(0));
        let resolver = Arc::new(RegistryResolver::new(CountingSource {
            raw: r#"{"radim": {"name": "Radim"}}"#,
            loads: loads.clone(),
        }));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let resolver = resolver.clone();
                std::thread::spawn(move || resolver.resolve("radim").is_ok())
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_missing_file_is_cached_as_unavailable() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_path_buf();
        drop(file);

        let resolver = RegistryResolver::new(FileSource::new(&path));
        let err = resolver.resolve("radim").unwrap_err();
        assert!(matches!(err, RegistryError::Unavailable(_)));

        // Creating the file later does not revive the resolver.
        std::fs::write(&path, r#"[{"slug": "radim"}]"#).unwrap();
        assert!(matches!(
            resolver.resolve("radim"),
            Err(RegistryError::Unavailable(_))
        ));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_invalid_document_is_unavailable() {
        let resolver = RegistryResolver::new(InlineSource("not json".to_string()));
        assert!(matches!(
            resolver.resolve("radim"),
            Err(RegistryError::Unavailable(_))
        ));
    }

    #[test]
    fn test_non_record_entries_do_not_disable_registry() {
        let resolver = RegistryResolver::new(InlineSource(
            r#"{"version": 2, "radim": {"name": "Obec Radim", "assistant_id": "asst_123"}}"#
                .to_string(),
        ));
        let tenant = resolver.resolve("radim").unwrap();
        assert_eq!(tenant.assistant_id(), Some("asst_123"));
        assert_eq!(
            resolver.resolve("version"),
            Err(RegistryError::NotFound("version".to_string()))
        );
    }

    #[test]
    fn test_not_found_is_distinct_from_unavailable() {
        let resolver = RegistryResolver::new(InlineSource("[]".to_string()));
        assert_eq!(
            resolver.resolve("Radim"),
            Err(RegistryError::NotFound("radim".to_string()))
        );
    }
}
