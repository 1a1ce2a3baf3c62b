//! Tenant registry module
//!
//! Maps municipality slugs to tenant configurations loaded from a static
//! registry document.

pub mod models;
pub mod resolver;

pub use models::{normalize_slug, RegistryDocument, TenantConfig, Theme};
pub use resolver::{
    FileSource, InlineSource, RegistryError, RegistryResolver, RegistrySource, TenantResolver,
};
