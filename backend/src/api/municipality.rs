//! Municipality lookup API
//!
//! Gives the widget what it needs to render: display name, website and theme.

use crate::api::utils::{select_slug, SlugQuery};
use crate::error::AppError;
use crate::registry::Theme;
use crate::state::AppState;
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Json,
};
use serde::Serialize;

/// Municipality metadata for the widget
#[derive(Debug, Serialize)]
pub struct MunicipalityResponse {
    /// Always `true`
    pub ok: bool,
    /// Normalized slug
    pub slug: String,
    /// Display name
    pub name: String,
    /// Municipality website (may be empty)
    pub website_url: String,
    /// Widget colors, `null` for the default theme
    pub theme: Option<Theme>,
}

/// GET /api/municipality?obec=radim or /api/municipality/radim
///
/// Channels in priority order: `obec` query, `slug` query, path segment,
/// then the configured default slug.
pub async fn get_municipality(
    State(state): State<AppState>,
    query: Result<Query<SlugQuery>, QueryRejection>,
    path: Option<Path<String>>,
) -> Result<Json<MunicipalityResponse>, AppError> {
    let Query(query) = query.map_err(|e| AppError::InvalidRequest(e.body_text()))?;
    let path_slug = path.map(|Path(slug)| slug);
    let slug = select_slug(
        [
            query.obec.as_deref(),
            query.slug.as_deref(),
            path_slug.as_deref(),
        ],
        &state.config.registry.default_slug,
    );

    let tenant = state.resolver.resolve(&slug)?;

    Ok(Json(MunicipalityResponse {
        ok: true,
        slug: tenant.slug,
        name: tenant.name,
        website_url: tenant.website_url,
        theme: tenant.theme,
    }))
}
