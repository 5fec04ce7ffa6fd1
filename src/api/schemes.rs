//! Scheme API endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;

use super::{error, success, ApiResponse, ApiResult, Params, Payload};
use crate::auth::RequireAdmin;
use crate::filter::FilterCriteria;
use crate::models::{Category, Scheme, SchemePayload, ValueCount};
use crate::pagination::{Page, Pagination};
use crate::validation::{
    decode_category, AdminListQuery, FeaturedQuery, FilterQuery, PageQuery, SearchQuery,
};
use crate::AppState;

/// A page of schemes plus whatever narrowed it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemeList {
    pub schemes: Vec<Scheme>,
    pub pagination: Pagination,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<FilterCriteria>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_query: Option<String>,
}

impl From<Page<Scheme>> for SchemeList {
    fn from(page: Page<Scheme>) -> Self {
        Self {
            schemes: page.items,
            pagination: page.pagination,
            filters: None,
            category: None,
            search_query: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct DistrictCount {
    pub district: String,
    pub count: i64,
}

/// GET /api/v2/schemes - Active schemes, newest first.
pub async fn list_schemes(
    State(state): State<AppState>,
    Params(query): Params<PageQuery>,
) -> ApiResult<SchemeList> {
    let page = match query.decode() {
        Ok(page) => page,
        Err(e) => return error(e, &state),
    };

    match state.catalog.list_active(page).await {
        Ok(page) => success(page.into()),
        Err(e) => error(e, &state),
    }
}

/// GET /api/v2/schemes/filter - Active schemes matching eligibility criteria.
pub async fn filter_schemes(
    State(state): State<AppState>,
    Params(query): Params<FilterQuery>,
) -> ApiResult<SchemeList> {
    let (criteria, page) = match query.decode() {
        Ok(decoded) => decoded,
        Err(e) => return error(e, &state),
    };

    match state.catalog.filter(&criteria, page).await {
        Ok(page) => success(SchemeList {
            filters: Some(criteria),
            ..page.into()
        }),
        Err(e) => error(e, &state),
    }
}

/// GET /api/v2/schemes/search - Active schemes matching free text, best first.
pub async fn search_schemes(
    State(state): State<AppState>,
    Params(query): Params<SearchQuery>,
) -> ApiResult<SchemeList> {
    let (text, page) = match query.decode() {
        Ok(decoded) => decoded,
        Err(e) => return error(e, &state),
    };

    match state.catalog.search(&text, page).await {
        Ok(page) => success(SchemeList {
            search_query: Some(text),
            ..page.into()
        }),
        Err(e) => error(e, &state),
    }
}

/// GET /api/v2/schemes/featured
pub async fn featured_schemes(
    State(state): State<AppState>,
    Params(query): Params<FeaturedQuery>,
) -> ApiResult<Vec<Scheme>> {
    let limit = match query.decode() {
        Ok(limit) => limit,
        Err(e) => return error(e, &state),
    };

    match state.catalog.list_featured(limit).await {
        Ok(schemes) => success(schemes),
        Err(e) => error(e, &state),
    }
}

/// GET /api/v2/schemes/categories - Each category with its active count.
pub async fn scheme_categories(State(state): State<AppState>) -> ApiResult<Vec<CategoryCount>> {
    match state.catalog.distinct_categories().await {
        Ok(counts) => success(
            counts
                .into_iter()
                .map(|ValueCount { value, count }| CategoryCount {
                    category: value,
                    count,
                })
                .collect(),
        ),
        Err(e) => error(e, &state),
    }
}

/// GET /api/v2/schemes/districts - Each district with its active count.
pub async fn scheme_districts(State(state): State<AppState>) -> ApiResult<Vec<DistrictCount>> {
    match state.catalog.distinct_districts().await {
        Ok(counts) => success(
            counts
                .into_iter()
                .map(|ValueCount { value, count }| DistrictCount {
                    district: value,
                    count,
                })
                .collect(),
        ),
        Err(e) => error(e, &state),
    }
}

/// GET /api/v2/schemes/category/{category}
pub async fn schemes_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
    Params(query): Params<PageQuery>,
) -> ApiResult<SchemeList> {
    let category = match decode_category(&category) {
        Ok(category) => category,
        Err(e) => return error(e, &state),
    };
    let page = match query.decode() {
        Ok(page) => page,
        Err(e) => return error(e, &state),
    };

    match state.catalog.list_by_category(category, page).await {
        Ok(page) => success(SchemeList {
            category: Some(category),
            ..page.into()
        }),
        Err(e) => error(e, &state),
    }
}

/// GET /api/v2/schemes/admin/all - Every scheme regardless of status.
pub async fn list_all_schemes(
    State(state): State<AppState>,
    RequireAdmin(claim): RequireAdmin,
    Params(query): Params<AdminListQuery>,
) -> ApiResult<SchemeList> {
    let (status, page) = match query.decode() {
        Ok(decoded) => decoded,
        Err(e) => return error(e, &state),
    };

    match state.catalog.list_all(claim, status, page).await {
        Ok(page) => success(page.into()),
        Err(e) => error(e, &state),
    }
}

/// GET /api/v2/schemes/{id}
pub async fn get_scheme(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Scheme> {
    match state.catalog.get_by_id(&id).await {
        Ok(scheme) => success(scheme),
        Err(e) => error(e, &state),
    }
}

/// POST /api/v2/schemes
pub async fn create_scheme(
    State(state): State<AppState>,
    RequireAdmin(claim): RequireAdmin,
    Payload(payload): Payload<SchemePayload>,
) -> ApiResult<Scheme> {
    match state.catalog.create(claim, payload).await {
        Ok(scheme) => Ok(ApiResponse::new(scheme)
            .with_message("Scheme created successfully")
            .with_status(StatusCode::CREATED)),
        Err(e) => error(e, &state),
    }
}

/// PUT /api/v2/schemes/{id}
pub async fn update_scheme(
    State(state): State<AppState>,
    RequireAdmin(claim): RequireAdmin,
    Path(id): Path<String>,
    Payload(payload): Payload<SchemePayload>,
) -> ApiResult<Scheme> {
    match state.catalog.update(claim, &id, payload).await {
        Ok(scheme) => Ok(ApiResponse::new(scheme).with_message("Scheme updated successfully")),
        Err(e) => error(e, &state),
    }
}

/// DELETE /api/v2/schemes/{id}
pub async fn delete_scheme(
    State(state): State<AppState>,
    RequireAdmin(claim): RequireAdmin,
    Path(id): Path<String>,
) -> ApiResult<()> {
    match state.catalog.delete(claim, &id).await {
        Ok(()) => Ok(ApiResponse::message_only("Scheme deleted successfully")),
        Err(e) => error(e, &state),
    }
}
