//! Company endpoints. All of them require a bearer token.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use coefin_core::PublicError;
use serde::Deserialize;

use crate::db::repos::{CompanyCursor, CompanyRepo};
use crate::http::error::ApiError;
use crate::http::extractors::{AuthUser, ValidJson, ValidQuery};
use crate::http::server::AppState;
use crate::models::{
    Brn, CompanyCreate, CompanyRead, CompanySearch, CompanyName, CountryCode, CursorPage,
    CursorParams, OffsetPage, OffsetParams, ValidationError,
};

#[derive(Debug, Deserialize)]
pub struct LookupParams {
    pub brn: String,
    pub country: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateCompanyRequest {
    pub name: String,
    pub brn: String,
    pub country: String,
}

fn parse_search(brn: &str, country: &str) -> Result<CompanySearch, ApiError> {
    let mut errors: Vec<ValidationError> = Vec::new();
    let brn = Brn::new(brn).map_err(|e| errors.push(e)).ok();
    let country = CountryCode::new(country).map_err(|e| errors.push(e)).ok();

    let (Some(brn), Some(country)) = (brn, country) else {
        return Err(ApiError::Validation(errors));
    };
    Ok(CompanySearch { brn, country })
}

/// GET /api/v1/companies/my
///
/// Offset-paginated companies associated with the caller, ordered by
/// analytics score.
async fn my_companies(
    AuthUser(user): AuthUser,
    State(state): State<Arc<AppState>>,
    ValidQuery(params): ValidQuery<OffsetParams>,
) -> Result<Json<OffsetPage<CompanyRead>>, ApiError> {
    let page = CompanyRepo::new(&state.db)
        .read_by_user(&user.nickname, &params)
        .await?;
    Ok(Json(page))
}

/// GET /api/v1/companies/all
///
/// Cursor-paginated listing of every company, ordered by creation time.
async fn all_companies(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
    ValidQuery(params): ValidQuery<CursorParams>,
) -> Result<Json<CursorPage<CompanyRead>>, ApiError> {
    let cursor = CompanyCursor::try_from(params.token()?)?;
    let page = CompanyRepo::new(&state.db)
        .read_all(cursor, params.size(), params.order_by)
        .await?;
    Ok(Json(page))
}

/// GET /api/v1/companies?brn=...&country=...
async fn find_company(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
    ValidQuery(params): ValidQuery<LookupParams>,
) -> Result<Json<CompanyRead>, ApiError> {
    let search = parse_search(&params.brn, &params.country)?;
    let company = CompanyRepo::new(&state.db)
        .read_one(&search)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(company))
}

/// POST /api/v1/companies
async fn create_company(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<CreateCompanyRequest>,
) -> Result<(StatusCode, Json<CompanyRead>), ApiError> {
    let mut errors: Vec<ValidationError> = Vec::new();
    let name = CompanyName::new(&req.name).map_err(|e| errors.push(e)).ok();
    let brn = Brn::new(&req.brn).map_err(|e| errors.push(e)).ok();
    let country = CountryCode::new(&req.country).map_err(|e| errors.push(e)).ok();

    let (Some(name), Some(brn), Some(country)) = (name, brn, country) else {
        return Err(ApiError::Validation(errors));
    };

    let created = CompanyRepo::new(&state.db)
        .write_one(&CompanyCreate { name, brn, country })
        .await?
        .ok_or_else(|| {
            ApiError::Conflict(PublicError::new(
                "Company already exists.",
                [
                    "Make sure the BRN and country are correct.".to_owned(),
                    "Fetch the existing record instead.".to_owned(),
                ],
            ))
        })?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Company routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/companies/my", get(my_companies))
        .route("/api/v1/companies/all", get(all_companies))
        .route("/api/v1/companies", get(find_company).post(create_company))
}
