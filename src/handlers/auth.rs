use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;
use validator::Validate;

use crate::error::ApiError;
use crate::extractors::AppJson;
use crate::middlewares::auth::JwtService;
use crate::models::{LoginRequest, SignupRequest};
use crate::services::{auth_service::AuthService, AppState};

pub async fn signup(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    let service = AuthService::new(
        state.mongo.clone(),
        JwtService::new(&state.config.jwt_secret),
    );
    let response = service.signup(req).await?;

    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    let service = AuthService::new(
        state.mongo.clone(),
        JwtService::new(&state.config.jwt_secret),
    );
    let response = service.login(req).await?;

    Ok(Json(response))
}
