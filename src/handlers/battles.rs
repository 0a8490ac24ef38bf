use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use std::sync::Arc;
use validator::Validate;

use crate::error::ApiError;
use crate::extractors::AppJson;
use crate::middlewares::auth::JwtClaims;
use crate::models::{CreateBattleRequest, SubmitAnswersRequest};
use crate::services::{battle_service::BattleService, AppState};

use super::questions::parse_object_id;

pub async fn create_battle(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    AppJson(req): AppJson<CreateBattleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;
    let user_id = claims.user_id()?;

    let response = BattleService::new(state.mongo.clone()).create(&user_id, req).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn inbox(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.user_id()?;

    let response = BattleService::new(state.mongo.clone()).inbox(&user_id).await?;
    Ok(Json(response))
}

pub async fn view_battle(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.user_id()?;
    let battle_id = parse_object_id(&id)?;

    let response = BattleService::new(state.mongo.clone())
        .view(&battle_id, &user_id)
        .await?;
    Ok(Json(response))
}

pub async fn accept_battle(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.user_id()?;
    let battle_id = parse_object_id(&id)?;

    let response = BattleService::new(state.mongo.clone())
        .accept(&battle_id, &user_id)
        .await?;
    Ok(Json(serde_json::json!({ "battle": response })))
}

pub async fn submit_answers(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(id): Path<String>,
    AppJson(req): AppJson<SubmitAnswersRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.user_id()?;
    let battle_id = parse_object_id(&id)?;

    let response = BattleService::new(state.mongo.clone())
        .submit(&battle_id, &user_id, &req.answers)
        .await?;
    Ok(Json(response))
}

pub async fn battle_result(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.user_id()?;
    let battle_id = parse_object_id(&id)?;

    let response = BattleService::new(state.mongo.clone())
        .result(&battle_id, &user_id)
        .await?;
    Ok(Json(response))
}
