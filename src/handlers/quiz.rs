use axum::{extract::State, response::IntoResponse, Extension, Json};
use std::sync::Arc;
use validator::Validate;

use crate::error::ApiError;
use crate::extractors::AppJson;
use crate::middlewares::auth::JwtClaims;
use crate::models::{StartQuizRequest, SubmitQuizRequest};
use crate::services::{quiz_service::QuizService, AppState};

pub async fn start_quiz(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    AppJson(req): AppJson<StartQuizRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;
    let user_id = claims.user_id()?;

    let response = QuizService::new(state.mongo.clone()).start(&user_id, req).await?;
    Ok(Json(response))
}

pub async fn submit_quiz(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    AppJson(req): AppJson<SubmitQuizRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.user_id()?;

    let response = QuizService::new(state.mongo.clone()).submit(&user_id, req).await?;
    Ok(Json(response))
}
