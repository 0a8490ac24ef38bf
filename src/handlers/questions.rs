use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use mongodb::bson::oid::ObjectId;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::error::ApiError;
use crate::extractors::AppJson;
use crate::models::{CreateQuestionRequest, ListQuestionsQuery, UpdateQuestionRequest};
use crate::services::{question_service::QuestionService, AppState};

/// Public browse of the question bank (correct indices included; the bank
/// itself is not secret, only live quiz/battle content is sanitized).
pub async fn list_questions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuestionsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let questions = QuestionService::new(state.mongo.clone()).list(&query).await?;
    Ok(Json(json!({ "questions": questions })))
}

pub async fn create_question(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<CreateQuestionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    let question = QuestionService::new(state.mongo.clone()).create(req).await?;
    Ok((StatusCode::CREATED, Json(json!({ "question": question }))))
}

pub async fn update_question(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    AppJson(req): AppJson<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;
    let id = parse_object_id(&id)?;

    let question = QuestionService::new(state.mongo.clone()).update(&id, req).await?;
    Ok(Json(json!({ "question": question })))
}

pub async fn delete_question(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_object_id(&id)?;

    QuestionService::new(state.mongo.clone()).delete(&id).await?;
    Ok(Json(json!({ "ok": true })))
}

pub(crate) fn parse_object_id(raw: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(raw).map_err(|_| ApiError::InvalidArgument(format!("Invalid id: {}", raw)))
}
