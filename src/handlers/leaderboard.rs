use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::ApiError;
use crate::services::{
    leaderboard_service::{LeaderboardRange, LeaderboardService},
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub range: Option<String>,
}

pub async fn standings(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let range = LeaderboardRange::parse(query.range.as_deref());

    let response = LeaderboardService::new(state.mongo.clone()).standings(range).await?;
    Ok(Json(response))
}
