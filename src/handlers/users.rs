use axum::{extract::State, response::IntoResponse, Extension, Json};
use std::sync::Arc;

use crate::error::ApiError;
use crate::middlewares::auth::{JwtClaims, JwtService};
use crate::services::{auth_service::AuthService, AppState};

pub async fn get_current_user(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.user_id()?;

    let service = AuthService::new(
        state.mongo.clone(),
        JwtService::new(&state.config.jwt_secret),
    );
    let profile = service.profile(&user_id).await?;

    Ok(Json(profile))
}
