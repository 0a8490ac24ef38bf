use crate::error::ApiError;
use crate::middlewares::auth::JwtService;
use crate::models::{
    AuthResponse, LoginRequest, SignupRequest, User, UserProfile, UserStats,
};
use anyhow::anyhow;
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::Utc;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::{Collection, Database};

pub struct AuthService {
    mongo: Database,
    jwt_service: JwtService,
}

impl AuthService {
    pub fn new(mongo: Database, jwt_service: JwtService) -> Self {
        Self { mongo, jwt_service }
    }

    fn users(&self) -> Collection<User> {
        self.mongo.collection("users")
    }

    pub async fn signup(&self, req: SignupRequest) -> Result<AuthResponse, ApiError> {
        let existing = self
            .users()
            .find_one(doc! { "$or": [
                { "email": &req.email },
                { "username": &req.username },
            ] })
            .await?;

        if existing.is_some() {
            return Err(ApiError::Conflict(
                "Username or email already in use".to_string(),
            ));
        }

        let password_hash = hash(&req.password, DEFAULT_COST)
            .map_err(|e| ApiError::Internal(anyhow::Error::new(e).context("bcrypt hash failed")))?;

        let now = Utc::now();
        let user = User {
            id: None,
            username: req.username,
            email: req.email.to_lowercase(),
            password_hash,
            is_admin: false,
            stats: UserStats::default(),
            points: 0,
            recent_answers: Vec::new(),
            preferred_difficulty: crate::models::user::default_difficulty(),
            created_at: now,
            updated_at: now,
        };

        let result = self.users().insert_one(&user).await?;
        let user_id = result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| ApiError::Internal(anyhow!("Failed to get inserted user ID")))?;

        let token = self
            .jwt_service
            .issue_token(&user_id, user.is_admin)
            .map_err(|e| ApiError::Internal(anyhow!("Failed to issue token: {}", e)))?;

        tracing::info!("User signed up: {} ({})", user.username, user_id.to_hex());

        let mut user_with_id = user;
        user_with_id.id = Some(user_id);

        Ok(AuthResponse {
            token,
            user: UserProfile::from(user_with_id),
        })
    }

    pub async fn login(&self, req: LoginRequest) -> Result<AuthResponse, ApiError> {
        let user = self
            .users()
            .find_one(doc! { "email": req.email.to_lowercase() })
            .await?
            .ok_or_else(|| ApiError::Unauthorized("Invalid credentials".to_string()))?;

        let ok = verify(&req.password, &user.password_hash).map_err(|e| {
            ApiError::Internal(anyhow::Error::new(e).context("bcrypt verify failed"))
        })?;
        if !ok {
            return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
        }

        let user_id = user
            .id
            .ok_or_else(|| ApiError::Internal(anyhow!("User document missing _id")))?;
        let token = self
            .jwt_service
            .issue_token(&user_id, user.is_admin)
            .map_err(|e| ApiError::Internal(anyhow!("Failed to issue token: {}", e)))?;

        tracing::info!("User logged in: {}", user.username);

        Ok(AuthResponse {
            token,
            user: UserProfile::from(user),
        })
    }

    /// Profile for the authenticated user, sans credentials.
    pub async fn profile(&self, user_id: &ObjectId) -> Result<UserProfile, ApiError> {
        let user = self
            .users()
            .find_one(doc! { "_id": user_id })
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
        Ok(UserProfile::from(user))
    }
}
