use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Immutable log record of one solo quiz submission, stored in the
/// "quiz_attempts" collection. Weekly leaderboard aggregation reads these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizAttempt {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(rename = "userId")]
    pub user_id: ObjectId,
    pub mode: QuizMode,
    #[serde(rename = "questionIds")]
    pub question_ids: Vec<ObjectId>,
    pub answers: Vec<i32>,
    pub score: i32,
    pub accuracy: f64,
    #[serde(rename = "createdAt", with = "super::bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuizMode {
    Solo,
}

/// Request to generate a solo quiz
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StartQuizRequest {
    #[validate(length(min = 1, message = "category required"))]
    pub category: String,

    #[validate(range(min = 1, max = 5, message = "difficulty must be 1-5"))]
    pub difficulty: Option<i32>,

    #[validate(range(min = 1, max = 50, message = "count must be 1-50"))]
    pub count: Option<u32>,

    /// When set, the user's current adaptive recommendation is used instead
    /// of the explicit difficulty.
    #[serde(default)]
    pub use_adaptive: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartQuizResponse {
    pub questions: Vec<super::SanitizedQuestion>,
    pub difficulty_used: i32,
}

/// Request to score a solo quiz: `question_ids` and `answers` are parallel
/// arrays and must have equal length.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitQuizRequest {
    pub question_ids: Vec<String>,
    pub answers: Vec<i32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitQuizResponse {
    pub score: i32,
    pub correct: i32,
    pub total: usize,
    pub accuracy: f64,
    pub next_recommended_difficulty: i32,
}

/// Canonical leaderboard row shape; consumers should not have to sniff
/// alternative field names.
#[derive(Debug, Serialize)]
pub struct LeaderboardRow {
    pub rank: usize,
    pub username: String,
    pub points: i64,
    pub wins: i64,
    pub losses: i64,
    pub accuracy: f64,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    pub rows: Vec<LeaderboardRow>,
    pub range: String,
}
