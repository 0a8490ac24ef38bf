use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// User model stored in MongoDB "users" collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub username: String,
    pub email: String,
    #[serde(rename = "passwordHash")]
    pub password_hash: String,
    #[serde(rename = "isAdmin", default)]
    pub is_admin: bool,
    #[serde(default)]
    pub stats: UserStats,
    /// Monotonically non-decreasing accumulator across solo and battle results
    #[serde(default)]
    pub points: i64,
    /// Sliding window of recent answer correctness, capacity 20, oldest first
    #[serde(rename = "recentAnswers", default)]
    pub recent_answers: Vec<bool>,
    /// Current adaptive difficulty recommendation (1-5)
    #[serde(rename = "preferredDifficulty", default = "default_difficulty")]
    pub preferred_difficulty: i32,
    #[serde(rename = "createdAt", with = "super::bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt", with = "super::bson_datetime_as_chrono")]
    pub updated_at: DateTime<Utc>,
}

pub(crate) fn default_difficulty() -> i32 {
    2
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserStats {
    #[serde(rename = "totalAnswered", default)]
    pub total_answered: i64,
    #[serde(rename = "correctAnswered", default)]
    pub correct_answered: i64,
    #[serde(default)]
    pub wins: i64,
    #[serde(default)]
    pub losses: i64,
}

impl UserStats {
    /// Lifetime accuracy; 0 until the first answer is recorded.
    pub fn accuracy(&self) -> f64 {
        if self.total_answered == 0 {
            0.0
        } else {
            self.correct_answered as f64 / self.total_answered as f64
        }
    }
}

/// User profile returned to the client (without sensitive data)
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
    pub stats: UserStats,
    pub points: i64,
    pub preferred_difficulty: i32,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        UserProfile {
            id: user.id.map(|id| id.to_hex()).unwrap_or_default(),
            username: user.username,
            email: user.email,
            is_admin: user.is_admin,
            stats: user.stats,
            points: user.points,
            preferred_difficulty: user.preferred_difficulty,
        }
    }
}

/// Request to sign up a new user
#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(length(
        min = 3,
        max = 32,
        message = "Username must be between 3 and 32 characters"
    ))]
    pub username: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// Request to login
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub password: String,
}

/// Response after successful login or signup
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserProfile,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accuracy_is_zero_without_answers() {
        assert_eq!(UserStats::default().accuracy(), 0.0);
    }

    #[test]
    fn accuracy_is_correct_over_total() {
        let stats = UserStats {
            total_answered: 10,
            correct_answered: 7,
            wins: 0,
            losses: 0,
        };
        assert!((stats.accuracy() - 0.7).abs() < f64::EPSILON);
    }
}
