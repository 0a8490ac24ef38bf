use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Quiz item stored in the "questions" collection. Never mutated by the
/// quiz/battle engines; only the admin CRUD surface touches it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub prompt: String,
    pub choices: Vec<String>,
    pub correct_index: i32,
    pub category: String,
    pub difficulty: i32,
    #[serde(rename = "createdAt", with = "super::bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt", with = "super::bson_datetime_as_chrono")]
    pub updated_at: DateTime<Utc>,
}

/// Question as exposed to players: the correct index stays server-side.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SanitizedQuestion {
    pub id: String,
    pub prompt: String,
    pub choices: Vec<String>,
    pub category: String,
    pub difficulty: i32,
}

impl From<&Question> for SanitizedQuestion {
    fn from(q: &Question) -> Self {
        SanitizedQuestion {
            id: q.id.map(|id| id.to_hex()).unwrap_or_default(),
            prompt: q.prompt.clone(),
            choices: q.choices.clone(),
            category: q.category.clone(),
            difficulty: q.difficulty,
        }
    }
}

fn validate_choices(choices: &Vec<String>) -> Result<(), ValidationError> {
    if choices.len() != 4 {
        return Err(ValidationError::new("choices").with_message("exactly 4 choices required".into()));
    }
    if choices.iter().any(|c| c.trim().is_empty()) {
        return Err(ValidationError::new("choices").with_message("choices must not be empty".into()));
    }
    Ok(())
}

/// Request to create a question (admin only). Shape rules are enforced here
/// at the API boundary rather than by storage constraints.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, message = "prompt required"))]
    pub prompt: String,

    #[validate(custom(function = "validate_choices"))]
    pub choices: Vec<String>,

    #[validate(range(min = 0, max = 3, message = "correctIndex must be 0-3"))]
    pub correct_index: i32,

    #[validate(length(min = 1, message = "category required"))]
    pub category: String,

    #[validate(range(min = 1, max = 5, message = "difficulty must be 1-5"))]
    pub difficulty: i32,
}

/// Request to update a question (admin only); absent fields are left as-is.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuestionRequest {
    #[validate(length(min = 1, message = "prompt must not be empty"))]
    pub prompt: Option<String>,

    #[validate(custom(function = "validate_choices"))]
    pub choices: Option<Vec<String>>,

    #[validate(range(min = 0, max = 3, message = "correctIndex must be 0-3"))]
    pub correct_index: Option<i32>,

    #[validate(length(min = 1, message = "category must not be empty"))]
    pub category: Option<String>,

    #[validate(range(min = 1, max = 5, message = "difficulty must be 1-5"))]
    pub difficulty: Option<i32>,
}

/// Query params for browsing questions
#[derive(Debug, Deserialize)]
pub struct ListQuestionsQuery {
    pub category: Option<String>,
    pub difficulty: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> CreateQuestionRequest {
        CreateQuestionRequest {
            prompt: "Who trained Gon?".to_string(),
            choices: vec![
                "Kite".to_string(),
                "Bisky".to_string(),
                "Wing".to_string(),
                "Hisoka".to_string(),
            ],
            correct_index: 1,
            category: "Shonen".to_string(),
            difficulty: 3,
        }
    }

    #[test]
    fn accepts_well_formed_question() {
        assert!(valid_request().validate().is_ok());
    }

    #[test]
    fn rejects_wrong_choice_count() {
        let mut req = valid_request();
        req.choices.pop();
        assert!(req.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_correct_index() {
        let mut req = valid_request();
        req.correct_index = 4;
        assert!(req.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_difficulty() {
        let mut req = valid_request();
        req.difficulty = 0;
        assert!(req.validate().is_err());
        req.difficulty = 6;
        assert!(req.validate().is_err());
    }
}
