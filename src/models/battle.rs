use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Sentinel for "no answer" at a question position, both in stored answer
/// arrays and in review responses. Never matches a correct index.
pub const NO_ANSWER: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BattleStatus {
    Pending,
    Active,
    Completed,
}

impl BattleStatus {
    pub fn as_str(&self) -> &str {
        match self {
            BattleStatus::Pending => "pending",
            BattleStatus::Active => "active",
            BattleStatus::Completed => "completed",
        }
    }
}

/// Asynchronous two-player match stored in the "battles" collection.
///
/// `question_ids` is fixed at creation and never reordered; both players'
/// answer arrays align positionally with it. An answer slot is written at
/// most once (enforced by a compare-and-swap on the empty array), and a
/// written slot always holds exactly `question_ids.len()` entries with
/// [`NO_ANSWER`] filling unanswered positions, so a non-empty slot reliably
/// means "submitted".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Battle {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    /// The challenger. Order matters for authorization, not skill.
    #[serde(rename = "player1Id")]
    pub player1_id: ObjectId,
    /// The invited player; the only one allowed to accept.
    #[serde(rename = "player2Id")]
    pub player2_id: ObjectId,
    pub category: String,
    /// `None` means the battle draws from mixed difficulties.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<i32>,
    pub status: BattleStatus,
    #[serde(rename = "questionIds")]
    pub question_ids: Vec<ObjectId>,
    #[serde(rename = "p1Answers", default)]
    pub p1_answers: Vec<i32>,
    #[serde(rename = "p2Answers", default)]
    pub p2_answers: Vec<i32>,
    #[serde(rename = "p1Score", default)]
    pub p1_score: i32,
    #[serde(rename = "p2Score", default)]
    pub p2_score: i32,
    /// Set on completion when scores differ; absent on a tie.
    #[serde(rename = "winnerId", default, skip_serializing_if = "Option::is_none")]
    pub winner_id: Option<ObjectId>,
    #[serde(rename = "createdAt", with = "super::bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt", with = "super::bson_datetime_as_chrono")]
    pub updated_at: DateTime<Utc>,
}

impl Battle {
    pub fn is_participant(&self, user_id: &ObjectId) -> bool {
        self.player1_id == *user_id || self.player2_id == *user_id
    }

    /// Whether the given participant already has a populated answer slot.
    pub fn has_submitted(&self, user_id: &ObjectId) -> bool {
        if self.player1_id == *user_id {
            !self.p1_answers.is_empty()
        } else {
            !self.p2_answers.is_empty()
        }
    }
}

/// Request to challenge another user
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBattleRequest {
    #[validate(length(min = 1, message = "opponentUsername required"))]
    pub opponent_username: String,

    #[validate(length(min = 1, message = "category required"))]
    pub category: String,

    #[validate(range(min = 1, max = 50, message = "count must be 1-50"))]
    pub count: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBattleResponse {
    pub battle: BattleCreated,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleCreated {
    pub id: String,
    pub opponent_username: String,
    pub status: BattleStatus,
    pub message: String,
}

/// One battle as listed in a player's inbox
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleSummary {
    pub id: String,
    pub opponent_username: String,
    pub category: String,
    pub difficulty: Option<i32>,
    pub question_count: usize,
    pub status: BattleStatus,
    pub your_score: i32,
    pub opponent_score: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct InboxResponse {
    pub pending: Vec<BattleSummary>,
    pub active: Vec<BattleSummary>,
    pub completed: Vec<BattleSummary>,
}

/// Full battle state for a participant. Questions are only populated while
/// the battle is active: pending battles hide content from a pre-scouting
/// challenger, completed ones hand off to the result endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleView {
    pub id: String,
    pub status: BattleStatus,
    pub category: String,
    pub difficulty: Option<i32>,
    pub you_are: String,
    pub submitted: bool,
    pub opponent_submitted: bool,
    pub questions: Vec<super::SanitizedQuestion>,
    pub your_score: i32,
    pub opponent_score: i32,
    pub opponent_username: String,
}

#[derive(Debug, Deserialize)]
pub struct SubmitAnswersRequest {
    pub answers: Vec<i32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswersResponse {
    pub your_score: i32,
    pub battle_status: BattleStatus,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptBattleResponse {
    pub id: String,
    pub status: BattleStatus,
    pub message: String,
}

/// Per-question breakdown in a completed battle's review
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEntry {
    pub id: String,
    pub prompt: String,
    pub choices: Vec<String>,
    pub your_answer: i32,
    pub correct_index: i32,
    pub is_correct: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleResultResponse {
    pub id: String,
    pub status: BattleStatus,
    pub category: String,
    pub difficulty: Option<i32>,
    pub your_score: i32,
    pub opponent_score: i32,
    /// Winner's username, or "tie"
    pub winner: String,
    pub opponent_username: String,
    pub review: Vec<ReviewEntry>,
}
