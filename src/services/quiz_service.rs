use crate::error::ApiError;
use crate::metrics::{record_quiz_answers, QUIZ_ATTEMPTS_TOTAL};
use crate::models::{
    QuizAttempt, QuizMode, SanitizedQuestion, StartQuizRequest, StartQuizResponse,
    SubmitQuizRequest, SubmitQuizResponse, User,
};
use chrono::Utc;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::{Collection, Database};

use super::adaptive;
use super::question_service::QuestionService;

pub struct QuizService {
    mongo: Database,
}

impl QuizService {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    fn users(&self) -> Collection<User> {
        self.mongo.collection("users")
    }

    fn attempts(&self) -> Collection<QuizAttempt> {
        self.mongo.collection("quiz_attempts")
    }

    /// Generate a solo quiz. Adaptive mode substitutes the user's current
    /// recommendation for the explicit difficulty; questions go out
    /// sanitized, correct indices stay server-side.
    pub async fn start(
        &self,
        user_id: &ObjectId,
        req: StartQuizRequest,
    ) -> Result<StartQuizResponse, ApiError> {
        let count = req.count.unwrap_or(10) as usize;

        let difficulty = if req.use_adaptive {
            let user = self.find_user(user_id).await?;
            user.preferred_difficulty
        } else {
            req.difficulty.unwrap_or(2)
        };
        let difficulty = adaptive::clamp_difficulty(difficulty);

        let picked = QuestionService::new(self.mongo.clone())
            .sample(&req.category, Some(difficulty), count)
            .await?;

        if picked.is_empty() {
            return Err(ApiError::NotFound(
                "No questions found for this category".to_string(),
            ));
        }

        Ok(StartQuizResponse {
            questions: picked.iter().map(SanitizedQuestion::from).collect(),
            difficulty_used: difficulty,
        })
    }

    /// Score a submitted quiz, log the attempt, and fold the outcomes into
    /// the user's stats, sliding window, and adaptive recommendation. The
    /// attempt record and stat mutations belong to the same logical
    /// operation; counters go through `$inc`, never overwrites.
    pub async fn submit(
        &self,
        user_id: &ObjectId,
        req: SubmitQuizRequest,
    ) -> Result<SubmitQuizResponse, ApiError> {
        if req.question_ids.len() != req.answers.len() {
            return Err(ApiError::InvalidArgument(
                "questionIds and answers must match in length".to_string(),
            ));
        }

        let question_ids = parse_question_ids(&req.question_ids)?;

        let correctness = self.score_against_store(&question_ids, &req.answers).await?;
        let correct = correctness.iter().filter(|ok| **ok).count() as i32;
        let total = question_ids.len();
        let score = correct;
        let accuracy = if total > 0 {
            correct as f64 / total as f64
        } else {
            0.0
        };

        let attempt = QuizAttempt {
            id: None,
            user_id: *user_id,
            mode: QuizMode::Solo,
            question_ids,
            answers: req.answers,
            score,
            accuracy,
            created_at: Utc::now(),
        };
        self.attempts().insert_one(&attempt).await?;

        let next_difficulty = self.update_user_after_quiz(user_id, &correctness, score).await?;

        QUIZ_ATTEMPTS_TOTAL.inc();
        record_quiz_answers(correct as u64, (total as i32 - correct) as u64);
        tracing::info!(
            "Quiz submitted: user={} score={}/{} next_difficulty={}",
            user_id.to_hex(),
            correct,
            total,
            next_difficulty
        );

        Ok(SubmitQuizResponse {
            score,
            correct,
            total,
            accuracy,
            next_recommended_difficulty: next_difficulty,
        })
    }

    /// Look up correct indices and derive per-question correctness. Ids with
    /// no stored question count as incorrect, never as an error.
    async fn score_against_store(
        &self,
        question_ids: &[ObjectId],
        answers: &[i32],
    ) -> Result<Vec<bool>, ApiError> {
        let ordered = QuestionService::new(self.mongo.clone())
            .find_in_order(question_ids)
            .await?;

        Ok(ordered
            .iter()
            .zip(answers.iter())
            .map(|(q, a)| match q {
                Some(q) => q.correct_index == *a,
                None => false,
            })
            .collect())
    }

    /// Fold quiz outcomes into the user document: counters via `$inc`, the
    /// recomputed window and recommendation via `$set`.
    async fn update_user_after_quiz(
        &self,
        user_id: &ObjectId,
        correctness: &[bool],
        score: i32,
    ) -> Result<i32, ApiError> {
        let user = self.find_user(user_id).await?;

        let mut window = user.recent_answers;
        for ok in correctness {
            adaptive::push_outcome(&mut window, *ok);
        }
        let next_difficulty = adaptive::next_difficulty(user.preferred_difficulty, &window);

        let correct = correctness.iter().filter(|ok| **ok).count() as i64;
        self.users()
            .update_one(
                doc! { "_id": user_id },
                doc! {
                    "$inc": {
                        "stats.totalAnswered": correctness.len() as i64,
                        "stats.correctAnswered": correct,
                        "points": score as i64,
                    },
                    "$set": {
                        "recentAnswers": window,
                        "preferredDifficulty": next_difficulty,
                        "updatedAt": mongodb::bson::DateTime::now(),
                    },
                },
            )
            .await?;

        Ok(next_difficulty)
    }

    async fn find_user(&self, user_id: &ObjectId) -> Result<User, ApiError> {
        self.users()
            .find_one(doc! { "_id": user_id })
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
    }
}

/// Question ids arrive as hex strings; malformed ids are a client bug and
/// rejected outright, unknown-but-well-formed ids score as incorrect later.
fn parse_question_ids(ids: &[String]) -> Result<Vec<ObjectId>, ApiError> {
    ids.iter()
        .map(|id| {
            ObjectId::parse_str(id)
                .map_err(|_| ApiError::InvalidArgument(format!("Invalid question id: {}", id)))
        })
        .collect()
}

// Used by tests below; mirrors score_against_store without the store trip.
#[cfg(test)]
fn correctness_against(
    questions: &[Option<crate::models::Question>],
    answers: &[i32],
) -> Vec<bool> {
    questions
        .iter()
        .zip(answers.iter())
        .map(|(q, a)| q.as_ref().is_some_and(|q| q.correct_index == *a))
        .collect()
}
