use crate::error::ApiError;
use crate::metrics::{record_battle_completed, BATTLES_CREATED_TOTAL, BATTLE_SUBMISSIONS_TOTAL};
use crate::models::{
    AcceptBattleResponse, Battle, BattleCreated, BattleResultResponse, BattleStatus, BattleSummary,
    BattleView, CreateBattleRequest, CreateBattleResponse, InboxResponse, Question, ReviewEntry,
    SanitizedQuestion, SubmitAnswersResponse, User, NO_ANSWER,
};
use anyhow::anyhow;
use chrono::Utc;
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::options::ReturnDocument;
use mongodb::{Collection, Database};
use std::collections::{HashMap, HashSet};

use super::question_service::QuestionService;

pub struct BattleService {
    mongo: Database,
}

impl BattleService {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    fn battles(&self) -> Collection<Battle> {
        self.mongo.collection("battles")
    }

    fn users(&self) -> Collection<User> {
        self.mongo.collection("users")
    }

    /// Create a pending challenge. Questions are sampled once, across all
    /// difficulty tiers of the category, and their order is fixed for the
    /// lifetime of the battle.
    pub async fn create(
        &self,
        challenger_id: &ObjectId,
        req: CreateBattleRequest,
    ) -> Result<CreateBattleResponse, ApiError> {
        let opponent = self
            .users()
            .find_one(doc! { "username": &req.opponent_username })
            .await?
            .ok_or_else(|| ApiError::NotFound("Opponent not found".to_string()))?;
        let opponent_id = opponent
            .id
            .ok_or_else(|| ApiError::Internal(anyhow!("Opponent document missing _id")))?;

        if opponent_id == *challenger_id {
            return Err(ApiError::InvalidArgument(
                "Cannot challenge yourself".to_string(),
            ));
        }

        let count = req.count.unwrap_or(10) as usize;
        let picked = QuestionService::new(self.mongo.clone())
            .sample(&req.category, None, count)
            .await?;

        // Best-effort fill: fewer questions than requested is fine, an empty
        // category is not playable.
        if picked.is_empty() {
            return Err(ApiError::NotFound(
                "No questions found for this category".to_string(),
            ));
        }

        let now = Utc::now();
        let battle = Battle {
            id: None,
            player1_id: *challenger_id,
            player2_id: opponent_id,
            category: req.category,
            difficulty: None, // mixed difficulties
            status: BattleStatus::Pending,
            question_ids: picked.iter().filter_map(|q| q.id).collect(),
            p1_answers: Vec::new(),
            p2_answers: Vec::new(),
            p1_score: 0,
            p2_score: 0,
            winner_id: None,
            created_at: now,
            updated_at: now,
        };

        let result = self.battles().insert_one(&battle).await?;
        let battle_id = result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| ApiError::Internal(anyhow!("Failed to get inserted battle ID")))?;

        BATTLES_CREATED_TOTAL.inc();
        tracing::info!(
            "Battle created: {} ({} vs {}, category: {})",
            battle_id.to_hex(),
            challenger_id.to_hex(),
            opponent_id.to_hex(),
            battle.category
        );

        Ok(CreateBattleResponse {
            battle: BattleCreated {
                id: battle_id.to_hex(),
                opponent_username: opponent.username,
                status: BattleStatus::Pending,
                message: "Challenge sent!".to_string(),
            },
        })
    }

    /// List the actor's battles grouped by status.
    pub async fn inbox(&self, user_id: &ObjectId) -> Result<InboxResponse, ApiError> {
        let (pending, active, completed) = futures::try_join!(
            self.list_by_status(user_id, BattleStatus::Pending),
            self.list_by_status(user_id, BattleStatus::Active),
            self.list_by_status(user_id, BattleStatus::Completed),
        )?;

        let mut opponent_ids: HashSet<ObjectId> = HashSet::new();
        for battle in pending.iter().chain(active.iter()).chain(completed.iter()) {
            opponent_ids.insert(opponent_of(battle, user_id));
        }
        let usernames = self.usernames(opponent_ids.into_iter().collect()).await?;

        let summarize_all = |battles: Vec<Battle>| {
            battles
                .into_iter()
                .map(|b| summarize(&b, user_id, &usernames))
                .collect()
        };

        Ok(InboxResponse {
            pending: summarize_all(pending),
            active: summarize_all(active),
            completed: summarize_all(completed),
        })
    }

    async fn list_by_status(
        &self,
        user_id: &ObjectId,
        status: BattleStatus,
    ) -> Result<Vec<Battle>, ApiError> {
        let filter = doc! {
            "$or": [ { "player1Id": user_id }, { "player2Id": user_id } ],
            "status": status.as_str(),
        };
        let cursor = self.battles().find(filter).await?;
        let battles: Vec<Battle> = cursor.try_collect().await?;
        Ok(battles)
    }

    /// Full battle state for a participant. Question content is only exposed
    /// while the battle is active.
    pub async fn view(
        &self,
        battle_id: &ObjectId,
        user_id: &ObjectId,
    ) -> Result<BattleView, ApiError> {
        let battle = self.find_battle(battle_id).await?;

        if !battle.is_participant(user_id) {
            return Err(ApiError::Forbidden(
                "Not authorized to view this battle".to_string(),
            ));
        }

        let is_p1 = battle.player1_id == *user_id;
        let opponent_id = opponent_of(&battle, user_id);

        let questions = if battle.status == BattleStatus::Active {
            let ordered = QuestionService::new(self.mongo.clone())
                .find_in_order(&battle.question_ids)
                .await?;
            ordered
                .iter()
                .flatten()
                .map(SanitizedQuestion::from)
                .collect()
        } else {
            Vec::new()
        };

        let opponent_username = self.username_of(&opponent_id).await?;

        Ok(BattleView {
            id: battle_id.to_hex(),
            status: battle.status,
            category: battle.category.clone(),
            difficulty: battle.difficulty,
            you_are: if is_p1 { "player1" } else { "player2" }.to_string(),
            submitted: battle.has_submitted(user_id),
            opponent_submitted: battle.has_submitted(&opponent_id),
            questions,
            your_score: if is_p1 { battle.p1_score } else { battle.p2_score },
            opponent_score: if is_p1 { battle.p2_score } else { battle.p1_score },
            opponent_username,
        })
    }

    /// Accept a pending challenge. Only the invited player may accept; the
    /// pending -> active flip is a compare-and-swap on the stored status.
    pub async fn accept(
        &self,
        battle_id: &ObjectId,
        user_id: &ObjectId,
    ) -> Result<AcceptBattleResponse, ApiError> {
        let battle = self.find_battle(battle_id).await?;

        if battle.player2_id != *user_id {
            return Err(ApiError::Forbidden(
                "Only the invited player can accept".to_string(),
            ));
        }
        if battle.status != BattleStatus::Pending {
            return Err(ApiError::InvalidState(
                "Battle is no longer pending".to_string(),
            ));
        }

        let result = self
            .battles()
            .update_one(
                doc! { "_id": battle_id, "status": BattleStatus::Pending.as_str() },
                doc! { "$set": {
                    "status": BattleStatus::Active.as_str(),
                    "updatedAt": mongodb::bson::DateTime::now(),
                } },
            )
            .await?;

        if result.modified_count == 0 {
            return Err(ApiError::InvalidState(
                "Battle is no longer pending".to_string(),
            ));
        }

        tracing::info!("Battle accepted: {}", battle_id.to_hex());

        Ok(AcceptBattleResponse {
            id: battle_id.to_hex(),
            status: BattleStatus::Active,
            message: "Battle accepted! Good luck".to_string(),
        })
    }

    /// Submit a participant's answers, exactly once per player.
    ///
    /// The answer slot is written with a compare-and-swap guarded by the slot
    /// still being empty, so two concurrent submissions by the same player
    /// cannot both succeed. Whichever request fills the second slot also
    /// performs the completion transition, itself a CAS on `status: active`,
    /// which makes the completed flip and the paired stat increments fire
    /// exactly once per battle.
    pub async fn submit(
        &self,
        battle_id: &ObjectId,
        user_id: &ObjectId,
        answers: &[i32],
    ) -> Result<SubmitAnswersResponse, ApiError> {
        let battle = self.find_battle(battle_id).await?;

        if !battle.is_participant(user_id) {
            return Err(ApiError::Forbidden(
                "Not a participant in this battle".to_string(),
            ));
        }
        if battle.status != BattleStatus::Active {
            return Err(ApiError::InvalidState("Battle is not active".to_string()));
        }
        if battle.has_submitted(user_id) {
            return Err(ApiError::Conflict("You have already submitted".to_string()));
        }

        let is_p1 = battle.player1_id == *user_id;

        let ordered = QuestionService::new(self.mongo.clone())
            .find_in_order(&battle.question_ids)
            .await?;
        let normalized = normalize_answers(answers, battle.question_ids.len());
        let score = score_answers(&normalized, &ordered);

        let (answers_field, score_field) = if is_p1 {
            ("p1Answers", "p1Score")
        } else {
            ("p2Answers", "p2Score")
        };

        let answers_bson = mongodb::bson::to_bson(&normalized)
            .map_err(|e| ApiError::Internal(anyhow::Error::new(e)))?;

        // CAS: the filter requires the slot to still be empty, so a racing
        // duplicate submission finds no matching document.
        let after = self
            .battles()
            .find_one_and_update(
                doc! {
                    "_id": battle_id,
                    "status": BattleStatus::Active.as_str(),
                    answers_field: { "$size": 0 },
                },
                doc! { "$set": {
                    answers_field: answers_bson,
                    score_field: score,
                    "updatedAt": mongodb::bson::DateTime::now(),
                } },
            )
            .return_document(ReturnDocument::After)
            .await?
            .ok_or_else(|| ApiError::Conflict("You have already submitted".to_string()))?;

        BATTLE_SUBMISSIONS_TOTAL.inc();
        tracing::info!(
            "Battle submission: {} by {} ({}/{} correct)",
            battle_id.to_hex(),
            user_id.to_hex(),
            score,
            battle.question_ids.len()
        );

        let status = if !after.p1_answers.is_empty() && !after.p2_answers.is_empty() {
            self.complete(battle_id, &after).await?
        } else {
            after.status
        };

        let message = if status == BattleStatus::Completed {
            "Battle complete!"
        } else {
            "Submitted! Waiting for opponent..."
        };

        Ok(SubmitAnswersResponse {
            your_score: score,
            battle_status: status,
            message: message.to_string(),
        })
    }

    /// Flip an active battle with both slots filled to completed and apply
    /// the aggregate stat increments for both players. The status CAS makes
    /// this idempotent under concurrent second submissions.
    async fn complete(
        &self,
        battle_id: &ObjectId,
        battle: &Battle,
    ) -> Result<BattleStatus, ApiError> {
        let winner_id = decide_winner(battle);

        let mut set = doc! {
            "status": BattleStatus::Completed.as_str(),
            "updatedAt": mongodb::bson::DateTime::now(),
        };
        if let Some(winner) = winner_id {
            set.insert("winnerId", winner);
        }

        let result = self
            .battles()
            .update_one(
                doc! { "_id": battle_id, "status": BattleStatus::Active.as_str() },
                doc! { "$set": set },
            )
            .await?;

        if result.modified_count == 1 {
            self.apply_completion_stats(battle).await?;
            record_battle_completed(winner_id.is_none());
            tracing::info!(
                "Battle completed: {} ({} - {}, winner: {})",
                battle_id.to_hex(),
                battle.p1_score,
                battle.p2_score,
                winner_id.map(|w| w.to_hex()).unwrap_or_else(|| "tie".to_string())
            );
        }

        Ok(BattleStatus::Completed)
    }

    /// True increments, never read-modify-write, so concurrent updates to the
    /// same user from other flows stay correct.
    async fn apply_completion_stats(&self, battle: &Battle) -> Result<(), ApiError> {
        let total = battle.question_ids.len() as i64;

        let per_player = [
            (battle.player1_id, battle.p1_score, battle.p2_score),
            (battle.player2_id, battle.p2_score, battle.p1_score),
        ];

        for (player_id, own_score, other_score) in per_player {
            let mut inc = doc! {
                "stats.totalAnswered": total,
                "stats.correctAnswered": own_score as i64,
                "points": own_score as i64,
            };
            if own_score > other_score {
                inc.insert("stats.wins", 1_i64);
            } else if own_score < other_score {
                inc.insert("stats.losses", 1_i64);
            }

            self.users()
                .update_one(
                    doc! { "_id": player_id },
                    doc! {
                        "$inc": inc,
                        "$set": { "updatedAt": mongodb::bson::DateTime::now() },
                    },
                )
                .await?;
        }

        Ok(())
    }

    /// Post-completion review: the actor's answer, the correct index, and a
    /// correctness flag per question in original order. Questions deleted
    /// since the battle was created render as placeholders.
    pub async fn result(
        &self,
        battle_id: &ObjectId,
        user_id: &ObjectId,
    ) -> Result<BattleResultResponse, ApiError> {
        let battle = self.find_battle(battle_id).await?;

        if !battle.is_participant(user_id) {
            return Err(ApiError::Forbidden(
                "Not authorized to view this battle".to_string(),
            ));
        }
        if battle.status != BattleStatus::Completed {
            return Err(ApiError::InvalidState("Battle not completed".to_string()));
        }

        let is_p1 = battle.player1_id == *user_id;
        let your_answers = if is_p1 {
            &battle.p1_answers
        } else {
            &battle.p2_answers
        };

        let ordered = QuestionService::new(self.mongo.clone())
            .find_in_order(&battle.question_ids)
            .await?;

        let review = build_review(&battle.question_ids, your_answers, &ordered);

        let opponent_id = opponent_of(&battle, user_id);
        let opponent_username = self.username_of(&opponent_id).await?;
        let winner = match battle.winner_id {
            Some(winner_id) => self.username_of(&winner_id).await?,
            None => "tie".to_string(),
        };

        Ok(BattleResultResponse {
            id: battle_id.to_hex(),
            status: battle.status,
            category: battle.category,
            difficulty: battle.difficulty,
            your_score: if is_p1 { battle.p1_score } else { battle.p2_score },
            opponent_score: if is_p1 { battle.p2_score } else { battle.p1_score },
            winner,
            opponent_username,
            review,
        })
    }

    async fn find_battle(&self, battle_id: &ObjectId) -> Result<Battle, ApiError> {
        self.battles()
            .find_one(doc! { "_id": battle_id })
            .await?
            .ok_or_else(|| ApiError::NotFound("Battle not found".to_string()))
    }

    async fn username_of(&self, user_id: &ObjectId) -> Result<String, ApiError> {
        Ok(self
            .users()
            .find_one(doc! { "_id": user_id })
            .await?
            .map(|u| u.username)
            .unwrap_or_else(|| "Unknown".to_string()))
    }

    async fn usernames(
        &self,
        ids: Vec<ObjectId>,
    ) -> Result<HashMap<ObjectId, String>, ApiError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let cursor = self.users().find(doc! { "_id": { "$in": ids } }).await?;
        let users: Vec<User> = cursor.try_collect().await?;
        Ok(users
            .into_iter()
            .filter_map(|u| u.id.map(|id| (id, u.username)))
            .collect())
    }
}

fn opponent_of(battle: &Battle, user_id: &ObjectId) -> ObjectId {
    if battle.player1_id == *user_id {
        battle.player2_id
    } else {
        battle.player1_id
    }
}

fn summarize(
    battle: &Battle,
    user_id: &ObjectId,
    usernames: &HashMap<ObjectId, String>,
) -> BattleSummary {
    let is_p1 = battle.player1_id == *user_id;
    let opponent_id = opponent_of(battle, user_id);
    BattleSummary {
        id: battle.id.map(|id| id.to_hex()).unwrap_or_default(),
        opponent_username: usernames
            .get(&opponent_id)
            .cloned()
            .unwrap_or_else(|| "Unknown".to_string()),
        category: battle.category.clone(),
        difficulty: battle.difficulty,
        question_count: battle.question_ids.len(),
        status: battle.status,
        your_score: if is_p1 { battle.p1_score } else { battle.p2_score },
        opponent_score: if is_p1 { battle.p2_score } else { battle.p1_score },
        created_at: battle.created_at,
    }
}

/// Pad or truncate a submitted answer array to exactly `question_count`
/// entries, filling missing positions with [`NO_ANSWER`]. A stored slot thus
/// always matches the question list in length and is never empty.
fn normalize_answers(answers: &[i32], question_count: usize) -> Vec<i32> {
    (0..question_count)
        .map(|i| answers.get(i).copied().unwrap_or(NO_ANSWER))
        .collect()
}

/// Count positions where the answer matches the stored correct index.
/// Out-of-range answers and missing questions count as incorrect.
fn score_answers(answers: &[i32], questions: &[Option<Question>]) -> i32 {
    questions
        .iter()
        .zip(answers.iter())
        .filter(|(q, a)| match q {
            Some(q) => q.correct_index == **a,
            None => false,
        })
        .count() as i32
}

/// Strict score comparison; a tie yields no winner.
fn decide_winner(battle: &Battle) -> Option<ObjectId> {
    match battle.p1_score.cmp(&battle.p2_score) {
        std::cmp::Ordering::Greater => Some(battle.player1_id),
        std::cmp::Ordering::Less => Some(battle.player2_id),
        std::cmp::Ordering::Equal => None,
    }
}

fn build_review(
    question_ids: &[ObjectId],
    your_answers: &[i32],
    questions: &[Option<Question>],
) -> Vec<ReviewEntry> {
    questions
        .iter()
        .enumerate()
        .map(|(idx, q)| {
            let your_answer = your_answers.get(idx).copied().unwrap_or(NO_ANSWER);
            let correct_index = q.as_ref().map(|q| q.correct_index).unwrap_or(NO_ANSWER);
            ReviewEntry {
                id: q
                    .as_ref()
                    .and_then(|q| q.id)
                    .or_else(|| question_ids.get(idx).copied())
                    .map(|id| id.to_hex())
                    .unwrap_or_default(),
                prompt: q
                    .as_ref()
                    .map(|q| q.prompt.clone())
                    .unwrap_or_else(|| "(missing question)".to_string()),
                choices: q.as_ref().map(|q| q.choices.clone()).unwrap_or_default(),
                your_answer,
                correct_index,
                is_correct: q.is_some() && your_answer == correct_index,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn question(correct_index: i32) -> Option<Question> {
        let now = Utc::now();
        Some(Question {
            id: Some(ObjectId::new()),
            prompt: "prompt".to_string(),
            choices: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_index,
            category: "Shonen".to_string(),
            difficulty: 3,
            created_at: now,
            updated_at: now,
        })
    }

    fn battle_with_scores(p1: i32, p2: i32) -> Battle {
        let now = Utc::now();
        Battle {
            id: Some(ObjectId::new()),
            player1_id: ObjectId::new(),
            player2_id: ObjectId::new(),
            category: "Shonen".to_string(),
            difficulty: None,
            status: BattleStatus::Completed,
            question_ids: vec![ObjectId::new()],
            p1_answers: vec![0],
            p2_answers: vec![0],
            p1_score: p1,
            p2_score: p2,
            winner_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn normalize_pads_missing_answers_with_sentinel() {
        assert_eq!(normalize_answers(&[2, 0], 4), vec![2, 0, NO_ANSWER, NO_ANSWER]);
    }

    #[test]
    fn normalize_truncates_excess_answers() {
        assert_eq!(normalize_answers(&[1, 2, 3], 2), vec![1, 2]);
    }

    #[test]
    fn scoring_counts_positional_matches_only() {
        let questions = vec![question(0), question(1), question(2)];
        // first correct, second wrong, third out of range
        assert_eq!(score_answers(&[0, 3, 7], &questions), 1);
    }

    #[test]
    fn scoring_treats_no_answer_and_missing_question_as_incorrect() {
        let questions = vec![question(0), None, question(2)];
        assert_eq!(score_answers(&[NO_ANSWER, 1, 2], &questions), 1);
    }

    #[test]
    fn winner_requires_strictly_higher_score() {
        let battle = battle_with_scores(7, 5);
        assert_eq!(decide_winner(&battle), Some(battle.player1_id));

        let battle = battle_with_scores(3, 9);
        assert_eq!(decide_winner(&battle), Some(battle.player2_id));

        let battle = battle_with_scores(5, 5);
        assert_eq!(decide_winner(&battle), None);
    }

    #[test]
    fn review_renders_placeholder_for_deleted_question() {
        let stale_id = ObjectId::new();
        let questions = vec![question(1), None];
        let ids = vec![questions[0].as_ref().unwrap().id.unwrap(), stale_id];

        let review = build_review(&ids, &[1, 0], &questions);

        assert_eq!(review.len(), 2);
        assert!(review[0].is_correct);
        assert_eq!(review[1].prompt, "(missing question)");
        assert_eq!(review[1].correct_index, NO_ANSWER);
        assert!(!review[1].is_correct);
        assert_eq!(review[1].id, stale_id.to_hex());
    }
}
