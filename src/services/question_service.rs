use crate::error::ApiError;
use crate::models::{
    CreateQuestionRequest, ListQuestionsQuery, Question, UpdateQuestionRequest,
};
use chrono::Utc;
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Document};
use mongodb::{Collection, Database};
use std::collections::HashMap;

pub struct QuestionService {
    mongo: Database,
}

impl QuestionService {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    fn questions(&self) -> Collection<Question> {
        self.mongo.collection("questions")
    }

    /// Sample `count` questions at random without replacement from the given
    /// category, optionally restricted to one difficulty tier. When the tier
    /// runs short the remainder is backfilled from the whole category
    /// (excluding what was already picked); when the category itself runs
    /// short, fewer questions are returned. Callers decide whether an empty
    /// result is an error.
    pub async fn sample(
        &self,
        category: &str,
        difficulty: Option<i32>,
        count: usize,
    ) -> Result<Vec<Question>, ApiError> {
        let mut filter = doc! { "category": category };
        if let Some(d) = difficulty {
            filter.insert("difficulty", d);
        }

        let mut picked = self.sample_with_filter(filter, count).await?;

        if picked.len() < count && difficulty.is_some() {
            let picked_ids: Vec<ObjectId> = picked.iter().filter_map(|q| q.id).collect();
            let backfill_filter = doc! {
                "category": category,
                "_id": { "$nin": picked_ids },
            };
            let backfill = self
                .sample_with_filter(backfill_filter, count - picked.len())
                .await?;
            picked.extend(backfill);
        }

        Ok(picked)
    }

    async fn sample_with_filter(
        &self,
        filter: Document,
        size: usize,
    ) -> Result<Vec<Question>, ApiError> {
        if size == 0 {
            return Ok(Vec::new());
        }

        let pipeline = vec![
            doc! { "$match": filter },
            doc! { "$sample": { "size": size as i64 } },
        ];

        let cursor = self
            .questions()
            .aggregate(pipeline)
            .with_type::<Question>()
            .await?;
        let questions: Vec<Question> = cursor.try_collect().await?;
        Ok(questions)
    }

    /// Fetch questions by id, returned in the caller's id order regardless of
    /// storage order. Ids no longer present in the store yield `None` slots
    /// so positional scoring and review stay aligned.
    pub async fn find_in_order(
        &self,
        ids: &[ObjectId],
    ) -> Result<Vec<Option<Question>>, ApiError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let cursor = self
            .questions()
            .find(doc! { "_id": { "$in": ids.to_vec() } })
            .await?;
        let found: Vec<Question> = cursor.try_collect().await?;

        Ok(order_by_ids(ids, found))
    }

    /// Public browse, capped at 100 results.
    pub async fn list(&self, query: &ListQuestionsQuery) -> Result<Vec<Question>, ApiError> {
        let mut filter = doc! {};
        if let Some(category) = &query.category {
            filter.insert("category", category);
        }
        if let Some(difficulty) = query.difficulty {
            filter.insert("difficulty", difficulty);
        }

        let cursor = self.questions().find(filter).limit(100).await?;
        let questions: Vec<Question> = cursor.try_collect().await?;
        Ok(questions)
    }

    pub async fn create(&self, req: CreateQuestionRequest) -> Result<Question, ApiError> {
        let now = Utc::now();
        let mut question = Question {
            id: None,
            prompt: req.prompt,
            choices: req.choices,
            correct_index: req.correct_index,
            category: req.category,
            difficulty: req.difficulty,
            created_at: now,
            updated_at: now,
        };

        let result = self.questions().insert_one(&question).await?;
        question.id = result.inserted_id.as_object_id();

        tracing::info!(
            "Question created: {} (category: {})",
            question.id.map(|id| id.to_hex()).unwrap_or_default(),
            question.category
        );

        Ok(question)
    }

    pub async fn update(
        &self,
        id: &ObjectId,
        req: UpdateQuestionRequest,
    ) -> Result<Question, ApiError> {
        let mut set = doc! { "updatedAt": mongodb::bson::DateTime::now() };
        if let Some(prompt) = req.prompt {
            set.insert("prompt", prompt);
        }
        if let Some(choices) = req.choices {
            set.insert("choices", choices);
        }
        if let Some(correct_index) = req.correct_index {
            set.insert("correctIndex", correct_index);
        }
        if let Some(category) = req.category {
            set.insert("category", category);
        }
        if let Some(difficulty) = req.difficulty {
            set.insert("difficulty", difficulty);
        }

        let updated = self
            .questions()
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": set })
            .return_document(mongodb::options::ReturnDocument::After)
            .await?
            .ok_or_else(|| ApiError::NotFound("Question not found".to_string()))?;

        Ok(updated)
    }

    pub async fn delete(&self, id: &ObjectId) -> Result<(), ApiError> {
        let result = self.questions().delete_one(doc! { "_id": id }).await?;
        if result.deleted_count == 0 {
            return Err(ApiError::NotFound("Question not found".to_string()));
        }
        Ok(())
    }
}

/// Re-sort store results into the requested id order.
fn order_by_ids(ids: &[ObjectId], questions: Vec<Question>) -> Vec<Option<Question>> {
    let mut by_id: HashMap<ObjectId, Question> = questions
        .into_iter()
        .filter_map(|q| q.id.map(|id| (id, q)))
        .collect();
    ids.iter().map(|id| by_id.remove(id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn question(id: ObjectId, prompt: &str) -> Question {
        let now = Utc::now();
        Question {
            id: Some(id),
            prompt: prompt.to_string(),
            choices: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_index: 0,
            category: "Shonen".to_string(),
            difficulty: 3,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn order_by_ids_restores_request_order() {
        let a = ObjectId::new();
        let b = ObjectId::new();
        let c = ObjectId::new();
        // store returns them shuffled
        let found = vec![question(c, "third"), question(a, "first"), question(b, "second")];

        let ordered = order_by_ids(&[a, b, c], found);

        let prompts: Vec<&str> = ordered
            .iter()
            .map(|q| q.as_ref().unwrap().prompt.as_str())
            .collect();
        assert_eq!(prompts, vec!["first", "second", "third"]);
    }

    #[test]
    fn order_by_ids_leaves_holes_for_missing_questions() {
        let a = ObjectId::new();
        let missing = ObjectId::new();
        let found = vec![question(a, "only")];

        let ordered = order_by_ids(&[missing, a], found);

        assert!(ordered[0].is_none());
        assert_eq!(ordered[1].as_ref().unwrap().prompt, "only");
    }
}
