use crate::error::ApiError;
use crate::models::{LeaderboardResponse, LeaderboardRow, User};
use chrono::{Duration, Utc};
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::{Collection, Database};
use serde::Deserialize;
use std::collections::HashMap;

const TOP_N: i64 = 50;
const WEEKLY_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaderboardRange {
    AllTime,
    Weekly,
}

impl LeaderboardRange {
    /// Anything other than "weekly" falls back to the all-time board.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.to_lowercase()).as_deref() {
            Some("weekly") => LeaderboardRange::Weekly,
            _ => LeaderboardRange::AllTime,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            LeaderboardRange::AllTime => "all",
            LeaderboardRange::Weekly => "weekly",
        }
    }
}

/// Shape of the weekly aggregation's group stage output.
#[derive(Debug, Deserialize)]
struct WeeklyPoints {
    #[serde(rename = "_id")]
    user_id: ObjectId,
    points: i64,
}

pub struct LeaderboardService {
    mongo: Database,
}

impl LeaderboardService {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    fn users(&self) -> Collection<User> {
        self.mongo.collection("users")
    }

    pub async fn standings(&self, range: LeaderboardRange) -> Result<LeaderboardResponse, ApiError> {
        let rows = match range {
            LeaderboardRange::AllTime => self.all_time_rows().await?,
            LeaderboardRange::Weekly => self.weekly_rows().await?,
        };
        Ok(LeaderboardResponse {
            rows,
            range: range.as_str().to_string(),
        })
    }

    /// All-time: users by accumulated points, descending, top 50. Ties keep
    /// the store's stable order; rank is purely positional.
    async fn all_time_rows(&self) -> Result<Vec<LeaderboardRow>, ApiError> {
        let cursor = self
            .users()
            .find(doc! {})
            .sort(doc! { "points": -1 })
            .limit(TOP_N)
            .await?;
        let users: Vec<User> = cursor.try_collect().await?;

        Ok(users
            .into_iter()
            .enumerate()
            .map(|(idx, user)| LeaderboardRow {
                rank: idx + 1,
                username: user.username,
                points: user.points,
                wins: user.stats.wins,
                losses: user.stats.losses,
                accuracy: user.stats.accuracy(),
            })
            .collect())
    }

    /// Weekly: solo quiz scores summed per user over the trailing 7 days,
    /// independent of the all-time points accumulator. Battle scores do not
    /// feed this board.
    async fn weekly_rows(&self) -> Result<Vec<LeaderboardRow>, ApiError> {
        let since = Utc::now() - Duration::days(WEEKLY_WINDOW_DAYS);
        let since_bson = mongodb::bson::DateTime::from_millis(since.timestamp_millis());

        let pipeline = vec![
            doc! { "$match": { "createdAt": { "$gte": since_bson } } },
            doc! { "$group": { "_id": "$userId", "points": { "$sum": "$score" } } },
            doc! { "$sort": { "points": -1 } },
            doc! { "$limit": TOP_N },
        ];

        let cursor = self
            .mongo
            .collection::<mongodb::bson::Document>("quiz_attempts")
            .aggregate(pipeline)
            .with_type::<WeeklyPoints>()
            .await?;
        let scored: Vec<WeeklyPoints> = cursor.try_collect().await?;

        let ids: Vec<ObjectId> = scored.iter().map(|row| row.user_id).collect();
        let users = self.users_by_id(ids).await?;

        Ok(scored
            .into_iter()
            .enumerate()
            .map(|(idx, row)| {
                let user = users.get(&row.user_id);
                LeaderboardRow {
                    rank: idx + 1,
                    username: user
                        .map(|u| u.username.clone())
                        .unwrap_or_else(|| "Unknown".to_string()),
                    points: row.points,
                    wins: user.map(|u| u.stats.wins).unwrap_or(0),
                    losses: user.map(|u| u.stats.losses).unwrap_or(0),
                    accuracy: user.map(|u| u.stats.accuracy()).unwrap_or(0.0),
                }
            })
            .collect())
    }

    async fn users_by_id(&self, ids: Vec<ObjectId>) -> Result<HashMap<ObjectId, User>, ApiError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let cursor = self.users().find(doc! { "_id": { "$in": ids } }).await?;
        let users: Vec<User> = cursor.try_collect().await?;
        Ok(users
            .into_iter()
            .filter_map(|u| u.id.map(|id| (id, u)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_parse_defaults_to_all_time() {
        assert_eq!(LeaderboardRange::parse(None), LeaderboardRange::AllTime);
        assert_eq!(
            LeaderboardRange::parse(Some("ALL")),
            LeaderboardRange::AllTime
        );
        assert_eq!(
            LeaderboardRange::parse(Some("anything")),
            LeaderboardRange::AllTime
        );
    }

    #[test]
    fn range_parse_recognizes_weekly() {
        assert_eq!(
            LeaderboardRange::parse(Some("weekly")),
            LeaderboardRange::Weekly
        );
        assert_eq!(
            LeaderboardRange::parse(Some("Weekly")),
            LeaderboardRange::Weekly
        );
    }
}
