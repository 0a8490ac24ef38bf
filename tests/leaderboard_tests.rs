mod common;

use axum::http::StatusCode;
use mongodb::bson::{doc, oid::ObjectId};

use common::{create_test_app, request, signup_user, unique_name};

async fn set_points(app: &common::TestApp, username: &str, points: i64) {
    app.db
        .collection::<mongodb::bson::Document>("users")
        .update_one(
            doc! { "username": username },
            doc! { "$set": { "points": points } },
        )
        .await
        .expect("Failed to set points");
}

async fn insert_attempt(app: &common::TestApp, user_id: &str, score: i32, days_ago: i64) {
    let created_at = mongodb::bson::DateTime::from_millis(
        (chrono::Utc::now() - chrono::Duration::days(days_ago)).timestamp_millis(),
    );
    app.db
        .collection::<mongodb::bson::Document>("quiz_attempts")
        .insert_one(doc! {
            "userId": ObjectId::parse_str(user_id).unwrap(),
            "mode": "solo",
            "questionIds": [],
            "answers": [],
            "score": score,
            "accuracy": 1.0,
            "createdAt": created_at,
        })
        .await
        .expect("Failed to insert quiz attempt");
}

#[tokio::test]
async fn leaderboard_requires_auth() {
    let app = create_test_app().await;

    let (status, _) = request(&app.router, "GET", "/api/leaderboard", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn all_time_ranks_by_points_descending() {
    let app = create_test_app().await;

    let low = unique_name("low");
    let mid = unique_name("mid");
    let top = unique_name("top");
    let (token, _) = signup_user(&app.router, &low).await;
    signup_user(&app.router, &mid).await;
    signup_user(&app.router, &top).await;

    set_points(&app, &low, 10).await;
    set_points(&app, &mid, 50).await;
    set_points(&app, &top, 80).await;

    let (status, body) = request(&app.router, "GET", "/api/leaderboard", Some(&token), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["range"], "all");
    let rows = body["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["rank"], 1);
    assert_eq!(rows[0]["username"], top);
    assert_eq!(rows[0]["points"], 80);
    assert_eq!(rows[1]["username"], mid);
    assert_eq!(rows[2]["rank"], 3);
    assert_eq!(rows[2]["username"], low);
    assert_eq!(rows[2]["points"], 10);
}

#[tokio::test]
async fn weekly_counts_only_recent_solo_attempts() {
    let app = create_test_app().await;

    let veteran = unique_name("veteran");
    let rookie = unique_name("rookie");
    let (token, veteran_id) = signup_user(&app.router, &veteran).await;
    let (_, rookie_id) = signup_user(&app.router, &rookie).await;

    // an old high score must not count toward the weekly board
    insert_attempt(&app, &veteran_id, 100, 8).await;
    insert_attempt(&app, &veteran_id, 5, 0).await;
    insert_attempt(&app, &rookie_id, 4, 1).await;
    insert_attempt(&app, &rookie_id, 3, 2).await;

    let (status, body) = request(
        &app.router,
        "GET",
        "/api/leaderboard?range=weekly",
        Some(&token),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["range"], "weekly");
    let rows = body["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["username"], rookie);
    assert_eq!(rows[0]["points"], 7);
    assert_eq!(rows[1]["username"], veteran);
    assert_eq!(rows[1]["points"], 5);
}

#[tokio::test]
async fn unknown_range_falls_back_to_all_time() {
    let app = create_test_app().await;
    let (token, _) = signup_user(&app.router, &unique_name("solo")).await;

    let (status, body) = request(
        &app.router,
        "GET",
        "/api/leaderboard?range=bogus",
        Some(&token),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["range"], "all");
}
