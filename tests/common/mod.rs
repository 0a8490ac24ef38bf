#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::Database;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

use quizarena_api::{config::Config, create_router, services::AppState};

pub struct TestApp {
    pub router: Router,
    pub db: Database,
}

/// Build the real router against a throwaway database so tests stay isolated
/// from each other.
pub async fn create_test_app() -> TestApp {
    // Initialize tracing for tests
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    // Load test environment from .env.test
    dotenvy::from_filename(".env.test").ok();

    let mut config = Config::load().expect("Failed to load test configuration");
    config.mongo_database = format!("quizarena_test_{}", Uuid::new_v4().simple());

    let mongo_client = mongodb::Client::with_uri_str(&config.mongo_uri)
        .await
        .expect("Failed to connect to test MongoDB");

    let app_state = Arc::new(
        AppState::new(config, mongo_client)
            .await
            .expect("Failed to initialize test app state"),
    );
    let db = app_state.mongo.clone();

    TestApp {
        router: create_router(app_state),
        db,
    }
}

/// Issue one request against the router and decode the JSON body.
pub async fn request(
    router: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }

    let body = match body {
        Some(value) => Body::from(serde_json::to_string(&value).unwrap()),
        None => Body::empty(),
    };

    let response = router
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, json)
}

/// Sign up a fresh user through the API; returns (token, user_id_hex).
pub async fn signup_user(router: &Router, username: &str) -> (String, String) {
    let (status, body) = request(
        router,
        "POST",
        "/api/auth/signup",
        None,
        Some(json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "correct-horse-battery",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "signup failed: {}", body);

    let token = body["token"].as_str().unwrap().to_string();
    let user_id = body["user"]["id"].as_str().unwrap().to_string();
    (token, user_id)
}

pub fn unique_name(prefix: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    // keep usernames under the 32 char signup limit
    format!("{}-{}", prefix, &suffix[..10])
}

/// Seed questions directly into the store; returns each inserted id with its
/// correct index so tests can build known-score answer arrays.
pub async fn seed_questions(
    db: &Database,
    category: &str,
    count: usize,
    difficulty: i32,
) -> Vec<(ObjectId, i32)> {
    let collection = db.collection::<mongodb::bson::Document>("questions");
    let mut seeded = Vec::with_capacity(count);

    for i in 0..count {
        let correct_index = (i % 4) as i32;
        let now = mongodb::bson::DateTime::now();
        let result = collection
            .insert_one(doc! {
                "prompt": format!("{} question {}", category, i),
                "choices": ["a", "b", "c", "d"],
                "correctIndex": correct_index,
                "category": category,
                "difficulty": difficulty,
                "createdAt": now,
                "updatedAt": now,
            })
            .await
            .expect("Failed to seed question");
        seeded.push((result.inserted_id.as_object_id().unwrap(), correct_index));
    }

    seeded
}

/// Map ordered question ids from a view/start response to the answers that
/// score exactly `correct_count`, answering the rest wrong.
pub fn answers_for(
    ordered_ids: &[String],
    seeded: &[(ObjectId, i32)],
    correct_count: usize,
) -> Vec<i32> {
    ordered_ids
        .iter()
        .enumerate()
        .map(|(idx, id)| {
            let correct = seeded
                .iter()
                .find(|(oid, _)| oid.to_hex() == *id)
                .map(|(_, c)| *c)
                .expect("unknown question id in response");
            if idx < correct_count {
                correct
            } else {
                // any other in-range choice is wrong
                (correct + 1) % 4
            }
        })
        .collect()
}

/// Extract the ordered question id list from a battle view or quiz start body.
pub fn question_ids(body: &Value) -> Vec<String> {
    body["questions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|q| q["id"].as_str().unwrap().to_string())
        .collect()
}
