mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{create_test_app, request, signup_user, unique_name};

#[tokio::test]
async fn signup_returns_token_and_profile() {
    let app = create_test_app().await;
    let username = unique_name("gon");

    let (status, body) = request(
        &app.router,
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

    assert_eq!(status, StatusCode::CREATED);
    assert!(!body["token"].as_str().unwrap().is_empty());
    assert_eq!(body["user"]["username"], username);
    assert_eq!(body["user"]["isAdmin"], false);
    assert_eq!(body["user"]["points"], 0);
    assert_eq!(body["user"]["preferredDifficulty"], 2);
    assert_eq!(body["user"]["stats"]["wins"], 0);
}

#[tokio::test]
async fn signup_rejects_duplicate_username() {
    let app = create_test_app().await;
    let username = unique_name("killua");
    signup_user(&app.router, &username).await;

    let (status, body) = request(
        &app.router,
        "POST",
        "/api/auth/signup",
        None,
        Some(json!({
            "username": username,
            "email": format!("other-{}@example.com", username),
            "password": "correct-horse-battery",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn signup_rejects_duplicate_email() {
    let app = create_test_app().await;
    let username = unique_name("kurapika");
    signup_user(&app.router, &username).await;

    let (status, _) = request(
        &app.router,
        "POST",
        "/api/auth/signup",
        None,
        Some(json!({
            "username": unique_name("leorio"),
            "email": format!("{}@example.com", username),
            "password": "correct-horse-battery",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn signup_validates_input() {
    let app = create_test_app().await;

    // too-short password
    let (status, _) = request(
        &app.router,
        "POST",
        "/api/auth/signup",
        None,
        Some(json!({
            "username": unique_name("hisoka"),
            "email": "hisoka@example.com",
            "password": "short",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // malformed email
    let (status, _) = request(
        &app.router,
        "POST",
        "/api/auth/signup",
        None,
        Some(json!({
            "username": unique_name("hisoka"),
            "email": "not-an-email",
            "password": "correct-horse-battery",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_roundtrip() {
    let app = create_test_app().await;
    let username = unique_name("bisky");
    signup_user(&app.router, &username).await;

    let (status, body) = request(
        &app.router,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({
            "email": format!("{}@example.com", username),
            "password": "correct-horse-battery",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(!body["token"].as_str().unwrap().is_empty());
    assert_eq!(body["user"]["username"], username);
}

#[tokio::test]
async fn login_rejects_wrong_password() {
    let app = create_test_app().await;
    let username = unique_name("wing");
    signup_user(&app.router, &username).await;

    let (status, _) = request(
        &app.router,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({
            "email": format!("{}@example.com", username),
            "password": "completely-wrong-pass",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn me_requires_valid_token() {
    let app = create_test_app().await;

    let (status, _) = request(&app.router, "GET", "/api/users/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = request(
        &app.router,
        "GET",
        "/api/users/me",
        Some("not-a-real-token"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn me_returns_profile() {
    let app = create_test_app().await;
    let username = unique_name("kite");
    let (token, user_id) = signup_user(&app.router, &username).await;

    let (status, body) = request(&app.router, "GET", "/api/users/me", Some(&token), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], user_id);
    assert_eq!(body["username"], username);
    assert_eq!(body["email"], format!("{}@example.com", username));
}
