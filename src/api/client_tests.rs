//! End-to-end interceptor behaviour against a mock Conduit server

use crate::app::Conduit;
use crate::auth::navigator::CliNavigator;
use crate::auth::refresh::RefreshError;
use crate::config::Config;
use crate::error::AppError;
use crate::http::PersistentCookieJar;
use crate::routes;
use crate::session::types::test_session;
use crate::session::{MemorySessionStore, SessionRepository};
use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;
use std::sync::Arc;

struct Fixture {
    server: ServerGuard,
    conduit: Conduit,
    sessions: Arc<MemorySessionStore>,
}

async fn fixture(session_token: Option<&str>) -> Fixture {
    let server = Server::new_async().await;
    let sessions = Arc::new(match session_token {
        Some(token) => MemorySessionStore::with_session(test_session(token)),
        None => MemorySessionStore::new(),
    });
    let config = Config {
        api_url: server.url(),
        ..Config::default()
    };
    let conduit = Conduit::with_parts(
        &config,
        sessions.clone(),
        Arc::new(PersistentCookieJar::in_memory()),
        Arc::new(CliNavigator::new()),
    )
    .expect("client");
    Fixture {
        server,
        conduit,
        sessions,
    }
}

fn auth_error_body(code: &str, token_type: Option<&str>) -> String {
    let mut error = json!({
        "code": code,
        "message": "Unauthorized",
        "statusCode": 401,
        "timestamp": "2024-05-01T10:00:00Z",
        "path": "/api/user",
        "correlationId": "corr-1",
    });
    if let Some(token_type) = token_type {
        error["details"] = json!({ "tokenType": token_type });
    }
    json!({ "error": error }).to_string()
}

fn user_body(token: &str) -> String {
    json!({
        "user": {"username": "jake", "email": "jake@jake.jake", "token": token, "bio": "I work at statefarm", "image": null}
    })
    .to_string()
}

fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

#[tokio::test]
async fn test_expired_access_token_is_refreshed_and_replayed() {
    let mut f = fixture(None).await;
    let login = f
        .server
        .mock("POST", "/users/login")
        .with_status(200)
        .with_header("set-cookie", "refreshToken=r1; Path=/; HttpOnly")
        .with_body(user_body("old-token"))
        .create_async()
        .await;
    let expired = f
        .server
        .mock("GET", "/user")
        .match_header("authorization", bearer("old-token").as_str())
        .with_status(401)
        .with_body(auth_error_body("AUTH.TOKEN_EXPIRED", Some("access")))
        .expect(1)
        .create_async()
        .await;
    let refresh = f
        .server
        .mock("POST", "/users/refresh")
        .match_header("cookie", Matcher::Regex("refreshToken=r1".to_string()))
        .with_status(200)
        .with_body(json!({"user": {"token": "new-token"}}).to_string())
        .expect(1)
        .create_async()
        .await;
    let replayed = f
        .server
        .mock("GET", "/user")
        .match_header("authorization", bearer("new-token").as_str())
        .with_status(200)
        .with_body(user_body("new-token"))
        .expect(1)
        .create_async()
        .await;

    f.conduit.api().login("jake@jake.jake", "jakejake").await.expect("login");
    assert_eq!(f.conduit.jar().get("127.0.0.1", "refreshToken").as_deref(), Some("r1"));

    let user = f.conduit.api().current_user().await.expect("replayed request");

    assert_eq!(user.username, "jake");
    assert_eq!(f.sessions.token().as_deref(), Some("new-token"));
    assert!(!f.conduit.tokens().is_refreshing());
    login.assert_async().await;
    expired.assert_async().await;
    refresh.assert_async().await;
    replayed.assert_async().await;
}

#[tokio::test]
async fn test_revoked_refresh_token_forces_logout() {
    let mut f = fixture(Some("old-token")).await;
    f.conduit.navigator().visit(routes::article("how-to-train"));
    let feed = f
        .server
        .mock("GET", "/articles/feed")
        .match_query(Matcher::Any)
        .with_status(401)
        .with_body(auth_error_body("AUTH.REFRESH_TOKEN_REVOKED", None))
        .expect(1)
        .create_async()
        .await;
    let refresh = f
        .server
        .mock("POST", "/users/refresh")
        .expect(0)
        .create_async()
        .await;

    let result = f.conduit.api().feed(20, 0).await;

    match result {
        Err(AppError::Http(failure)) => {
            assert_eq!(failure.status, 401);
            assert_eq!(failure.messages(), vec!["Unauthorized".to_string()]);
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(f.sessions.current().is_none());
    assert_eq!(
        f.conduit.navigator().redirected_to().as_deref(),
        Some("/login/?redirect=%2Farticle%2Fhow-to-train")
    );
    feed.assert_async().await;
    refresh.assert_async().await;
}

#[tokio::test]
async fn test_credential_endpoints_are_not_intercepted() {
    let mut f = fixture(Some("old-token")).await;
    let login = f
        .server
        .mock("POST", "/users/login")
        .with_status(401)
        .with_body(auth_error_body("AUTH.TOKEN_EXPIRED", Some("access")))
        .expect(1)
        .create_async()
        .await;
    let register = f
        .server
        .mock("POST", "/users")
        .with_status(401)
        .with_body(auth_error_body("AUTH.TOKEN_EXPIRED", Some("access")))
        .expect(1)
        .create_async()
        .await;
    let refresh = f
        .server
        .mock("POST", "/users/refresh")
        .expect(0)
        .create_async()
        .await;

    let login_result = f.conduit.api().login("jake@jake.jake", "wrongpassword").await;
    let register_result = f.conduit.api().register("jake", "jake@jake.jake", "jakejake").await;

    assert!(login_result.unwrap_err().is_unauthorized());
    assert!(register_result.unwrap_err().is_unauthorized());
    // Wrong credentials do not end an existing session
    assert_eq!(f.sessions.token().as_deref(), Some("old-token"));
    assert_eq!(f.conduit.navigator().redirected_to(), None);
    login.assert_async().await;
    register.assert_async().await;
    refresh.assert_async().await;
}

#[tokio::test]
async fn test_replayed_request_is_never_retried_twice() {
    let mut f = fixture(Some("old-token")).await;
    let user = f
        .server
        .mock("GET", "/user")
        .with_status(401)
        .with_body(auth_error_body("AUTH.TOKEN_EXPIRED", Some("access")))
        .expect(2)
        .create_async()
        .await;
    let refresh = f
        .server
        .mock("POST", "/users/refresh")
        .with_status(200)
        .with_body(json!({"user": {"token": "new-token"}}).to_string())
        .expect(1)
        .create_async()
        .await;

    let result = f.conduit.api().current_user().await;

    assert!(result.unwrap_err().is_unauthorized());
    assert_eq!(f.sessions.token().as_deref(), Some("new-token"));
    user.assert_async().await;
    refresh.assert_async().await;
}

#[tokio::test]
async fn test_rejected_refresh_logs_out_and_fails_request() {
    let mut f = fixture(Some("old-token")).await;
    let article = f
        .server
        .mock("POST", "/articles/how-to-train/favorite")
        .with_status(401)
        .with_body(auth_error_body("AUTH.TOKEN_EXPIRED", Some("access")))
        .expect(1)
        .create_async()
        .await;
    let refresh = f
        .server
        .mock("POST", "/users/refresh")
        .with_status(401)
        .with_body(auth_error_body("AUTH.TOKEN_EXPIRED", Some("refresh")))
        .expect(1)
        .create_async()
        .await;

    let result = f.conduit.api().favorite("how-to-train").await;

    match result {
        Err(AppError::Refresh(RefreshError::Rejected(failure))) => assert_eq!(failure.status, 401),
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(f.sessions.current().is_none());
    assert!(f.conduit.navigator().redirected_to().is_some());
    article.assert_async().await;
    refresh.assert_async().await;
}

#[tokio::test]
async fn test_refresh_endpoint_401_is_not_recursed() {
    let mut f = fixture(Some("old-token")).await;
    let refresh = f
        .server
        .mock("POST", "/users/refresh")
        .with_status(401)
        .with_body(auth_error_body("AUTH.TOKEN_INVALID", None))
        .expect(1)
        .create_async()
        .await;

    let result = f.conduit.api().refresh_access_token().await;

    assert!(result.unwrap_err().is_unauthorized());
    assert!(f.sessions.current().is_none());
    refresh.assert_async().await;
}

#[tokio::test]
async fn test_non_401_errors_are_normalized_not_refreshed() {
    let mut f = fixture(Some("old-token")).await;
    let create = f
        .server
        .mock("POST", "/articles")
        .with_status(422)
        .with_body(
            json!({
                "error": {
                    "code": "VALIDATION.FAILED",
                    "message": "Validation failed",
                    "statusCode": 422,
                    "timestamp": "2024-05-01T10:00:00Z",
                    "path": "/api/articles",
                    "correlationId": "corr-2",
                    "details": {"title": ["must be unique"], "body": "is too short"}
                }
            })
            .to_string(),
        )
        .create_async()
        .await;
    let refresh = f
        .server
        .mock("POST", "/users/refresh")
        .expect(0)
        .create_async()
        .await;

    let result = f
        .conduit
        .api()
        .create_article(crate::api::schemas::NewArticle {
            title: "How to train".to_string(),
            description: "Ever wonder how?".to_string(),
            body: "x".to_string(),
            tag_list: vec![],
        })
        .await;

    let err = result.unwrap_err();
    assert_eq!(
        err.messages(),
        vec!["title must be unique".to_string(), "body is too short".to_string()]
    );
    assert_eq!(err.exit_code(), 1);
    assert_eq!(f.sessions.token().as_deref(), Some("old-token"));
    create.assert_async().await;
    refresh.assert_async().await;
}

#[tokio::test]
async fn test_unclassified_401_passes_through_after_refresh() {
    // A 401 without the auth envelope still gets one refresh attempt
    let mut f = fixture(Some("old-token")).await;
    let profile_old = f
        .server
        .mock("GET", "/profiles/celeb")
        .match_header("authorization", bearer("old-token").as_str())
        .with_status(401)
        .with_body("Unauthorized")
        .expect(1)
        .create_async()
        .await;
    let refresh = f
        .server
        .mock("POST", "/users/refresh")
        .with_status(200)
        .with_body(json!({"user": {"token": "new-token"}}).to_string())
        .expect(1)
        .create_async()
        .await;
    let profile_new = f
        .server
        .mock("GET", "/profiles/celeb")
        .match_header("authorization", bearer("new-token").as_str())
        .with_status(200)
        .with_body(json!({"profile": {"username": "celeb", "bio": null, "image": null, "following": false}}).to_string())
        .expect(1)
        .create_async()
        .await;

    let profile = f.conduit.api().profile("celeb").await.expect("profile");

    assert_eq!(profile.username, "celeb");
    profile_old.assert_async().await;
    refresh.assert_async().await;
    profile_new.assert_async().await;
}

#[tokio::test]
async fn test_anonymous_requests_carry_no_token() {
    let mut f = fixture(Some("old-token")).await;
    let tags = f
        .server
        .mock("GET", "/tags")
        .match_header("authorization", Matcher::Missing)
        .with_status(200)
        .with_body(r#"{"tags":["dragons"]}"#)
        .create_async()
        .await;

    assert_eq!(f.conduit.api().tags().await.unwrap(), vec!["dragons".to_string()]);
    tags.assert_async().await;
}

#[tokio::test]
async fn test_logout_clears_session_and_cookies() {
    let mut f = fixture(None).await;
    let login = f
        .server
        .mock("POST", "/users/login")
        .with_status(200)
        .with_header("set-cookie", "refreshToken=r1; Path=/; HttpOnly")
        .with_body(user_body("token"))
        .create_async()
        .await;

    f.conduit.api().login("jake@jake.jake", "jakejake").await.unwrap();
    assert!(!f.conduit.jar().is_empty());

    f.conduit.logout().unwrap();

    assert!(f.conduit.session().is_none());
    assert!(f.conduit.jar().is_empty());
    login.assert_async().await;
}
