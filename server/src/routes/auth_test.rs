use super::*;
use crate::routes::app;
use crate::state::test_helpers::{test_app_state, test_app_state_with_google};
use axum::body::Body;
use axum::http::{Request, header};
use tower::ServiceExt;

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).expect("request")
}

fn set_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok().map(str::to_owned))
        .collect()
}

// =============================================================================
// status mapping
// =============================================================================

#[test]
fn owner_errors_map_to_http_statuses() {
    assert_eq!(owner_error_to_status(&OwnerError::EmailTaken), StatusCode::CONFLICT);
    assert_eq!(owner_error_to_status(&OwnerError::InvalidCredentials), StatusCode::UNAUTHORIZED);
    assert_eq!(owner_error_to_status(&OwnerError::NotFound(uuid::Uuid::nil())), StatusCode::NOT_FOUND);
    assert_eq!(owner_error_to_status(&OwnerError::InvalidInput("email".into())), StatusCode::BAD_REQUEST);
    assert_eq!(owner_error_to_status(&OwnerError::Hash("boom".into())), StatusCode::INTERNAL_SERVER_ERROR);
}

#[test]
fn cookies_are_http_only_and_lax() {
    let cookie = build_cookie(COOKIE_NAME, "abc".into(), true, Duration::hours(2));
    assert_eq!(cookie.value(), "abc");
    assert_eq!(cookie.http_only(), Some(true));
    assert_eq!(cookie.secure(), Some(true));
    assert_eq!(cookie.same_site(), Some(SameSite::Lax));
    assert_eq!(cookie.path(), Some("/"));
    assert_eq!(cookie.max_age(), Some(Duration::hours(2)));

    let cleared = expired_cookie(COOKIE_NAME, false);
    assert_eq!(cleared.value(), "");
    assert_eq!(cleared.max_age(), Some(Duration::ZERO));
}

// =============================================================================
// extractor
// =============================================================================

#[tokio::test]
async fn me_without_cookie_is_unauthorized() {
    let response = app(test_app_state()).oneshot(get("/api/auth/me")).await.expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn ws_ticket_requires_session() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/ws-ticket")
        .body(Body::empty())
        .expect("request");
    let response = app(test_app_state()).oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn empty_session_cookie_is_unauthorized() {
    let request = Request::builder()
        .uri("/api/owner/profile")
        .header(header::COOKIE, format!("{COOKIE_NAME}="))
        .body(Body::empty())
        .expect("request");
    let response = app(test_app_state()).oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// google sign-in
// =============================================================================

#[tokio::test]
async fn google_redirect_without_config_is_unavailable() {
    let response = app(test_app_state()).oneshot(get("/auth/google")).await.expect("response");
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn google_redirect_sets_state_cookie() {
    let response = app(test_app_state_with_google())
        .oneshot(get("/auth/google"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let location = response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .expect("location");
    assert!(location.starts_with("https://accounts.google.com/"));

    let cookies = set_cookies(&response);
    let state_cookie = cookies
        .iter()
        .find(|c| c.starts_with(OAUTH_STATE_COOKIE_NAME))
        .expect("oauth state cookie");
    let value = state_cookie
        .split(';')
        .next()
        .and_then(|kv| kv.split_once('='))
        .map(|(_, v)| v)
        .expect("cookie value");
    assert!(location.contains(&format!("state={value}")));
}

#[tokio::test]
async fn callback_without_state_is_bad_request() {
    let response = app(test_app_state_with_google())
        .oneshot(get("/auth/google/callback?code=abc"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn callback_with_mismatched_state_is_rejected() {
    let request = Request::builder()
        .uri("/auth/google/callback?code=abc&state=forged")
        .header(header::COOKIE, format!("{OAUTH_STATE_COOKIE_NAME}=expected"))
        .body(Body::empty())
        .expect("request");
    let response = app(test_app_state_with_google()).oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn callback_without_config_is_unavailable() {
    let response = app(test_app_state())
        .oneshot(get("/auth/google/callback?code=abc&state=x"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

// =============================================================================
// live database
// =============================================================================

#[cfg(feature = "live-db-tests")]
#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL/live Postgres"]
async fn signup_then_me_round_trip() {
    use crate::config::test_helpers::test_config;
    use crate::db::test_helpers::integration_pool;
    use http_body_util::BodyExt;

    let pool = integration_pool().await;
    let state = AppState::new(pool, test_config(), None);
    let email = format!("owner-{}@example.com", uuid::Uuid::new_v4());
    let body = serde_json::json!({
        "email": email,
        "password": "correct horse battery",
        "restaurant_name": "Sharma Dhaba",
    });
    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/signup")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request");

    let response = app(state.clone()).oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);
    let cookie = set_cookies(&response)
        .into_iter()
        .find(|c| c.starts_with(COOKIE_NAME))
        .and_then(|c| c.split(';').next().map(str::to_owned))
        .expect("session cookie");

    let me = Request::builder()
        .uri("/api/auth/me")
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .expect("request");
    let response = app(state).oneshot(me).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.expect("body").to_bytes();
    let owner: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
    assert_eq!(owner["email"], email);
    assert_eq!(owner["restaurant_name"], "Sharma Dhaba");
}
