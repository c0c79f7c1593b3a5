mod common;

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::app_for;
use veritas_client::controllers::oauth::sign_in_with_browser;
use veritas_client::models::Role;
use veritas_client::server::CallbackServer;

#[derive(Serialize)]
struct Claims<'a> {
    sub: &'a str,
    role: &'a str,
    exp: i64,
}

fn provider_token(email: &str, role: &str) -> String {
    encode(
        &Header::new(Algorithm::HS512),
        &Claims { sub: email, role, exp: 4_102_444_800 },
        &EncodingKey::from_secret(b"backend-only-secret"),
    )
    .unwrap()
}

/// Имитирует браузер: после показа адреса авторизации провайдер редиректит на callback.
fn browser_redirect(target: String) -> impl FnOnce(&url::Url) {
    move |authorize_url| {
        assert!(authorize_url.as_str().ends_with("/oauth2/authorize/google"));
        tokio::spawn(async move {
            reqwest::get(target).await.unwrap();
        });
    }
}

#[tokio::test]
async fn token_from_redirect_signs_in_with_profile() {
    let backend = MockServer::start().await;
    let token = provider_token("asha@example.com", "USER");
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .and(header("authorization", format!("Bearer {}", token).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "fullName": "Asha Rao",
            "email": "asha@example.com",
            "role": "USER"
        })))
        .expect(1)
        .mount(&backend)
        .await;

    let app = app_for(&backend).await;
    let server = CallbackServer::start(&app.config.callback).await.unwrap();
    let target = server.url(&format!("/oauth-success?token={}", token));

    let user = sign_in_with_browser(&app, &server, "google", browser_redirect(target))
        .await
        .unwrap();
    server.shutdown().await;

    assert_eq!(user.full_name, "Asha Rao");
    assert!(app.session.is_authenticated().await);
    assert_eq!(app.cache.load_user().await.unwrap(), Some(user));
}

#[tokio::test]
async fn profile_failure_falls_back_to_token_claims() {
    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&backend)
        .await;

    let app = app_for(&backend).await;
    let server = CallbackServer::start(&app.config.callback).await.unwrap();
    let token = provider_token("staff@example.com", "ADMIN");
    let target = server.url(&format!("/oauth-success?token={}", token));

    let user = sign_in_with_browser(&app, &server, "google", browser_redirect(target))
        .await
        .unwrap();
    server.shutdown().await;

    assert_eq!(user.email, "staff@example.com");
    assert_eq!(user.role, Role::Admin);
}

#[tokio::test]
async fn provider_error_fails_the_sign_in() {
    let backend = MockServer::start().await;
    let app = app_for(&backend).await;
    let server = CallbackServer::start(&app.config.callback).await.unwrap();
    let target = server.url("/oauth-success?error=access_denied");

    let err = sign_in_with_browser(&app, &server, "google", browser_redirect(target))
        .await
        .unwrap_err();
    server.shutdown().await;

    assert_eq!(err.to_string(), "Authentication failed. Please try again.");
    assert!(!app.session.is_authenticated().await);
    assert!(backend.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn callback_without_pending_sign_in_is_refused() {
    let backend = MockServer::start().await;
    let app = app_for(&backend).await;
    let server = CallbackServer::start(&app.config.callback).await.unwrap();

    let response = reqwest::get(server.url("/oauth-success?token=abc")).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::CONFLICT);

    let health = reqwest::get(server.url("/health")).await.unwrap();
    assert_eq!(health.text().await.unwrap(), "OK");
    server.shutdown().await;
}
