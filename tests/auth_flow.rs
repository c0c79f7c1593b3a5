mod common;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{app_for, app_for_url, fake_user, signed_in, TOKEN};
use veritas_client::error::AppError;
use veritas_client::middleware::{redirect_for, require_admin, Redirect};
use veritas_client::models::user::{ForgotPasswordForm, SignInForm, SignUpForm};
use veritas_client::models::Role;
use veritas_client::session::{SignUpOutcome, AUTO_LOGIN_FAILED};

#[tokio::test]
async fn sign_in_persists_token_and_profile() {
    let server = MockServer::start().await;
    let user = fake_user(Role::User);
    Mock::given(method("POST"))
        .and(path("/api/auth/signin"))
        .and(body_json(json!({ "email": user.email, "password": "secret" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": TOKEN,
            "role": "USER",
            "fullName": user.full_name,
            "email": user.email
        })))
        .expect(1)
        .mount(&server)
        .await;

    let app = app_for(&server).await;
    let signed = app
        .session
        .sign_in(&SignInForm { email: user.email.clone(), password: "secret".into() })
        .await
        .unwrap();

    assert_eq!(signed, user);
    assert!(app.session.is_authenticated().await);
    assert!(app.cache.load_token().await.unwrap().is_some());
    assert_eq!(app.cache.load_user().await.unwrap(), Some(user));
}

#[tokio::test]
async fn unauthorized_response_clears_session_and_redirects_to_sign_in() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/concerts"))
        .and(header("authorization", format!("Bearer {}", TOKEN).as_str()))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let app = app_for(&server).await;
    signed_in(&app, Role::User).await;

    let err = app.catalog.fetch().await.unwrap_err();
    assert!(matches!(err, AppError::Unauthorized));
    assert_eq!(redirect_for(&err), Some(Redirect::SignIn));
    assert!(!app.session.is_authenticated().await);
    assert!(app.cache.load_token().await.unwrap().is_none());
    assert!(app.cache.load_user().await.unwrap().is_none());
}

#[tokio::test]
async fn failed_profile_check_on_restore_clears_stored_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let app = app_for(&server).await;
    signed_in(&app, Role::User).await;

    assert_eq!(app.session.restore().await.unwrap(), None);
    assert!(!app.session.is_authenticated().await);
    assert!(app.cache.load_token().await.unwrap().is_none());
}

#[tokio::test]
async fn signup_reports_failed_auto_login() {
    let server = MockServer::start().await;
    let user = fake_user(Role::User);
    Mock::given(method("POST"))
        .and(path("/api/auth/signup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": TOKEN,
            "role": "USER",
            "fullName": user.full_name,
            "email": user.email
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/signin"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let app = app_for(&server).await;
    let outcome = app
        .session
        .sign_up(&SignUpForm {
            full_name: user.full_name.clone(),
            email: user.email.clone(),
            password: "secret".into(),
            confirm_password: "secret".into(),
        })
        .await
        .unwrap();

    assert_eq!(
        outcome,
        SignUpOutcome::CreatedButSignInFailed { message: AUTO_LOGIN_FAILED.to_string() }
    );
    assert!(!app.session.is_authenticated().await);
}

#[tokio::test]
async fn invalid_forms_never_reach_the_backend() {
    let server = MockServer::start().await;
    let app = app_for(&server).await;

    let err = app
        .session
        .sign_up(&SignUpForm {
            full_name: "Asha".into(),
            email: "asha@example.com".into(),
            password: "one".into(),
            confirm_password: "two".into(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Passwords do not match");

    let err = app
        .session
        .forgot_password(&ForgotPasswordForm { email: "not-an-email".into() })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn admin_guard_rejects_regular_users() {
    let server = MockServer::start().await;
    let app = app_for(&server).await;

    assert!(matches!(
        require_admin(&app.session).await,
        Err(AppError::AuthenticationRequired)
    ));

    signed_in(&app, Role::User).await;
    let err = require_admin(&app.session).await.err().unwrap();
    assert_eq!(redirect_for(&err), Some(Redirect::Home));

    app.session.logout().await.unwrap();
    signed_in(&app, Role::Admin).await;
    assert!(require_admin(&app.session).await.is_ok());
}

#[tokio::test]
async fn change_password_sends_code_to_current_email() {
    let mut backend = mockito::Server::new_async().await;
    let app = app_for_url(&backend.url()).await;
    let user = signed_in(&app, Role::User).await;

    let mock = backend
        .mock("POST", "/api/auth/forgot-password")
        .match_body(mockito::Matcher::Json(json!({ "email": user.email })))
        .with_status(200)
        .with_body("OTP sent to your email")
        .create_async()
        .await;

    let email = app.session.change_password().await.unwrap();
    assert_eq!(email, user.email);
    mock.assert_async().await;
}
