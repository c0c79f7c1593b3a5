//! Общие помощники интеграционных тестов.
#![allow(dead_code)]

use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use fake::Fake;
use secrecy::SecretString;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use wiremock::MockServer;

use veritas_client::config::Config;
use veritas_client::models::{Role, User};
use veritas_client::AppState;

pub const TOKEN: &str = "test-token";

/// Приложение против мок-бэкенда, хранилище в памяти.
pub async fn app_for(server: &MockServer) -> Arc<AppState> {
    app_for_url(&server.uri()).await
}

pub async fn app_for_url(base_url: &str) -> Arc<AppState> {
    AppState::new(Config::for_backend(base_url))
        .await
        .expect("app state")
}

/// Приложение на файловой базе: несколько экземпляров на одном файле ведут себя как
/// последовательные запуски CLI.
pub async fn app_on_disk(server: &MockServer, db_path: &Path) -> Arc<AppState> {
    let mut config = Config::for_backend(&server.uri());
    config.storage.database_url = format!("sqlite://{}", db_path.display());
    AppState::new(config).await.expect("app state")
}

pub fn fake_user(role: Role) -> User {
    User {
        full_name: Name().fake(),
        email: SafeEmail().fake(),
        role,
    }
}

/// Вход без сетевых вызовов.
pub async fn signed_in(app: &AppState, role: Role) -> User {
    let user = fake_user(role);
    app.session
        .login(SecretString::from(TOKEN.to_string()), user.clone())
        .await
        .expect("login");
    user
}

pub fn concert_json(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "venue": "NSCI Dome",
        "location": "Mumbai",
        "date": "2026-12-31",
        "time": "19:30",
        "description": "An evening of ballads",
        "shortDescription": "Ballads",
        "artists": "Arijit Singh",
        "image": "https://img.example/arijit.jpg",
        "slug": "arijit-live",
        "gradient": ["from-violet-600", "to-indigo-500"],
        "ticketLink": null
    })
}

pub fn bookable_page_json(concert_id: &str) -> Value {
    json!({
        "concertId": concert_id,
        "pageType": "BOOKABLE",
        "availableFrom": null,
        "bookingUrl": "/book-ticket/page-1",
        "ticketTypes": [
            { "typeName": "General", "price": 500, "quantity": 100 },
            { "typeName": "VIP", "price": 1500, "quantity": 3 }
        ]
    })
}
