mod common;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{app_for, concert_json, signed_in};
use veritas_client::error::AppError;
use veritas_client::models::ticket::TicketTypeDraft;
use veritas_client::models::{ConcertForm, Role, TicketPageType};

fn form(page_type: Option<TicketPageType>) -> ConcertForm {
    ConcertForm {
        name: "Arijit Live".into(),
        location: "Mumbai".into(),
        date: NaiveDate::from_ymd_opt(2026, 12, 31),
        time: "19:30".into(),
        description: "An evening of ballads".into(),
        short_description: "Ballads".into(),
        artists: "Arijit Singh".into(),
        image: "https://img.example/arijit.jpg".into(),
        ticket_page_type: page_type,
        ..Default::default()
    }
}

#[tokio::test]
async fn bookable_concert_without_ticket_types_is_rejected_offline() {
    let server = MockServer::start().await;
    let app = app_for(&server).await;
    signed_in(&app, Role::Admin).await;

    let err = app
        .catalog
        .add(&form(Some(TicketPageType::Bookable)))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Please add at least one ticket type");
    assert!(server.received_requests().await.unwrap().is_empty());
    assert!(app.catalog.concerts().await.is_empty());
}

#[tokio::test]
async fn missing_fields_are_listed_in_form_order() {
    let server = MockServer::start().await;
    let app = app_for(&server).await;
    signed_in(&app, Role::Admin).await;

    let mut incomplete = form(None);
    incomplete.location.clear();
    incomplete.short_description.clear();

    let err = app.catalog.add(&incomplete).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Please fill in all required fields: location, shortDescription"
    );
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_bookable_ticket_page_rolls_back_the_concert() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/concerts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(concert_json("42", "Arijit Live")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/tickets"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "message": "DB down" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/concerts/42"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let app = app_for(&server).await;
    signed_in(&app, Role::Admin).await;

    let mut bookable = form(Some(TicketPageType::Bookable));
    bookable.ticket_types = vec![TicketTypeDraft::new("General", Decimal::new(500, 0), 100)];

    let err = app.catalog.add(&bookable).await.unwrap_err();
    assert!(matches!(err, AppError::TicketPage(ref m) if m == "DB down"));
    assert!(app.catalog.by_id("42").await.is_none());
}

#[tokio::test]
async fn ticket_page_link_is_written_back_to_the_concert() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/concerts"))
        .and(body_partial_json(json!({ "slug": "arijit-live", "venue": "Mumbai" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(concert_json("42", "Arijit Live")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/tickets"))
        .and(header("X-Timezone-Offset", "-330"))
        .and(body_partial_json(json!({
            "concertId": "42",
            "pageType": "BOOKABLE",
            "ticketTypes": [{ "typeName": "General", "price": 500.0, "quantity": 100 }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "bookingUrl": "/book-ticket/page-9" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/concerts/42"))
        .and(body_partial_json(json!({ "ticketLink": "/book-ticket/page-9" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let app = app_for(&server).await;
    signed_in(&app, Role::Admin).await;

    let mut bookable = form(Some(TicketPageType::Bookable));
    bookable.ticket_types = vec![TicketTypeDraft::new("General", Decimal::new(500, 0), 100)];

    let concert = app.catalog.add(&bookable).await.unwrap();
    assert_eq!(concert.ticket_link.as_deref(), Some("/book-ticket/page-9"));

    let snapshot = app.cache.load_concert_snapshot().await.unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].ticket_link.as_deref(), Some("/book-ticket/page-9"));
}

#[tokio::test]
async fn non_bookable_ticket_page_failure_keeps_the_concert() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/concerts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(concert_json("7", "Arijit Live")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/tickets"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let app = app_for(&server).await;
    signed_in(&app, Role::Admin).await;

    let mut later = form(Some(TicketPageType::AvailableLater));
    later.available_from = NaiveDate::from_ymd_opt(2026, 11, 1).and_then(|d| d.and_hms_opt(10, 0, 0));

    let concert = app.catalog.add(&later).await.unwrap();
    assert_eq!(concert.id, "7");
    assert!(app.catalog.by_id("7").await.is_some());
}

#[tokio::test]
async fn regular_users_cannot_create_concerts() {
    let server = MockServer::start().await;
    let app = app_for(&server).await;
    signed_in(&app, Role::User).await;

    assert!(matches!(app.catalog.add(&form(None)).await, Err(AppError::Forbidden)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn authenticated_fetch_replaces_the_catalog() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/concerts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            concert_json("1", "Sunburn"),
            concert_json("2", "Lollapalooza India")
        ])))
        .mount(&server)
        .await;

    let app = app_for(&server).await;
    assert!(!app.catalog.fetch().await.unwrap());

    signed_in(&app, Role::User).await;
    assert!(app.catalog.fetch().await.unwrap());
    assert_eq!(app.catalog.concerts().await.len(), 2);
    assert_eq!(app.catalog.search("lolla").await.len(), 1);
    assert_eq!(app.cache.load_concert_snapshot().await.unwrap().len(), 2);
}

#[tokio::test]
async fn missing_ticket_page_is_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tickets/concert/5"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let app = app_for(&server).await;
    assert_eq!(app.catalog.ticket_details("5").await.unwrap(), None);
}
