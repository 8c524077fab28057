use actix_web::{http::StatusCode, test, web, App};
use serde_json::json;
use waggle_engine::{
    db_types::{Engagement, EngagementStatus, Quote},
    events::EventProducers,
    EngagementFlowApi,
    SqliteDatabase,
};
use wgl_common::Cents;

use crate::{
    endpoint_tests::mocks::{TestProcessor, TestPusher},
    routes,
};

async fn fresh_db() -> SqliteDatabase {
    let path = std::env::temp_dir().join(format!("waggle_endpoint_{}.sqlite", rand::random::<u64>()));
    let url = format!("sqlite://{}?mode=rwc", path.display());
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating test database");
    db.run_migrations().await.expect("Error running migrations");
    db
}

macro_rules! test_app {
    ($processor:expr, $pusher:expr) => {{
        let db = fresh_db().await;
        let api = EngagementFlowApi::new(db, $processor.clone(), $pusher.clone(), EventProducers::default());
        test::init_service(
            App::new()
                .app_data(web::Data::new(api))
                .configure(routes::configure::<SqliteDatabase, TestProcessor, TestPusher>),
        )
        .await
    }};
}

macro_rules! seed_pair {
    ($app:expr) => {{
        for body in [
            json!({
                "participant_id": "O1", "name": "Ada", "role": "owner", "rating": 4.8,
                "device_token": "device-O1", "customer_ref": "cus_O1", "payout_account_ref": null
            }),
            json!({
                "participant_id": "W1", "name": "Grace", "role": "walker", "rating": 4.9,
                "device_token": "device-W1", "customer_ref": null, "payout_account_ref": "acct_W1"
            }),
        ] {
            let req = test::TestRequest::post().uri("/participant").set_json(&body).to_request();
            let resp = test::call_service($app, req).await;
            assert_eq!(resp.status(), StatusCode::OK);
        }
    }};
}

fn quote_body() -> serde_json::Value {
    json!({
        "owner_id": "O1", "walker_id": "W1", "dog_count": 2, "duration_minutes": 30,
        "origin_lat": 40.7484, "origin_lng": -73.9857
    })
}

#[actix_web::test]
async fn health_check() {
    let processor = TestProcessor::default();
    let pusher = TestPusher::default();
    let app = test_app!(processor, pusher);
    let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn full_walk_over_http() {
    let processor = TestProcessor::default();
    let pusher = TestPusher::default();
    let app = test_app!(processor, pusher);
    seed_pair!(&app);

    let req = test::TestRequest::post().uri("/quote").set_json(quote_body()).to_request();
    let quote: Quote = test::call_and_read_body_json(&app, req).await;
    assert_eq!(quote.total, Cents::new(3897));

    let req = test::TestRequest::post().uri(&format!("/quote/{}/dispatch", quote.id)).to_request();
    let engagement: Engagement = test::call_and_read_body_json(&app, req).await;
    assert_eq!(engagement.status, EngagementStatus::Pending);
    assert_eq!(pusher.push_count(), 1);
    let id = engagement.engagement_id.clone();

    let req = test::TestRequest::post().uri(&format!("/engagement/{id}/accept")).to_request();
    let engagement: Engagement = test::call_and_read_body_json(&app, req).await;
    assert_eq!(engagement.status, EngagementStatus::Accepted);
    assert_eq!(processor.capture_count(), 1);

    let req = test::TestRequest::post()
        .uri(&format!("/engagement/{id}/start"))
        .insert_header(("wgl-role", "walker"))
        .to_request();
    let engagement: Engagement = test::call_and_read_body_json(&app, req).await;
    assert_eq!(engagement.status, EngagementStatus::InProgress);

    let req = test::TestRequest::post()
        .uri(&format!("/engagement/{id}/complete"))
        .insert_header(("wgl-role", "walker"))
        .to_request();
    let engagement: Engagement = test::call_and_read_body_json(&app, req).await;
    assert_eq!(engagement.status, EngagementStatus::Completed);

    let req = test::TestRequest::get().uri(&format!("/engagement/{id}")).to_request();
    let stored: Engagement = test::call_and_read_body_json(&app, req).await;
    assert_eq!(stored.status, EngagementStatus::Completed);
}

#[actix_web::test]
async fn invalid_duration_is_a_bad_request() {
    let processor = TestProcessor::default();
    let pusher = TestPusher::default();
    let app = test_app!(processor, pusher);
    seed_pair!(&app);
    let mut body = quote_body();
    body["duration_minutes"] = json!(45);
    let req = test::TestRequest::post().uri("/quote").set_json(&body).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn double_accept_is_a_conflict_with_one_capture() {
    let processor = TestProcessor::default();
    let pusher = TestPusher::default();
    let app = test_app!(processor, pusher);
    seed_pair!(&app);
    let req = test::TestRequest::post().uri("/quote").set_json(quote_body()).to_request();
    let quote: Quote = test::call_and_read_body_json(&app, req).await;
    let req = test::TestRequest::post().uri(&format!("/quote/{}/dispatch", quote.id)).to_request();
    let engagement: Engagement = test::call_and_read_body_json(&app, req).await;
    let id = engagement.engagement_id;

    let req = test::TestRequest::post().uri(&format!("/engagement/{id}/accept")).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    let req = test::TestRequest::post().uri(&format!("/engagement/{id}/accept")).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);
    assert_eq!(processor.capture_count(), 1);
}

#[actix_web::test]
async fn declined_capture_maps_to_bad_gateway() {
    let processor = TestProcessor::default();
    let pusher = TestPusher::default();
    let app = test_app!(processor, pusher);
    seed_pair!(&app);
    let req = test::TestRequest::post().uri("/quote").set_json(quote_body()).to_request();
    let quote: Quote = test::call_and_read_body_json(&app, req).await;
    let req = test::TestRequest::post().uri(&format!("/quote/{}/dispatch", quote.id)).to_request();
    let engagement: Engagement = test::call_and_read_body_json(&app, req).await;

    processor.decline_captures();
    let req =
        test::TestRequest::post().uri(&format!("/engagement/{}/accept", engagement.engagement_id)).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_GATEWAY);

    let req = test::TestRequest::get().uri(&format!("/engagement/{}", engagement.engagement_id)).to_request();
    let stored: Engagement = test::call_and_read_body_json(&app, req).await;
    assert_eq!(stored.status, EngagementStatus::PaymentFailure);
}

#[actix_web::test]
async fn an_owner_cannot_complete_a_walk() {
    let processor = TestProcessor::default();
    let pusher = TestPusher::default();
    let app = test_app!(processor, pusher);
    seed_pair!(&app);
    let req = test::TestRequest::post().uri("/quote").set_json(quote_body()).to_request();
    let quote: Quote = test::call_and_read_body_json(&app, req).await;
    let req = test::TestRequest::post().uri(&format!("/quote/{}/dispatch", quote.id)).to_request();
    let engagement: Engagement = test::call_and_read_body_json(&app, req).await;
    let id = engagement.engagement_id;
    let req = test::TestRequest::post().uri(&format!("/engagement/{id}/accept")).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    let req = test::TestRequest::post()
        .uri(&format!("/engagement/{id}/start"))
        .insert_header(("wgl-role", "walker"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri(&format!("/engagement/{id}/complete"))
        .insert_header(("wgl-role", "owner"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn missing_role_header_is_a_bad_request() {
    let processor = TestProcessor::default();
    let pusher = TestPusher::default();
    let app = test_app!(processor, pusher);
    seed_pair!(&app);
    let req = test::TestRequest::post().uri("/quote").set_json(quote_body()).to_request();
    let quote: Quote = test::call_and_read_body_json(&app, req).await;
    let req = test::TestRequest::post().uri(&format!("/quote/{}/dispatch", quote.id)).to_request();
    let engagement: Engagement = test::call_and_read_body_json(&app, req).await;
    let req =
        test::TestRequest::post().uri(&format!("/engagement/{}/deny", engagement.engagement_id)).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn unknown_engagement_is_not_found() {
    let processor = TestProcessor::default();
    let pusher = TestPusher::default();
    let app = test_app!(processor, pusher);
    let req = test::TestRequest::get().uri("/engagement/nope").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}
