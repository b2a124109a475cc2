// SPDX-License-Identifier: MIT

//! Router-level flow tests against the Firestore emulator.

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
};
use nxo_mining_api::time_utils::now_millis;
use tower::ServiceExt;

mod common;

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Unique identity per run; the emulator keeps data between runs.
/// The mock identity service derives the uid from the email's local part,
/// so uid == username here.
fn fresh_uid(prefix: &str) -> String {
    format!("{}-{}", prefix, now_millis())
}

fn signup_request(uid: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/signup")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::json!({
                "name": "Test User",
                "username": uid,
                "email": format!("{}@example.test", uid),
                "password": "pw",
            })
            .to_string(),
        ))
        .unwrap()
}

#[tokio::test]
async fn test_signup_then_duplicate_username_conflicts() {
    require_emulator!();
    let (app, _) = common::create_emulator_app().await;
    let uid = fresh_uid("dup");

    let response = app.clone().oneshot(signup_request(&uid)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Same handle again
    let response = app.oneshot(signup_request(&uid)).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body = body_json(response).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_signup_seeds_state_and_starter_card() {
    require_emulator!();
    let (app, state) = common::create_emulator_app().await;
    let uid = fresh_uid("seed");

    let response = app.oneshot(signup_request(&uid)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let mining = state.db.get_mining_state(&uid).await.unwrap().unwrap();
    assert_eq!(mining.nxo, 0.0);
    assert_eq!(mining.cards_count, 1);
    assert!(mining.puissance > 0.0);

    let cards = state.db.get_cards(&uid).await.unwrap().unwrap();
    assert_eq!(cards.cards.len(), 1);
    assert_eq!(cards.cards[0].active, 1);
}

#[tokio::test]
async fn test_start_mining_twice_reports_conflict() {
    require_emulator!();
    let (app, _) = common::create_emulator_app().await;
    let uid = fresh_uid("start");

    let response = app.clone().oneshot(signup_request(&uid)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let start = |app: axum::Router, uid: String| async move {
        app.oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/start-mining/{}", uid))
                .header(
                    header::AUTHORIZATION,
                    format!("Bearer {}", common::mock_token(&uid)),
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
    };

    let response = start(app.clone(), uid.clone()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert!(body["next-mining"].as_i64().unwrap() > body["last-mining"].as_i64().unwrap());

    // Session still in the future: refused
    let response = start(app, uid).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_mining_stats_matches_active_card_sums() {
    require_emulator!();
    let (app, state) = common::create_emulator_app().await;
    use nxo_mining_api::models::{Card, CardCollection};
    let uid = fresh_uid("stats");

    let response = app.clone().oneshot(signup_request(&uid)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Replace the collection with two active cards and one inactive
    let cards = CardCollection {
        cards: vec![
            Card {
                name: "A".to_string(),
                energy: 1,
                puissance: 0.3,
                bonus: 0.05,
                active: 1,
            },
            Card {
                name: "B".to_string(),
                energy: 2,
                puissance: 0.5,
                bonus: 0.0,
                active: 1,
            },
            Card {
                name: "C".to_string(),
                energy: 3,
                puissance: 9.0,
                bonus: 9.0,
                active: 0,
            },
        ],
    };
    state.db.set_cards(&uid, &cards).await.unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/update-mining-stats/{}", uid))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert!((body["puissance"].as_f64().unwrap() - 0.8).abs() < 1e-9);
    assert!((body["bonus"].as_f64().unwrap() - 0.05).abs() < 1e-9);

    // Cache was invalidated: mining-data reflects the recomputed sums
    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/mining-data/{}", uid))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = body_json(response).await;
    assert!((body["miningData"]["puissance"].as_f64().unwrap() - 0.8).abs() < 1e-9);
}

#[tokio::test]
async fn test_cards_route_lists_only_active_cards() {
    require_emulator!();
    let (app, state) = common::create_emulator_app().await;
    use nxo_mining_api::models::{Card, CardCollection};
    let uid = fresh_uid("cards");

    let response = app.clone().oneshot(signup_request(&uid)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cards = CardCollection {
        cards: vec![
            Card {
                name: "Active".to_string(),
                energy: 1,
                puissance: 0.2,
                bonus: 0.0,
                active: 1,
            },
            Card {
                name: "Benched".to_string(),
                energy: 1,
                puissance: 0.4,
                bonus: 0.0,
                active: 0,
            },
        ],
    };
    state.db.set_cards(&uid, &cards).await.unwrap();
    state.cache.invalidate_user(&uid);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/cards/{}", uid))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let active = body["activeCards"].as_array().unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0]["name"], "Active");
}

#[tokio::test]
async fn test_collect_with_nothing_accrued_is_refused() {
    require_emulator!();
    let (app, _) = common::create_emulator_app().await;
    let uid = fresh_uid("collect");

    let response = app.clone().oneshot(signup_request(&uid)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/collect-nxo/{}", uid))
                .header(
                    header::AUTHORIZATION,
                    format!("Bearer {}", common::mock_token(&uid)),
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
}
