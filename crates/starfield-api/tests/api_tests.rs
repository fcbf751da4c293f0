//! Integration tests for the HTTP API endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde_json::{Value, json};
use starfield_api::router::build_router;
use starfield_api::state::AppState;
use starfield_core::config::FlightConfig;
use starfield_core::mission::MissionBrief;
use starfield_core::persistence::Persistence;
use starfield_core::ship::ShipBlueprint;
use starfield_core::simulation::Simulation;
use starfield_core::space::SpacePointField;
use starfield_types::{Coordinates, MissionId, ShipId};
use tower::ServiceExt;

fn blueprint(name: &str) -> ShipBlueprint {
    ShipBlueprint {
        id: ShipId::new(),
        name: name.to_owned(),
        description: String::from("Test vessel"),
        condition: 100,
        mission: MissionBrief {
            id: MissionId::new(),
            title: String::from("Survey"),
            objective: String::from("Exploration"),
            description: String::new(),
            center: Coordinates::new(100.0, 100.0, 100.0),
            radius: 120.0,
        },
    }
}

/// State with a 30-point field and one ship already launched.
async fn make_test_state() -> (Arc<AppState>, ShipId) {
    let mut rng = SmallRng::seed_from_u64(42);
    let field = SpacePointField::generate(30, 500, &mut rng);
    let mut sim = Simulation::with_rng(field, FlightConfig::default(), rng);
    let id = sim.launch(blueprint("Voyager")).unwrap();
    let state = Arc::new(AppState::new(sim.into_shared(), Persistence::disabled()));
    state.simulation.write().await.step();
    (state, id)
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn index_reports_general_data() {
    let (state, _) = make_test_state().await;
    let router = build_router(state);

    let response = router
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["active_ships"], 1);
    assert_eq!(json["tick"], 1);
    assert_eq!(json["request_count"], 1);
    assert_eq!(json["persistence_available"], false);
}

#[tokio::test]
async fn requests_are_counted() {
    let (state, _) = make_test_state().await;

    for _ in 0..3 {
        let _ = build_router(Arc::clone(&state))
            .oneshot(Request::get("/api/space").body(Body::empty()).unwrap())
            .await
            .unwrap();
    }

    assert_eq!(state.request_count(), 3);
}

#[tokio::test]
async fn list_ships() {
    let (state, id) = make_test_state().await;
    let router = build_router(state);

    let response = router
        .oneshot(Request::get("/api/ships").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["count"], 1);
    assert_eq!(json["ships"][0]["name"], "Voyager");
    assert_eq!(json["ships"][0]["id"], id.to_string());
    assert_eq!(json["ships"][0]["status"], "ACTIVE");
}

#[tokio::test]
async fn get_ship_by_id() {
    let (state, id) = make_test_state().await;
    let router = build_router(state);

    let response = router
        .oneshot(
            Request::get(format!("/api/ships/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["name"], "Voyager");
    assert_eq!(json["mission"]["objective"], "Exploration");
    assert!(
        json["logs"][0]["description"]
            .as_str()
            .unwrap()
            .contains("has entered space")
    );
}

#[tokio::test]
async fn get_unknown_ship_is_404() {
    let (state, _) = make_test_state().await;
    let router = build_router(state);

    let response = router
        .oneshot(
            Request::get(format!("/api/ships/{}", ShipId::new()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], 404);
}

#[tokio::test]
async fn malformed_id_is_400() {
    let (state, _) = make_test_state().await;
    let router = build_router(state);

    let response = router
        .oneshot(
            Request::get("/api/ships/not-a-uuid")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_ship_returns_201() {
    let (state, _) = make_test_state().await;
    let body = json!({
        "name": "Endeavour",
        "mission": {
            "title": "Far reach",
            "objective": "Colonization",
            "center": { "x": -200.0, "y": 0.0, "z": 50.0 },
            "radius": 250.0
        }
    });

    let response = build_router(Arc::clone(&state))
        .oneshot(post_json("/api/ships", &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["name"], "Endeavour");
    assert_eq!(json["condition"], 100);
    assert_eq!(json["destinations"].as_array().unwrap().len(), 3);
    assert_eq!(state.simulation.read().await.registry().len(), 2);
}

#[tokio::test]
async fn create_duplicate_ship_is_409() {
    let (state, id) = make_test_state().await;
    let mut duplicate = serde_json::to_value(blueprint("Twin")).unwrap();
    duplicate["id"] = json!(id);

    let response = build_router(Arc::clone(&state))
        .oneshot(post_json("/api/ships", &duplicate))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(state.simulation.read().await.registry().len(), 1);
}

#[tokio::test]
async fn create_ship_with_bad_radius_is_400() {
    let (state, _) = make_test_state().await;
    let mut body = serde_json::to_value(blueprint("Broken")).unwrap();
    body["mission"]["radius"] = json!(-5.0);

    let response = build_router(state)
        .oneshot(post_json("/api/ships", &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delete_ship() {
    let (state, id) = make_test_state().await;

    let response = build_router(Arc::clone(&state))
        .oneshot(
            Request::delete(format!("/api/ships/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(state.simulation.read().await.registry().is_empty());

    let response = build_router(state)
        .oneshot(
            Request::delete(format!("/api/ships/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_space_points() {
    let (state, _) = make_test_state().await;
    let router = build_router(state);

    let response = router
        .oneshot(Request::get("/api/space").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["count"], 30);
    assert_eq!(json["points"][0]["id"], 0);
    assert!(json["points"][0]["name"].as_str().unwrap().contains('-'));
}
