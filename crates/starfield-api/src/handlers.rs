//! REST API endpoint handlers.
//!
//! Every handler goes through the shared [`AppState`]. Reads take the
//! simulation read lock; creating and deleting ships take the write lock and
//! then hand the change to the persistence gate without waiting for it.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Request count, population, tick, persistence state |
//! | `GET` | `/api/ships` | List live ships |
//! | `GET` | `/api/ships/{id}` | Get one ship |
//! | `POST` | `/api/ships` | Launch a ship |
//! | `DELETE` | `/api/ships/{id}` | Remove a ship |
//! | `GET` | `/api/space` | List space points |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use starfield_core::ship::ShipBlueprint;
use starfield_types::ShipId;
use tracing::info;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// GET / -- general data
// ---------------------------------------------------------------------------

/// Report request count, live population, tick, and persistence state.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let sim = state.simulation.read().await;
    Json(serde_json::json!({
        "request_count": state.request_count(),
        "active_ships": sim.registry().len(),
        "tick": sim.tick(),
        "persistence_available": state.persistence.is_available(),
    }))
}

// ---------------------------------------------------------------------------
// GET /api/ships -- list ships
// ---------------------------------------------------------------------------

/// List every live ship.
pub async fn list_ships(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let sim = state.simulation.read().await;
    let ships = serde_json::to_value(sim.registry().list())?;
    Ok(Json(serde_json::json!({
        "count": sim.registry().len(),
        "ships": ships,
    })))
}

// ---------------------------------------------------------------------------
// GET /api/ships/{id} -- single ship
// ---------------------------------------------------------------------------

/// Return one live ship.
pub async fn get_ship(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = ShipId::from(parse_uuid(&id_str)?);
    let sim = state.simulation.read().await;
    let ship = sim
        .registry()
        .get(id)
        .ok_or_else(|| ApiError::NotFound(format!("ship {id}")))?;
    Ok(Json(serde_json::to_value(ship)?))
}

// ---------------------------------------------------------------------------
// POST /api/ships -- launch a ship
// ---------------------------------------------------------------------------

/// Launch a fresh ship from a blueprint.
///
/// The ship is built against the live field, registered, and persisted in
/// the background. Responds `201 Created` with the ship.
pub async fn create_ship(
    State(state): State<Arc<AppState>>,
    Json(blueprint): Json<ShipBlueprint>,
) -> Result<impl IntoResponse, ApiError> {
    validate_blueprint(&blueprint)?;

    let (body, record) = {
        let mut sim = state.simulation.write().await;
        let id = sim.launch(blueprint)?;
        let ship = sim
            .registry()
            .get(id)
            .ok_or_else(|| ApiError::NotFound(format!("ship {id}")))?;
        (serde_json::to_value(ship)?, ship.to_record())
    };

    info!(ship_id = %record.blueprint.id, name = %record.blueprint.name, "Ship launched over HTTP");
    let _ = state.persistence.spawn_upsert(record);

    Ok((StatusCode::CREATED, Json(body)))
}

// ---------------------------------------------------------------------------
// DELETE /api/ships/{id} -- remove a ship
// ---------------------------------------------------------------------------

/// Remove a live ship. Responds `204 No Content`.
pub async fn delete_ship(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = ShipId::from(parse_uuid(&id_str)?);
    let removed = state.simulation.write().await.registry_mut().remove(id);
    if removed.is_none() {
        return Err(ApiError::NotFound(format!("ship {id}")));
    }

    let _ = state.persistence.spawn_delete(id);
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// GET /api/space -- space points
// ---------------------------------------------------------------------------

/// List every space point with its visit count.
pub async fn list_space_points(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let sim = state.simulation.read().await;
    let points = sim.field().points();
    Ok(Json(serde_json::json!({
        "count": points.len(),
        "points": serde_json::to_value(points)?,
    })))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_uuid(s: &str) -> Result<Uuid, ApiError> {
    s.parse::<Uuid>()
        .map_err(|e| ApiError::InvalidUuid(format!("{s}: {e}")))
}

fn validate_blueprint(blueprint: &ShipBlueprint) -> Result<(), ApiError> {
    if blueprint.name.trim().is_empty() {
        return Err(ApiError::InvalidShip(String::from("name must not be empty")));
    }
    let mission = &blueprint.mission;
    if !mission.radius.is_finite() || mission.radius <= 0.0 {
        return Err(ApiError::InvalidShip(format!(
            "mission radius must be positive, got {}",
            mission.radius
        )));
    }
    let center = mission.center;
    if ![center.x, center.y, center.z].iter().all(|c| c.is_finite()) {
        return Err(ApiError::InvalidShip(String::from(
            "mission center must be finite",
        )));
    }
    Ok(())
}
