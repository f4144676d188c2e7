use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};

use crate::{
    dto::{room::RoomSnapshot, validation::validate_room_code},
    error::AppError,
    services::room_service,
    state::SharedState,
};

/// Read-only room inspection and administrative start.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/rooms/{id}", get(get_room))
        .route("/rooms/{id}/start", post(start_room))
}

/// Return the current snapshot of a room.
#[utoipa::path(
    get,
    path = "/rooms/{id}",
    tag = "rooms",
    params(("id" = String, Path, description = "Room code")),
    responses(
        (status = 200, description = "Room snapshot", body = RoomSnapshot),
        (status = 404, description = "Unknown room")
    )
)]
pub async fn get_room(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<RoomSnapshot>, AppError> {
    validate_path_code(&id)?;
    let snapshot = room_service::room_snapshot(&state, &id)?;
    Ok(Json(snapshot))
}

/// Start a waiting room before it reaches capacity.
#[utoipa::path(
    post,
    path = "/rooms/{id}/start",
    tag = "rooms",
    params(("id" = String, Path, description = "Room code")),
    responses(
        (status = 200, description = "Quiz starting", body = RoomSnapshot),
        (status = 404, description = "Unknown room"),
        (status = 409, description = "Room already started")
    )
)]
pub async fn start_room(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<RoomSnapshot>, AppError> {
    validate_path_code(&id)?;
    let snapshot = room_service::start_room(&state, &id, None)?;
    Ok(Json(snapshot))
}

fn validate_path_code(id: &str) -> Result<(), AppError> {
    validate_room_code(id).map_err(|err| AppError::BadRequest(err.to_string()))
}
