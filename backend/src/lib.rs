use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use exchange_core::{
    admit_participant, can_draw, participant_listing, perform_draw, resolve_match, DrawStatus,
    ParticipantListing, ResolvedMatch, RoomSummary,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tower_sessions::cookie::SameSite;
use tower_sessions::{Expiry, Session, SessionManagerLayer};
use tracing::{error, info, warn};

pub mod config;
pub mod error;
pub mod identity;
pub mod logging;
pub mod sessions;
pub mod store;

use error::ApiError;
use sessions::ExpiringMemoryStore;
use store::{JsonFileRoomStore, MemoryRoomStore, RoomLocks, RoomStore};

const LOG_TARGET: &str = "backend::rooms";

pub const DEFAULT_SESSION_DAYS: i64 = 60;

#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn RoomStore>,
    locks: RoomLocks,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Arc::new(MemoryRoomStore::default()))
    }
}

impl AppState {
    pub fn new(store: Arc<dyn RoomStore>) -> Self {
        Self {
            store,
            locks: RoomLocks::default(),
        }
    }

    pub async fn with_persistence(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let store = JsonFileRoomStore::open(dir).await?;
        Ok(Self::new(Arc::new(store)))
    }
}

pub fn app(state: AppState) -> Router {
    app_with_sessions(
        state,
        ExpiringMemoryStore::default(),
        time::Duration::days(DEFAULT_SESSION_DAYS),
    )
}

pub fn app_with_sessions(
    state: AppState,
    session_store: ExpiringMemoryStore,
    inactivity: time::Duration,
) -> Router {
    let sessions = SessionManagerLayer::new(session_store)
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(inactivity));

    Router::new()
        .route("/room", post(create_room))
        .route("/room/:id", get(get_room))
        .route("/room/:id/participants", get(list_participants))
        .route("/room/:id/join", post(join_room))
        .route("/room/:id/draw", post(draw_room))
        .route("/room/:id/match", get(get_match))
        .layer(sessions)
        .layer(middleware::from_fn(logging::log_requests))
        .with_state(state)
}

#[derive(Deserialize)]
struct CreateRoomRequest {
    name: String,
    #[serde(default)]
    max_date: String,
    #[serde(default)]
    max_price: String,
}

#[derive(Serialize)]
struct CreateRoomResponse {
    room_id: String,
    invite_path: String,
}

#[derive(Serialize)]
struct RoomView {
    #[serde(flatten)]
    summary: RoomSummary,
    joined: bool,
    can_draw: bool,
}

#[derive(Serialize)]
struct ParticipantsResponse {
    draw_status: DrawStatus,
    participants: Vec<ParticipantListing>,
}

#[derive(Deserialize)]
struct JoinRequest {
    name: String,
    #[serde(default)]
    gift_hint: Option<String>,
}

#[derive(Serialize)]
struct JoinResponse {
    participant_id: String,
    name: String,
    already_joined: bool,
}

#[derive(Serialize)]
struct MatchResponse {
    recipient: Option<ResolvedMatch>,
}

async fn create_room(
    State(state): State<AppState>,
    Json(payload): Json<CreateRoomRequest>,
) -> Result<Response, ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::bad_request("name required"));
    }

    let room = exchange_core::create_room(payload.name, payload.max_date, payload.max_price);
    state.store.save(&room).await?;
    info!(target: LOG_TARGET, room_id = %room.id(), "room created");

    Ok((
        StatusCode::CREATED,
        Json(CreateRoomResponse {
            invite_path: format!("/room/{}/join", room.id()),
            room_id: room.id().to_string(),
        }),
    )
        .into_response())
}

async fn get_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    session: Session,
) -> Result<Json<RoomView>, ApiError> {
    let room = state.store.load(&room_id).await?;
    let joined = identity::viewer(&session, &room).await?.is_some();

    Ok(Json(RoomView {
        summary: RoomSummary::from(&room),
        joined,
        can_draw: can_draw(&room),
    }))
}

async fn list_participants(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<ParticipantsResponse>, ApiError> {
    let room = state.store.load(&room_id).await?;
    Ok(Json(ParticipantsResponse {
        draw_status: room.draw_status(),
        participants: participant_listing(&room),
    }))
}

async fn join_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    session: Session,
    Json(payload): Json<JoinRequest>,
) -> Result<Response, ApiError> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("name required"));
    }

    let _guard = state.locks.acquire(&room_id).await;
    let mut room = state.store.load(&room_id).await?;

    if let Some(existing) = identity::viewer(&session, &room).await? {
        if let Some(participant) = room.participant(&existing) {
            return Ok((
                StatusCode::OK,
                Json(JoinResponse {
                    participant_id: participant.id.clone(),
                    name: participant.name.clone(),
                    already_joined: true,
                }),
            )
                .into_response());
        }
    }

    let participant = admit_participant(&mut room, name, payload.gift_hint)?;
    // A remembered id that never got saved is ignored by `identity::viewer`.
    identity::remember(&session, room.id(), &participant.id).await?;
    state.store.save(&room).await?;

    info!(
        target: LOG_TARGET,
        room_id = %room.id(),
        participant_count = room.participants().len(),
        "participant joined"
    );

    Ok((
        StatusCode::CREATED,
        Json(JoinResponse {
            participant_id: participant.id,
            name: participant.name,
            already_joined: false,
        }),
    )
        .into_response())
}

async fn draw_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomSummary>, ApiError> {
    let _guard = state.locks.acquire(&room_id).await;
    let mut room = state.store.load(&room_id).await?;

    // Never seeded from the request; the join order is public.
    let mut rng = ChaCha8Rng::from_entropy();
    if let Err(err) = perform_draw(&mut room, &mut rng) {
        match err {
            exchange_core::RoomError::DerangementRetryExhausted { trials } => {
                error!(target: LOG_TARGET, room_id = %room_id, trials, "draw aborted")
            }
            _ => warn!(target: LOG_TARGET, room_id = %room_id, %err, "draw rejected"),
        }
        return Err(err.into());
    }

    state.store.save(&room).await?;
    info!(
        target: LOG_TARGET,
        room_id = %room.id(),
        participant_count = room.participants().len(),
        "draw completed"
    );

    Ok(Json(RoomSummary::from(&room)))
}

async fn get_match(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    session: Session,
) -> Result<Json<MatchResponse>, ApiError> {
    let room = state.store.load(&room_id).await?;
    let recipient = identity::viewer(&session, &room)
        .await?
        .and_then(|viewer| resolve_match(&room, &viewer));

    Ok(Json(MatchResponse { recipient }))
}
