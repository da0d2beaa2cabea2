//! Per-room participant identity, kept in the cookie-backed session.

use exchange_core::{ParticipantId, Room};
use tower_sessions::Session;

use crate::error::ApiError;

fn session_key(room_id: &str) -> String {
    format!("participant:{room_id}")
}

/// The caller's participant id in `room`, if the session names one that is
/// still part of the room.
pub async fn viewer(session: &Session, room: &Room) -> Result<Option<ParticipantId>, ApiError> {
    let stored = session.get::<ParticipantId>(&session_key(room.id())).await?;
    Ok(stored.filter(|id| room.participant(id).is_some()))
}

pub async fn remember(
    session: &Session,
    room_id: &str,
    participant_id: &str,
) -> Result<(), ApiError> {
    session.insert(&session_key(room_id), participant_id).await?;
    Ok(())
}
