use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

mod derangement;
mod view;

pub use derangement::{derange, derange_with_limit, MAX_DERANGEMENT_TRIALS};
pub use view::{participant_listing, resolve_match, ParticipantListing, ResolvedMatch, RoomSummary};

pub type RoomId = String;
pub type ParticipantId = String;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub gift_hint: Option<String>,
    pub joined_at: u64,
}

/// One giver -> receiver pairing of a completed draw.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Assignment {
    pub giver_id: ParticipantId,
    pub receiver_id: ParticipantId,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DrawStatus {
    Pending,
    Completed,
}

/// A gift exchange room.
///
/// The participant list only grows while the room is pending, and `matches`
/// is filled exactly once, by [`perform_draw`]. Assignment data is never
/// handed out directly; [`resolve_match`] is the only way to read it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Room {
    id: RoomId,
    name: String,
    max_date: String,
    max_price: String,
    participants: Vec<Participant>,
    matches: Vec<Assignment>,
    draw_status: DrawStatus,
    created_at: u64,
}

impl Room {
    pub fn new(
        id: impl Into<RoomId>,
        name: impl Into<String>,
        max_date: impl Into<String>,
        max_price: impl Into<String>,
        created_at: u64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into().trim().to_string(),
            max_date: max_date.into().trim().to_string(),
            max_price: max_price.into().trim().to_string(),
            participants: Vec::new(),
            matches: Vec::new(),
            draw_status: DrawStatus::Pending,
            created_at,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_date(&self) -> &str {
        &self.max_date
    }

    pub fn max_price(&self) -> &str {
        &self.max_price
    }

    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    pub fn draw_status(&self) -> DrawStatus {
        self.draw_status
    }

    /// Participants in join order.
    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn participant(&self, id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoomError {
    #[error("draw already completed")]
    DrawAlreadyCompleted,
    #[error("at least 2 participants required, room has {count}")]
    InsufficientParticipants { count: usize },
    #[error("no valid assignment found after {trials} shuffles")]
    DerangementRetryExhausted { trials: u32 },
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn normalize_hint(hint: Option<String>) -> Option<String> {
    hint.map(|h| h.trim().to_string()).filter(|h| !h.is_empty())
}

/// Opens a new pending room with a fresh id.
pub fn create_room(
    name: impl Into<String>,
    max_date: impl Into<String>,
    max_price: impl Into<String>,
) -> Room {
    Room::new(
        Uuid::new_v4().to_string(),
        name,
        max_date,
        max_price,
        now_millis(),
    )
}

/// Appends a new participant. Every call creates a new participant; callers
/// that want "join once" semantics must check their own identity first.
pub fn admit_participant(
    room: &mut Room,
    name: impl Into<String>,
    gift_hint: Option<String>,
) -> Result<Participant, RoomError> {
    if matches!(room.draw_status, DrawStatus::Completed) {
        return Err(RoomError::DrawAlreadyCompleted);
    }

    let participant = Participant {
        id: Uuid::new_v4().to_string(),
        name: name.into().trim().to_string(),
        gift_hint: normalize_hint(gift_hint),
        joined_at: now_millis(),
    };
    room.participants.push(participant.clone());
    Ok(participant)
}

pub fn can_draw(room: &Room) -> bool {
    matches!(room.draw_status, DrawStatus::Pending) && room.participants.len() >= 2
}

/// Draws the assignments and completes the room. This is one-shot: on any
/// error the room is left exactly as it was.
pub fn perform_draw<R: Rng + ?Sized>(room: &mut Room, rng: &mut R) -> Result<(), RoomError> {
    if matches!(room.draw_status, DrawStatus::Completed) {
        return Err(RoomError::DrawAlreadyCompleted);
    }

    let givers = room
        .participants
        .iter()
        .map(|p| p.id.clone())
        .collect::<Vec<_>>();
    if givers.len() < 2 {
        return Err(RoomError::InsufficientParticipants {
            count: givers.len(),
        });
    }

    room.matches = derange(&givers, rng)?;
    room.draw_status = DrawStatus::Completed;
    Ok(())
}
