use serde::{Deserialize, Serialize};

use crate::{DrawStatus, Room, RoomId};

/// Aggregate room state that any visitor may see.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomSummary {
    pub id: RoomId,
    pub name: String,
    pub max_date: String,
    pub max_price: String,
    pub participant_count: usize,
    pub draw_status: DrawStatus,
    pub created_at: u64,
}

impl From<&Room> for RoomSummary {
    fn from(room: &Room) -> Self {
        Self {
            id: room.id.clone(),
            name: room.name.clone(),
            max_date: room.max_date.clone(),
            max_price: room.max_price.clone(),
            participant_count: room.participants.len(),
            draw_status: room.draw_status,
            created_at: room.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParticipantListing {
    pub name: String,
    pub gift_hint: Option<String>,
}

/// The recipient a viewer has to buy for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolvedMatch {
    pub recipient_name: String,
    pub recipient_gift_hint: Option<String>,
}

pub fn participant_listing(room: &Room) -> Vec<ParticipantListing> {
    room.participants
        .iter()
        .map(|p| ParticipantListing {
            name: p.name.clone(),
            gift_hint: p.gift_hint.clone(),
        })
        .collect()
}

/// Looks up the viewer's own recipient. Nothing is returned before the draw,
/// for strangers, or when the viewer has no assignment.
pub fn resolve_match(room: &Room, viewer: &str) -> Option<ResolvedMatch> {
    if !matches!(room.draw_status, DrawStatus::Completed) {
        return None;
    }
    room.participant(viewer)?;

    let assignment = room.matches.iter().find(|a| a.giver_id == viewer)?;
    let recipient = room.participant(&assignment.receiver_id)?;
    Some(ResolvedMatch {
        recipient_name: recipient.name.clone(),
        recipient_gift_hint: recipient.gift_hint.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{admit_participant, perform_draw, Assignment, Participant};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn participant(id: &str, name: &str, hint: Option<&str>) -> Participant {
        Participant {
            id: id.to_string(),
            name: name.to_string(),
            gift_hint: hint.map(str::to_string),
            joined_at: 0,
        }
    }

    fn abc_room() -> Room {
        let mut room = Room::new("r1", "Book club", "2024-12-01", "20", 0);
        room.participants = vec![
            participant("1", "A", Some("tea")),
            participant("2", "B", None),
            participant("3", "C", Some("socks")),
        ];
        room
    }

    #[test]
    fn nothing_resolves_before_draw() {
        let room = abc_room();
        for id in ["1", "2", "3"] {
            assert_eq!(resolve_match(&room, id), None);
        }
    }

    #[test]
    fn viewer_sees_only_their_own_recipient() {
        let mut room = abc_room();
        perform_draw(&mut room, &mut ChaCha8Rng::seed_from_u64(21)).unwrap();

        let given_to = room
            .matches
            .iter()
            .find(|a| a.giver_id == "1")
            .map(|a| a.receiver_id.clone())
            .unwrap();
        let expected = room.participant(&given_to).unwrap();

        let resolved = resolve_match(&room, "1").unwrap();
        assert_eq!(resolved.recipient_name, expected.name);
        assert_eq!(resolved.recipient_gift_hint, expected.gift_hint);
        assert_ne!(resolved.recipient_name, "A");
    }

    #[test]
    fn every_participant_resolves_to_a_distinct_recipient() {
        let mut room = abc_room();
        perform_draw(&mut room, &mut ChaCha8Rng::seed_from_u64(8)).unwrap();

        let mut names = ["1", "2", "3"]
            .iter()
            .map(|id| resolve_match(&room, id).unwrap().recipient_name)
            .collect::<Vec<_>>();
        names.sort();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[test]
    fn strangers_resolve_nothing() {
        let mut room = abc_room();
        perform_draw(&mut room, &mut ChaCha8Rng::seed_from_u64(2)).unwrap();
        assert_eq!(resolve_match(&room, "4"), None);
        assert_eq!(resolve_match(&room, ""), None);
        assert_eq!(resolve_match(&room, "r1"), None);
    }

    #[test]
    fn participant_without_assignment_resolves_nothing() {
        let mut room = abc_room();
        room.draw_status = DrawStatus::Completed;
        room.matches = vec![
            Assignment {
                giver_id: "2".into(),
                receiver_id: "3".into(),
            },
            Assignment {
                giver_id: "3".into(),
                receiver_id: "2".into(),
            },
        ];
        assert_eq!(resolve_match(&room, "1"), None);
        assert_eq!(resolve_match(&room, "2").unwrap().recipient_name, "C");
    }

    #[test]
    fn summary_and_listing_carry_no_assignment_data() {
        let mut room = Room::new("r9", "Team", "Friday", "15", 99);
        admit_participant(&mut room, "alice", Some("plants".into())).unwrap();
        admit_participant(&mut room, "bob", None).unwrap();
        perform_draw(&mut room, &mut ChaCha8Rng::seed_from_u64(1)).unwrap();

        let summary = RoomSummary::from(&room);
        assert_eq!(summary.participant_count, 2);
        assert_eq!(summary.draw_status, DrawStatus::Completed);
        assert_eq!(summary.created_at, 99);

        let listing = participant_listing(&room);
        assert_eq!(
            listing,
            vec![
                ParticipantListing {
                    name: "alice".into(),
                    gift_hint: Some("plants".into()),
                },
                ParticipantListing {
                    name: "bob".into(),
                    gift_hint: None,
                },
            ]
        );

        let rendered = serde_json::to_string(&(summary, listing)).unwrap();
        for p in room.participants() {
            assert!(!rendered.contains(&p.id));
        }
    }
}
