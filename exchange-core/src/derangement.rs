use rand::seq::SliceRandom;
use rand::Rng;

use crate::{Assignment, ParticipantId, RoomError};

/// Shuffles allowed before a draw is abandoned. An unbiased source needs about
/// e attempts on average, so reaching this means the source is broken.
pub const MAX_DERANGEMENT_TRIALS: u32 = 10_000;

/// Pairs every giver with a receiver so that nobody draws themselves.
///
/// Receivers are reshuffled until no position keeps its own id, which makes
/// every derangement equally likely.
pub fn derange<R: Rng + ?Sized>(
    givers: &[ParticipantId],
    rng: &mut R,
) -> Result<Vec<Assignment>, RoomError> {
    derange_with_limit(givers, rng, MAX_DERANGEMENT_TRIALS)
}

pub fn derange_with_limit<R: Rng + ?Sized>(
    givers: &[ParticipantId],
    rng: &mut R,
    max_trials: u32,
) -> Result<Vec<Assignment>, RoomError> {
    if givers.len() < 2 {
        return Err(RoomError::InsufficientParticipants {
            count: givers.len(),
        });
    }

    let mut receivers = givers.to_vec();
    for _ in 0..max_trials {
        receivers.shuffle(rng);
        if givers.iter().zip(&receivers).all(|(g, r)| g != r) {
            return Ok(givers
                .iter()
                .zip(receivers)
                .map(|(giver, receiver)| Assignment {
                    giver_id: giver.clone(),
                    receiver_id: receiver,
                })
                .collect());
        }
    }

    Err(RoomError::DerangementRetryExhausted { trials: max_trials })
}
