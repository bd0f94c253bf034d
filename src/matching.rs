// SPDX-License-Identifier: MIT

//! Secret santa match generation.
//!
//! Produces a derangement over the ready, non-admin users: every
//! participant gives to exactly one other participant and receives from
//! exactly one, and nobody draws themselves. The function is pure; the
//! caller persists the updated collection and handles notification.

use crate::models::User;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

/// Attempts before giving up on producing a self-match-free pairing.
///
/// The wraparound pairing of a shuffled list of n >= 2 distinct users
/// cannot put a user next to itself, so for well-formed input the first
/// attempt always succeeds. The retry exists only to fail closed on
/// degenerate input (duplicate ids) instead of looping forever.
const MAX_ATTEMPTS: u32 = 16;

/// A single giver/receiver assignment.
///
/// Ephemeral: only the giver's `matchedWith` field is ever persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub giver_id: u64,
    pub receiver_id: u64,
}

/// Result of one matching round.
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    /// One match per participant
    pub matches: Vec<Match>,
    /// The full input collection with givers' `matchedWith` updated;
    /// non-participants are carried over verbatim
    pub updated_users: Vec<User>,
}

/// Errors from match generation.
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    #[error("need at least 2 participants")]
    InsufficientParticipants,

    #[error("no valid assignment after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },
}

/// Generate matches for every ready, non-admin user in `users`.
///
/// The input is not modified; on success the returned collection has the
/// same cardinality and ids, with `matchedWith` set on each giver.
pub fn generate_matches(users: &[User]) -> Result<MatchOutcome, MatchError> {
    generate_matches_with(users, &mut rand::thread_rng())
}

/// Like [`generate_matches`] but with an explicit RNG, so tests can run
/// against seeded randomness.
pub fn generate_matches_with<R: Rng>(
    users: &[User],
    rng: &mut R,
) -> Result<MatchOutcome, MatchError> {
    let participants: Vec<&User> = users.iter().filter(|u| u.is_participant()).collect();

    if participants.len() < 2 {
        return Err(MatchError::InsufficientParticipants);
    }

    for _ in 0..MAX_ATTEMPTS {
        let mut shuffled = participants.clone();
        shuffled.shuffle(rng);

        if let Some(matches) = pair_adjacent(&shuffled) {
            return Ok(MatchOutcome {
                updated_users: apply_matches(users, &matches),
                matches,
            });
        }
    }

    Err(MatchError::RetriesExhausted {
        attempts: MAX_ATTEMPTS,
    })
}

/// Pair each user with the next one in the shuffled order, wrapping around.
///
/// Returns None if any pairing would be a self-match, in which case the
/// whole round is discarded and reshuffled.
fn pair_adjacent(shuffled: &[&User]) -> Option<Vec<Match>> {
    let mut matches = Vec::with_capacity(shuffled.len());

    for (i, giver) in shuffled.iter().enumerate() {
        let receiver = shuffled[(i + 1) % shuffled.len()];

        if giver.id == receiver.id {
            return None;
        }

        matches.push(Match {
            giver_id: giver.id,
            receiver_id: receiver.id,
        });
    }

    Some(matches)
}

/// Build the updated collection: givers get their receiver's id, everyone
/// else keeps their record exactly as it was.
fn apply_matches(users: &[User], matches: &[Match]) -> Vec<User> {
    users
        .iter()
        .map(|user| {
            match matches.iter().find(|m| m.giver_id == user.id) {
                Some(m) => user.with_matched_with(Some(m.receiver_id)),
                None => user.clone(),
            }
        })
        .collect()
}
