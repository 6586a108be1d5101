// Per-match rating history reconstruction.
//
// The tracker stores only each player's current rating plus, per match, the
// delta that was applied to each side when it was recorded. Walking the
// match log newest-to-oldest and undoing deltas recovers the rating every
// participant held immediately after any match. The order is load-bearing:
// capture the working rating first, then undo, for every match.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One side of a recorded match: a player, an optional doubles partner, and
/// the rating delta applied to everyone on this side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSide {
    pub player: String,
    pub partner: Option<String>,
    pub delta: i32,
}

impl MatchSide {
    pub fn singles(player: impl Into<String>, delta: i32) -> Self {
        Self {
            player: player.into(),
            partner: None,
            delta,
        }
    }

    pub fn doubles(player: impl Into<String>, partner: impl Into<String>, delta: i32) -> Self {
        Self {
            player: player.into(),
            partner: Some(partner.into()),
            delta,
        }
    }

    fn players(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.player.as_str()).chain(self.partner.as_deref())
    }
}

/// A recorded match. Ids are assigned in play order, so ascending id is
/// chronological.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    pub id: i64,
    pub side_a: MatchSide,
    pub side_b: MatchSide,
    pub winner: String,
    pub played_at: DateTime<Utc>,
}

/// For every match, the rating each of its participants held immediately
/// after it, keyed by match id.
///
/// Starts from the current ratings and processes matches strictly
/// newest-to-oldest: the working rating is recorded as the post-match
/// snapshot, then the match's deltas are subtracted, producing the state as
/// of just before that match, which is exactly the post-match state of the
/// next older one. Players missing from `current` are skipped, not invented.
pub fn rating_history(
    current: &HashMap<String, i32>,
    matches: &[MatchRecord],
) -> BTreeMap<i64, BTreeMap<String, i32>> {
    let mut working = current.clone();
    let mut ordered: Vec<&MatchRecord> = matches.iter().collect();
    ordered.sort_by_key(|m| m.id);

    let mut history = BTreeMap::new();
    for m in ordered.iter().rev() {
        let mut snapshot = BTreeMap::new();
        for side in [&m.side_a, &m.side_b] {
            for player in side.players() {
                if let Some(rating) = working.get(player) {
                    snapshot.insert(player.to_string(), *rating);
                }
            }
        }
        for side in [&m.side_a, &m.side_b] {
            for player in side.players() {
                if let Some(rating) = working.get_mut(player) {
                    *rating -= side.delta;
                }
            }
        }
        history.insert(m.id, snapshot);
    }
    history
}
