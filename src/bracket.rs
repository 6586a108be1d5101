// Bracket data model: rounds of matches addressed by (round, index).
//
// The bracket is an arena (a Vec of rounds, each a Vec of matches) instead of
// a pointer-linked tree. Downstream lookups are index arithmetic, and the
// whole structure serializes as-is.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Which side of a match a participant occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    A,
    B,
}

/// A single match: two slots, an optional winner, and a bye flag.
///
/// Invariants: a bye has exactly one occupied slot and `winner` equal to that
/// occupant; a match with both slots occupied is never a bye; a winner on a
/// played match is one of its two occupants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BracketMatch {
    pub slot_a: Option<String>,
    pub slot_b: Option<String>,
    pub winner: Option<String>,
    pub is_bye: bool,
}

impl BracketMatch {
    /// A match with neither slot filled yet.
    pub fn empty() -> Self {
        Self {
            slot_a: None,
            slot_b: None,
            winner: None,
            is_bye: false,
        }
    }

    /// A real match between two participants, not yet played.
    pub fn pair(a: impl Into<String>, b: impl Into<String>) -> Self {
        Self {
            slot_a: Some(a.into()),
            slot_b: Some(b.into()),
            winner: None,
            is_bye: false,
        }
    }

    /// A bye: one occupant who advances without playing.
    pub fn bye(a: impl Into<String>) -> Self {
        let name = a.into();
        Self {
            slot_a: Some(name.clone()),
            slot_b: None,
            winner: Some(name),
            is_bye: true,
        }
    }

    pub fn slot(&self, side: Side) -> Option<&str> {
        match side {
            Side::A => self.slot_a.as_deref(),
            Side::B => self.slot_b.as_deref(),
        }
    }

    pub fn slot_mut(&mut self, side: Side) -> &mut Option<String> {
        match side {
            Side::A => &mut self.slot_a,
            Side::B => &mut self.slot_b,
        }
    }

    pub fn occupant_count(&self) -> usize {
        self.slot_a.iter().count() + self.slot_b.iter().count()
    }

    /// The single occupant of a half-filled match, if there is exactly one.
    pub fn sole_occupant(&self) -> Option<&str> {
        match (self.slot_a.as_deref(), self.slot_b.as_deref()) {
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            _ => None,
        }
    }

    /// The occupant who lost a played (non-bye) match with a recorded winner.
    pub fn loser(&self) -> Option<String> {
        if self.is_bye {
            return None;
        }
        let winner = self.winner.as_deref()?;
        match (self.slot_a.as_deref(), self.slot_b.as_deref()) {
            (Some(a), Some(b)) if a == winner => Some(b.to_string()),
            (Some(a), Some(b)) if b == winner => Some(a.to_string()),
            _ => None,
        }
    }
}

/// The slot fed by the winner of match `index` in round `round`:
/// `(round + 1, index / 2)`, side A for even indices, side B for odd.
pub fn feeds_into(round: usize, index: usize) -> (usize, usize, Side) {
    let side = if index % 2 == 0 { Side::A } else { Side::B };
    (round + 1, index / 2, side)
}

/// Index of the match `depth` rounds downstream whose subtree contains
/// match `index`.
pub fn downstream_index(index: usize, depth: u32) -> usize {
    index >> depth
}

/// An ordered sequence of rounds. Round 0 is seeded from the roster; each
/// following round has ceil(previous / 2) matches, down to a single final.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bracket {
    pub rounds: Vec<Vec<BracketMatch>>,
}

impl Bracket {
    pub fn round_count(&self) -> usize {
        self.rounds.len()
    }

    pub fn get(&self, round: usize, index: usize) -> Option<&BracketMatch> {
        self.rounds.get(round)?.get(index)
    }

    pub fn get_mut(&mut self, round: usize, index: usize) -> Option<&mut BracketMatch> {
        self.rounds.get_mut(round)?.get_mut(index)
    }

    /// The single match of the last round.
    pub fn final_match(&self) -> Option<&BracketMatch> {
        let last = self.rounds.last()?;
        if last.len() == 1 {
            last.first()
        } else {
            None
        }
    }

    /// Every participant currently occupying any slot in any round.
    pub fn occupied_names(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        for round in &self.rounds {
            for m in round {
                if let Some(a) = &m.slot_a {
                    names.insert(a.clone());
                }
                if let Some(b) = &m.slot_b {
                    names.insert(b.clone());
                }
            }
        }
        names
    }

    /// Participants seated in round 0 (the editable round).
    pub fn round0_names(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        if let Some(first) = self.rounds.first() {
            for m in first {
                if let Some(a) = &m.slot_a {
                    names.insert(a.clone());
                }
                if let Some(b) = &m.slot_b {
                    names.insert(b.clone());
                }
            }
        }
        names
    }

    /// Normalize bye flags from current occupancy, over every round.
    ///
    /// A match with exactly one occupant and no winner becomes a bye with the
    /// occupant as winner; a match with both slots occupied is never a bye.
    /// Running this twice in a row changes nothing.
    pub fn resolve_byes(&mut self) {
        for round in self.rounds.iter_mut() {
            for m in round.iter_mut() {
                match (m.slot_a.is_some(), m.slot_b.is_some()) {
                    (true, true) => m.is_bye = false,
                    (true, false) | (false, true) => {
                        if m.winner.is_none() {
                            m.winner = m.slot_a.clone().or_else(|| m.slot_b.clone());
                            m.is_bye = true;
                        }
                    }
                    (false, false) => {}
                }
            }
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
