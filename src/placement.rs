// Completion detection, placements, and tournament rating awards.
//
// Award rules match the tracker's observed behavior: a bye never earns round
// points, a bye's implicit opponent is never penalized, and the flat
// participation bonus goes only to roster members the other rules never
// touched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::bracket::Bracket;

/// Points earned by a match winner, by round. Deeper rounds clamp to the
/// last entry.
pub const ROUND_POINTS: [i32; 5] = [5, 10, 15, 20, 30];
/// Penalty for losing a played round-0 match (first-stage elimination).
pub const FIRST_ROUND_LOSS: i32 = -15;
pub const CHAMPION_BONUS: i32 = 50;
pub const RUNNER_UP_BONUS: i32 = 20;
pub const THIRD_PLACE_BONUS: i32 = 10;
/// Flat award for roster members no other rule applied to.
pub const PARTICIPATION_BONUS: i32 = 2;

pub fn round_points(round: usize) -> i32 {
    ROUND_POINTS[round.min(ROUND_POINTS.len() - 1)]
}

/// The standalone match for third place, sourced from the semifinal losers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThirdPlaceMatch {
    pub slot_a: String,
    pub slot_b: String,
    pub winner: Option<String>,
}

/// Final standings of a completed tournament.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placements {
    pub winner_name: String,
    pub second_name: Option<String>,
    pub third_name: Option<String>,
}

/// The two semifinal losers, once both semifinals are played out.
///
/// Requires at least three rounds and two decided, non-bye semifinals; a
/// semifinal resolved as a bye has no loser, so no third-place match exists.
pub fn third_place_candidates(bracket: &Bracket) -> Option<(String, String)> {
    if bracket.round_count() < 3 {
        return None;
    }
    let semifinals = &bracket.rounds[bracket.round_count() - 2];
    let mut losers = Vec::with_capacity(2);
    for m in semifinals {
        if m.is_bye || m.winner.is_none() {
            return None;
        }
        losers.push(m.loser()?);
    }
    if losers.len() != 2 {
        return None;
    }
    let second = losers.pop()?;
    let first = losers.pop()?;
    Some((first, second))
}

/// Snapshot of the third-place match. Slots are always derived from the
/// current semifinals; `selected` is surfaced as the winner only while it
/// still names one of the candidates, so a stale pick from an earlier
/// bracket state silently drops out.
pub fn third_place_match(bracket: &Bracket, selected: Option<&str>) -> Option<ThirdPlaceMatch> {
    let (slot_a, slot_b) = third_place_candidates(bracket)?;
    let winner = selected
        .filter(|w| *w == slot_a || *w == slot_b)
        .map(str::to_string);
    Some(ThirdPlaceMatch {
        slot_a,
        slot_b,
        winner,
    })
}

/// Decide whether the tournament is over and who placed.
///
/// Complete when the final round holds exactly one decided match and, for
/// brackets of three or more rounds, the third-place match has a winner
/// too. The one-shot "already finished" guard lives with the caller.
pub fn detect_completion(
    bracket: &Bracket,
    third_place: Option<&ThirdPlaceMatch>,
) -> Option<Placements> {
    let final_match = bracket.final_match()?;
    let winner_name = final_match.winner.clone()?;

    let third_name = if bracket.round_count() >= 3 {
        match third_place.and_then(|t| t.winner.clone()) {
            Some(third) => Some(third),
            None => return None,
        }
    } else {
        None
    };

    let second_name = if final_match.slot_a.as_deref() == Some(winner_name.as_str()) {
        final_match.slot_b.clone()
    } else {
        final_match.slot_a.clone()
    };

    Some(Placements {
        winner_name,
        second_name,
        third_name,
    })
}

/// Accumulate every rating delta the finished bracket implies.
///
/// Per participant: round points for each played win, the first-stage
/// penalty for a played round-0 loss, placement bonuses for the top three,
/// and the flat participation award for everyone the rules above never
/// mentioned.
pub fn rating_deltas(
    bracket: &Bracket,
    placements: &Placements,
    roster: &[String],
) -> BTreeMap<String, i32> {
    let mut deltas: BTreeMap<String, i32> = BTreeMap::new();

    for (round, matches) in bracket.rounds.iter().enumerate() {
        for m in matches {
            if m.is_bye {
                continue;
            }
            if let Some(winner) = &m.winner {
                *deltas.entry(winner.clone()).or_insert(0) += round_points(round);
            }
        }
    }

    if let Some(first_round) = bracket.rounds.first() {
        for m in first_round {
            if let Some(loser) = m.loser() {
                *deltas.entry(loser).or_insert(0) += FIRST_ROUND_LOSS;
            }
        }
    }

    *deltas
        .entry(placements.winner_name.clone())
        .or_insert(0) += CHAMPION_BONUS;
    if let Some(second) = &placements.second_name {
        *deltas.entry(second.clone()).or_insert(0) += RUNNER_UP_BONUS;
    }
    if let Some(third) = &placements.third_name {
        *deltas.entry(third.clone()).or_insert(0) += THIRD_PLACE_BONUS;
    }

    for name in roster {
        deltas.entry(name.clone()).or_insert(PARTICIPATION_BONUS);
    }

    deltas
}

/// How the prize pool is distributed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrizeMode {
    WinnerTakesAll,
    Top3Split,
}

/// Per-place prize amounts for a given pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrizeBreakdown {
    pub first: i64,
    pub second: i64,
    pub third: i64,
}

/// Split the pool by prize mode: everything to the winner, or 60 / 25 / 15
/// percent rounded to whole units.
pub fn prize_breakdown(mode: PrizeMode, pool: i64) -> PrizeBreakdown {
    match mode {
        PrizeMode::WinnerTakesAll => PrizeBreakdown {
            first: pool,
            second: 0,
            third: 0,
        },
        PrizeMode::Top3Split => PrizeBreakdown {
            first: (pool as f64 * 0.60).round() as i64,
            second: (pool as f64 * 0.25).round() as i64,
            third: (pool as f64 * 0.15).round() as i64,
        },
    }
}
