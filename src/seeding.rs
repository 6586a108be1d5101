// Seeded bracket construction.
//
// Seeds are assigned by rating (descending, roster order breaking ties) and
// arranged with a recursive two-ended fold so the top two seeds land in
// opposite halves of the tree at every level: they cannot meet before the
// final. For power-of-two fields this yields the classic 1-8 / 4-5 / 2-7 /
// 3-6 ordering.

use std::collections::HashMap;

use crate::bracket::{feeds_into, Bracket, BracketMatch};

/// Number of rounds needed for a single-elimination field of `n`:
/// ceil(log2(n)), 0 for fewer than two participants.
pub fn total_rounds(n: usize) -> usize {
    if n <= 1 {
        return 0;
    }
    let mut rounds = 0;
    let mut capacity = 1;
    while capacity < n {
        capacity *= 2;
        rounds += 1;
    }
    rounds
}

/// Order the roster by rating descending. The sort is stable, so equal
/// ratings keep their roster order.
pub fn seed_order(roster: &[String], ratings: &HashMap<String, i32>) -> Vec<String> {
    let mut seeded = roster.to_vec();
    seeded.sort_by(|a, b| {
        let ra = ratings.get(a).copied().unwrap_or(0);
        let rb = ratings.get(b).copied().unwrap_or(0);
        rb.cmp(&ra)
    });
    seeded
}

// Fold the seed list into round-0 slot order. The low half of the tree is
// always a full power of two; seeds alternate into the halves in the pattern
// A B B A A B B A..., spilling into whichever half still has room, then each
// half is arranged recursively.
fn arrange(seeds: &[String]) -> Vec<String> {
    let n = seeds.len();
    if n <= 2 {
        return seeds.to_vec();
    }
    let low_capacity = 1usize << (total_rounds(n) - 1);
    let high_capacity = n - low_capacity;

    let mut low = Vec::with_capacity(low_capacity);
    let mut high = Vec::with_capacity(high_capacity);
    for (i, seed) in seeds.iter().enumerate() {
        let prefers_low = ((i + 1) / 2) % 2 == 0;
        if (prefers_low && low.len() < low_capacity) || high.len() >= high_capacity {
            low.push(seed.clone());
        } else {
            high.push(seed.clone());
        }
    }

    let mut order = arrange(&low);
    order.extend(arrange(&high));
    order
}

/// Build a fresh bracket skeleton from the roster.
///
/// Consecutive pairs of the arranged seed order become round-0 matches; an
/// odd field leaves the last arranged seed in a bye with its winner pre-set.
/// Later rounds are scaffolded empty (ceil(previous / 2) matches each) and
/// round-0 bye winners are advanced into round 1 right away.
///
/// Pure and deterministic: identical input always yields an identical
/// skeleton, which reconciliation after roster changes relies on. Returns
/// `None` for fewer than two participants.
pub fn build_bracket(roster: &[String], ratings: &HashMap<String, i32>) -> Option<Bracket> {
    if roster.len() < 2 {
        return None;
    }

    let order = arrange(&seed_order(roster, ratings));

    let mut first_round = Vec::with_capacity((order.len() + 1) / 2);
    let mut i = 0;
    while i < order.len() {
        if i + 1 < order.len() {
            first_round.push(BracketMatch::pair(order[i].clone(), order[i + 1].clone()));
        } else {
            first_round.push(BracketMatch::bye(order[i].clone()));
        }
        i += 2;
    }

    let mut rounds = vec![first_round];
    let mut previous = rounds[0].len();
    while previous > 1 {
        let next = (previous + 1) / 2;
        rounds.push(vec![BracketMatch::empty(); next]);
        previous = next;
    }

    let mut bracket = Bracket { rounds };
    for index in 0..bracket.rounds[0].len() {
        let advanced = {
            let m = &bracket.rounds[0][index];
            if m.is_bye {
                m.winner.clone()
            } else {
                None
            }
        };
        if let Some(winner) = advanced {
            let (round, next_index, side) = feeds_into(0, index);
            if let Some(next) = bracket.get_mut(round, next_index) {
                *next.slot_mut(side) = Some(winner);
            }
        }
    }

    Some(bracket)
}
