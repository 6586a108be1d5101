// Interactive bracket edits with cascading invalidation.
//
// Every operation here is a pure function over a bracket the caller owns
// (typically a deep copy that is swapped in only on success, so a rejected
// edit leaves no partial state behind). Changing a match at round r leaves
// no stale winner or propagation-derived slot at any later round whose
// subtree contains that match.

use thiserror::Error;

use crate::bracket::{downstream_index, feeds_into, Bracket, Side};

/// Rejection reasons for bracket operations. A rejected operation changes
/// nothing.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no bracket has been built")]
    NoBracket,
    #[error("tournament is already finished")]
    Finished,
    #[error("round {0} is out of range")]
    RoundOutOfRange(usize),
    #[error("match {index} in round {round} is out of range")]
    MatchOutOfRange { round: usize, index: usize },
    #[error("both slots must be occupied before a winner can be set")]
    MatchNotReady,
    #[error("the source slot is empty")]
    SlotEmpty,
    #[error("{0} is not an occupant of this match")]
    WinnerNotInMatch(String),
    #[error("{0} is not part of this tournament")]
    UnknownParticipant(String),
    #[error("bracket serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn check_round0(bracket: &Bracket, index: usize) -> Result<(), EngineError> {
    let first = bracket.rounds.first().ok_or(EngineError::NoBracket)?;
    if index >= first.len() {
        return Err(EngineError::MatchOutOfRange { round: 0, index });
    }
    Ok(())
}

fn check_match(bracket: &Bracket, round: usize, index: usize) -> Result<(), EngineError> {
    if round >= bracket.rounds.len() {
        return Err(EngineError::RoundOutOfRange(round));
    }
    if index >= bracket.rounds[round].len() {
        return Err(EngineError::MatchOutOfRange { round, index });
    }
    Ok(())
}

// Invalidate everything downstream of match (round, index): the slot it
// feeds in the next round, and every deeper match on its path. Slots at
// round + 2 and beyond exist only through propagation, so they are nulled
// outright, not just their winners.
fn cascade_clear(bracket: &mut Bracket, round: usize, index: usize) {
    let (next_round, next_index, side) = feeds_into(round, index);
    if next_round >= bracket.rounds.len() {
        return;
    }
    if let Some(next) = bracket.get_mut(next_round, next_index) {
        *next.slot_mut(side) = None;
        next.winner = None;
        next.is_bye = false;
    }
    for deeper in (round + 2)..bracket.rounds.len() {
        let target = downstream_index(index, (deeper - round) as u32);
        if let Some(m) = bracket.get_mut(deeper, target) {
            m.slot_a = None;
            m.slot_b = None;
            m.winner = None;
            m.is_bye = false;
        }
    }
}

/// Record the winner of a played match and advance them into the derived
/// slot of the next round. Any previously recorded result downstream of this
/// match is invalidated first.
pub fn set_winner(
    bracket: &mut Bracket,
    round: usize,
    index: usize,
    name: &str,
) -> Result<(), EngineError> {
    check_match(bracket, round, index)?;
    {
        let m = &bracket.rounds[round][index];
        if m.slot_a.is_none() || m.slot_b.is_none() || m.is_bye {
            return Err(EngineError::MatchNotReady);
        }
        if m.slot_a.as_deref() != Some(name) && m.slot_b.as_deref() != Some(name) {
            return Err(EngineError::WinnerNotInMatch(name.to_string()));
        }
    }

    cascade_clear(bracket, round, index);

    let m = &mut bracket.rounds[round][index];
    m.winner = Some(name.to_string());
    m.is_bye = false;

    let (next_round, next_index, side) = feeds_into(round, index);
    if let Some(next) = bracket.get_mut(next_round, next_index) {
        *next.slot_mut(side) = Some(name.to_string());
        next.winner = None;
        next.is_bye = false;
    }
    Ok(())
}

/// Undo a recorded result: the inverse of [`set_winner`], with the identical
/// downstream cascade.
pub fn clear_winner(bracket: &mut Bracket, round: usize, index: usize) -> Result<(), EngineError> {
    check_match(bracket, round, index)?;
    {
        let m = &mut bracket.rounds[round][index];
        m.winner = None;
        m.is_bye = false;
    }
    cascade_clear(bracket, round, index);
    Ok(())
}

/// Seat `name` in a round-0 slot (or empty it with `None`).
///
/// A participant occupies at most one round-0 slot: seating them here
/// vacates any slot they held before, and whoever previously sat in the
/// target slot returns to the unplaced pool. Both touched matches lose their
/// winner and bye state, downstream results are invalidated, and bye flags
/// are re-derived over the whole bracket.
pub fn assign_slot(
    bracket: &mut Bracket,
    roster: &[String],
    index: usize,
    side: Side,
    name: Option<&str>,
) -> Result<(), EngineError> {
    check_round0(bracket, index)?;
    if let Some(name) = name {
        if !roster.iter().any(|n| n == name) {
            return Err(EngineError::UnknownParticipant(name.to_string()));
        }
        // vacate any other round-0 slot this participant holds
        let vacated: Vec<(usize, Side)> = bracket.rounds[0]
            .iter()
            .enumerate()
            .flat_map(|(i, m)| {
                [Side::A, Side::B].into_iter().filter_map(move |s| {
                    (m.slot(s) == Some(name) && !(i == index && s == side)).then_some((i, s))
                })
            })
            .collect();
        for (i, s) in vacated {
            let m = &mut bracket.rounds[0][i];
            *m.slot_mut(s) = None;
            m.winner = None;
            m.is_bye = false;
            cascade_clear(bracket, 0, i);
        }
    }

    {
        let m = &mut bracket.rounds[0][index];
        *m.slot_mut(side) = name.map(str::to_string);
        m.winner = None;
        m.is_bye = false;
    }
    cascade_clear(bracket, 0, index);
    bracket.resolve_byes();
    Ok(())
}

/// Move a seated participant from one round-0 slot to another. The previous
/// occupant of the destination, if any, is displaced into the vacated source
/// slot.
pub fn move_slot(
    bracket: &mut Bracket,
    from_index: usize,
    from_side: Side,
    to_index: usize,
    to_side: Side,
) -> Result<(), EngineError> {
    check_round0(bracket, from_index)?;
    check_round0(bracket, to_index)?;
    if from_index == to_index && from_side == to_side {
        return Ok(());
    }
    let name = bracket.rounds[0][from_index]
        .slot(from_side)
        .ok_or(EngineError::SlotEmpty)?
        .to_string();
    let displaced = bracket.rounds[0][to_index]
        .slot(to_side)
        .map(str::to_string);

    {
        let m = &mut bracket.rounds[0][to_index];
        *m.slot_mut(to_side) = Some(name);
        m.winner = None;
        m.is_bye = false;
    }
    cascade_clear(bracket, 0, to_index);

    {
        let m = &mut bracket.rounds[0][from_index];
        *m.slot_mut(from_side) = displaced;
        m.winner = None;
        m.is_bye = false;
    }
    cascade_clear(bracket, 0, from_index);

    bracket.resolve_byes();
    Ok(())
}

/// Empty a round-0 slot, clearing the match's result and everything derived
/// from it.
pub fn clear_slot(bracket: &mut Bracket, index: usize, side: Side) -> Result<(), EngineError> {
    check_round0(bracket, index)?;
    {
        let m = &mut bracket.rounds[0][index];
        *m.slot_mut(side) = None;
        m.winner = None;
        m.is_bye = false;
    }
    cascade_clear(bracket, 0, index);
    Ok(())
}

/// Reconcile recorded results into a freshly built skeleton after a roster
/// change.
///
/// A round-0 result survives when some round-0 match of the old bracket has
/// the identical `(slot_a, slot_b)` pairing (identity, not position), so an
/// external roster refresh that reorders matches does not discard unrelated
/// decisions. Everything else, including every downstream round, stays as
/// the builder produced it (only fresh bye winners are advanced).
pub fn merge(old: &Bracket, mut fresh: Bracket) -> Bracket {
    let Some(old_first) = old.rounds.first() else {
        return fresh;
    };
    let Some(fresh_first) = fresh.rounds.first_mut() else {
        return fresh;
    };
    for m in fresh_first.iter_mut() {
        if m.winner.is_some() {
            continue; // builder pre-decides byes
        }
        let previous = old_first
            .iter()
            .find(|o| o.slot_a == m.slot_a && o.slot_b == m.slot_b);
        if let Some(previous) = previous {
            if previous.winner.is_some() {
                m.winner = previous.winner.clone();
                m.is_bye = previous.is_bye;
            }
        }
    }
    fresh
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::BracketMatch;
    use crate::seeding::build_bracket;
    use std::collections::HashMap;

    fn ratings_for(roster: &[String]) -> HashMap<String, i32> {
        roster
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), 2000 - i as i32))
            .collect()
    }

    fn sample_bracket(n: usize) -> (Bracket, Vec<String>) {
        let roster: Vec<String> = (1..=n).map(|i| format!("p{i:02}")).collect();
        let bracket = build_bracket(&roster, &ratings_for(&roster)).unwrap();
        (bracket, roster)
    }

    #[test]
    fn test_set_winner_advances_into_next_round() {
        let (mut bracket, _) = sample_bracket(4);
        set_winner(&mut bracket, 0, 0, "p01").unwrap();
        assert_eq!(bracket.rounds[0][0].winner.as_deref(), Some("p01"));
        assert_eq!(bracket.rounds[1][0].slot_a.as_deref(), Some("p01"));
        assert_eq!(bracket.rounds[1][0].slot_b, None);
    }

    #[test]
    fn test_set_winner_rejects_outsider() {
        let (mut bracket, _) = sample_bracket(4);
        let before = bracket.clone();
        let err = set_winner(&mut bracket, 0, 0, "p02").unwrap_err();
        assert!(matches!(err, EngineError::WinnerNotInMatch(_)));
        assert_eq!(bracket, before, "rejected edit must not change state");
    }

    #[test]
    fn test_set_winner_rejects_half_filled_match() {
        let (mut bracket, _) = sample_bracket(4);
        set_winner(&mut bracket, 0, 0, "p01").unwrap();
        // round-1 match has only one occupant so far
        let err = set_winner(&mut bracket, 1, 0, "p01").unwrap_err();
        assert!(matches!(err, EngineError::MatchNotReady));
    }

    #[test]
    fn test_set_winner_rejects_bye() {
        let (mut bracket, _) = sample_bracket(3);
        let bye_index = bracket.rounds[0].iter().position(|m| m.is_bye).unwrap();
        let occupant = bracket.rounds[0][bye_index].sole_occupant().unwrap().to_string();
        let err = set_winner(&mut bracket, 0, bye_index, &occupant).unwrap_err();
        assert!(matches!(err, EngineError::MatchNotReady));
    }

    #[test]
    fn test_set_winner_out_of_range() {
        let (mut bracket, _) = sample_bracket(4);
        assert!(matches!(
            set_winner(&mut bracket, 5, 0, "p01").unwrap_err(),
            EngineError::RoundOutOfRange(5)
        ));
        assert!(matches!(
            set_winner(&mut bracket, 0, 9, "p01").unwrap_err(),
            EngineError::MatchOutOfRange { round: 0, index: 9 }
        ));
    }

    #[test]
    fn test_changing_winner_invalidates_downstream() {
        let (mut bracket, _) = sample_bracket(8);
        set_winner(&mut bracket, 0, 0, "p01").unwrap();
        set_winner(&mut bracket, 0, 1, "p04").unwrap();
        set_winner(&mut bracket, 1, 0, "p01").unwrap();
        assert_eq!(bracket.rounds[2][0].slot_a.as_deref(), Some("p01"));

        // re-deciding the first match unwinds the semifinal and the final slot
        set_winner(&mut bracket, 0, 0, "p08").unwrap();
        assert_eq!(bracket.rounds[1][0].slot_a.as_deref(), Some("p08"));
        assert_eq!(bracket.rounds[1][0].slot_b.as_deref(), Some("p04"));
        assert_eq!(bracket.rounds[1][0].winner, None);
        assert_eq!(bracket.rounds[2][0].slot_a, None);
        assert_eq!(bracket.rounds[2][0].winner, None);
    }

    #[test]
    fn test_set_then_clear_restores_empty_downstream() {
        let (mut bracket, _) = sample_bracket(8);
        let pristine = bracket.clone();
        set_winner(&mut bracket, 0, 2, "p02").unwrap();
        clear_winner(&mut bracket, 0, 2).unwrap();
        assert_eq!(bracket, pristine, "set followed by clear must round-trip");
    }

    #[test]
    fn test_cascade_spares_sibling_subtree() {
        let (mut bracket, _) = sample_bracket(8);
        set_winner(&mut bracket, 0, 2, "p02").unwrap();
        set_winner(&mut bracket, 0, 3, "p03").unwrap();
        set_winner(&mut bracket, 0, 0, "p01").unwrap();
        clear_winner(&mut bracket, 0, 0).unwrap();

        // the other half of the tree keeps its results
        assert_eq!(bracket.rounds[1][1].slot_a.as_deref(), Some("p02"));
        assert_eq!(bracket.rounds[1][1].slot_b.as_deref(), Some("p03"));
        assert_eq!(bracket.rounds[1][0].slot_a, None);
    }

    #[test]
    fn test_deep_cascade_clears_propagated_slots() {
        let (mut bracket, _) = sample_bracket(8);
        set_winner(&mut bracket, 0, 0, "p01").unwrap();
        set_winner(&mut bracket, 0, 1, "p04").unwrap();
        set_winner(&mut bracket, 1, 0, "p01").unwrap();
        set_winner(&mut bracket, 0, 2, "p02").unwrap();
        set_winner(&mut bracket, 0, 3, "p03").unwrap();
        set_winner(&mut bracket, 1, 1, "p02").unwrap();
        set_winner(&mut bracket, 2, 0, "p01").unwrap();

        clear_winner(&mut bracket, 0, 0).unwrap();
        for round in 1..bracket.round_count() {
            let target = downstream_index(0, round as u32);
            let m = &bracket.rounds[round][target];
            assert_eq!(m.winner, None, "stale winner at round {round}");
            if round >= 2 {
                assert_eq!(m.slot_a, None, "stale slot at round {round}");
                assert_eq!(m.slot_b, None, "stale slot at round {round}");
            }
        }
    }

    #[test]
    fn test_assign_slot_vacates_previous_seat() {
        let (mut bracket, roster) = sample_bracket(4);
        // p01 sits in match 0 side A; seat them into match 1 side B instead
        assign_slot(&mut bracket, &roster, 1, Side::B, Some("p01")).unwrap();
        assert_eq!(bracket.rounds[0][0].slot_a, None);
        assert_eq!(bracket.rounds[0][1].slot_b.as_deref(), Some("p01"));
        // the displaced occupant of match 1 side B is simply unseated
        let seated = bracket.round0_names();
        assert!(!seated.contains("p03"));
    }

    #[test]
    fn test_assign_slot_rejects_unknown_name() {
        let (mut bracket, roster) = sample_bracket(4);
        let before = bracket.clone();
        let err = assign_slot(&mut bracket, &roster, 0, Side::A, Some("nobody")).unwrap_err();
        assert!(matches!(err, EngineError::UnknownParticipant(_)));
        assert_eq!(bracket, before);
    }

    #[test]
    fn test_assign_slot_resets_result_and_rederives_byes() {
        let (mut bracket, roster) = sample_bracket(4);
        set_winner(&mut bracket, 0, 0, "p01").unwrap();
        // unseating the loser leaves p01 alone: the match becomes a bye
        assign_slot(&mut bracket, &roster, 0, Side::B, None).unwrap();
        let m = &bracket.rounds[0][0];
        assert!(m.is_bye);
        assert_eq!(m.winner.as_deref(), Some("p01"));
        // the old win no longer shows in round 1
        assert_eq!(bracket.rounds[1][0].slot_a, None);
    }

    #[test]
    fn test_move_slot_swaps_occupants() {
        let (mut bracket, _) = sample_bracket(4);
        // move p01 (0/A) onto p02 (1/A): p02 is displaced into 0/A
        move_slot(&mut bracket, 0, Side::A, 1, Side::A).unwrap();
        assert_eq!(bracket.rounds[0][1].slot_a.as_deref(), Some("p01"));
        assert_eq!(bracket.rounds[0][0].slot_a.as_deref(), Some("p02"));
    }

    #[test]
    fn test_move_slot_into_empty_leaves_source_empty() {
        let (mut bracket, roster) = sample_bracket(4);
        assign_slot(&mut bracket, &roster, 1, Side::B, None).unwrap();
        move_slot(&mut bracket, 0, Side::A, 1, Side::B).unwrap();
        assert_eq!(bracket.rounds[0][0].slot_a, None);
        assert_eq!(bracket.rounds[0][1].slot_b.as_deref(), Some("p01"));
        // lone remaining occupant of match 0 is auto-advanced as a bye
        assert!(bracket.rounds[0][0].is_bye);
    }

    #[test]
    fn test_move_slot_from_empty_is_rejected() {
        let (mut bracket, roster) = sample_bracket(4);
        assign_slot(&mut bracket, &roster, 0, Side::A, None).unwrap();
        let err = move_slot(&mut bracket, 0, Side::A, 1, Side::A).unwrap_err();
        assert!(matches!(err, EngineError::SlotEmpty));
    }

    #[test]
    fn test_move_slot_onto_itself_is_noop() {
        let (mut bracket, _) = sample_bracket(4);
        let before = bracket.clone();
        move_slot(&mut bracket, 0, Side::A, 0, Side::A).unwrap();
        assert_eq!(bracket, before);
    }

    #[test]
    fn test_clear_slot_keeps_remaining_occupant_unresolved() {
        let (mut bracket, _) = sample_bracket(4);
        set_winner(&mut bracket, 0, 0, "p01").unwrap();
        clear_slot(&mut bracket, 0, Side::A).unwrap();
        let m = &bracket.rounds[0][0];
        assert_eq!(m.slot_a, None);
        assert_eq!(m.winner, None);
        assert!(!m.is_bye, "clear_slot does not re-derive byes");
        assert_eq!(bracket.rounds[1][0].slot_a, None);
    }

    #[test]
    fn test_merge_keeps_winner_for_unchanged_pairing() {
        let roster4: Vec<String> = (1..=4).map(|i| format!("p{i:02}")).collect();
        let mut old = build_bracket(&roster4, &ratings_for(&roster4)).unwrap();
        set_winner(&mut old, 0, 0, "p01").unwrap();
        set_winner(&mut old, 0, 1, "p02").unwrap();
        set_winner(&mut old, 1, 0, "p01").unwrap();

        // a new top seed reshuffles everything except the (p02, p03) pairing
        let mut roster5 = roster4.clone();
        roster5.push("p00".to_string());
        let mut ratings = ratings_for(&roster4);
        ratings.insert("p00".to_string(), 2100);
        let fresh = build_bracket(&roster5, &ratings).unwrap();
        let merged = merge(&old, fresh);

        let kept = merged.rounds[0]
            .iter()
            .find(|m| m.slot_a.as_deref() == Some("p02") && m.slot_b.as_deref() == Some("p03"))
            .expect("unchanged pairing must still exist");
        assert_eq!(kept.winner.as_deref(), Some("p02"));
        assert!(!kept.is_bye);

        // reshuffled pairings lose their result; the old final is gone
        let reshuffled = merged.rounds[0]
            .iter()
            .find(|m| m.slot_a.as_deref() == Some("p00"))
            .expect("new seed must be paired");
        assert_eq!(reshuffled.winner, None);
        for round in merged.rounds.iter().skip(1) {
            for m in round {
                assert_eq!(m.winner, None, "downstream rounds must reset");
            }
        }
    }

    #[test]
    fn test_merge_matches_by_pairing_not_position() {
        let mut old = Bracket {
            rounds: vec![
                vec![
                    BracketMatch::pair("Ann", "Dan"),
                    BracketMatch::pair("Bob", "Cleo"),
                ],
                vec![BracketMatch::empty()],
            ],
        };
        set_winner(&mut old, 0, 1, "Cleo").unwrap();

        // same pairings, opposite positions
        let fresh = Bracket {
            rounds: vec![
                vec![
                    BracketMatch::pair("Bob", "Cleo"),
                    BracketMatch::pair("Ann", "Dan"),
                ],
                vec![BracketMatch::empty()],
            ],
        };
        let merged = merge(&old, fresh);
        assert_eq!(merged.rounds[0][0].winner.as_deref(), Some("Cleo"));
        assert_eq!(merged.rounds[0][1].winner, None);
    }

    #[test]
    fn test_merge_identical_roster_preserves_round0_results() {
        let (mut old, roster) = sample_bracket(8);
        set_winner(&mut old, 0, 0, "p01").unwrap();
        set_winner(&mut old, 0, 3, "p06").unwrap();
        let fresh = build_bracket(&roster, &ratings_for(&roster)).unwrap();
        let merged = merge(&old, fresh);
        assert_eq!(merged.rounds[0][0].winner.as_deref(), Some("p01"));
        assert_eq!(merged.rounds[0][3].winner.as_deref(), Some("p06"));
        // merged winners are not re-propagated
        assert_eq!(merged.rounds[1][0].slot_a, None);
    }
}
