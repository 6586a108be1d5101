// Tournament engine: authoritative bracket state, edits, persistence wiring.
//
// One engine per tournament. Edits are synchronous: each operation works on
// a deep copy of the bracket and swaps it in only when validation passes, so
// a rejected edit is invisible. Saving and finishing are asynchronous side
// effects, debounced and guard-protected respectively.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::bracket::{Bracket, Side};
use crate::config::EngineConfig;
use crate::mutate::{self, EngineError};
use crate::persist::{BracketSaver, PersistenceAdapter, TournamentOutcome};
use crate::placement::{self, Placements, PrizeBreakdown, PrizeMode, ThirdPlaceMatch};
use crate::seeding;
use crate::store::RatingStore;

/// What a tournament's entry stakes are denominated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetType {
    Money,
    Points,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    Active,
    Finished,
}

/// A tournament participant and their stake in the prize pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entrant {
    pub name: String,
    pub bet: i64,
}

struct EngineState {
    entrants: Vec<Entrant>,
    bracket: Option<Bracket>,
    third_winner: Option<String>,
    status: TournamentStatus,
    placements: Option<Placements>,
    rating_deltas: BTreeMap<String, i32>,
    finish_in_flight: bool,
}

impl EngineState {
    fn roster(&self) -> Vec<String> {
        self.entrants.iter().map(|e| e.name.clone()).collect()
    }
}

/// The single authoritative in-memory tournament.
pub struct TournamentEngine {
    id: i64,
    prize_mode: PrizeMode,
    bet_type: BetType,
    config: EngineConfig,
    store: RatingStore,
    adapter: Arc<dyn PersistenceAdapter>,
    saver: BracketSaver,
    state: Arc<Mutex<EngineState>>,
}

impl TournamentEngine {
    /// Create an engine for a new, empty tournament. Must run inside a tokio
    /// runtime (the debounced saver is spawned here).
    pub fn new(
        id: i64,
        prize_mode: PrizeMode,
        bet_type: BetType,
        store: RatingStore,
        adapter: Arc<dyn PersistenceAdapter>,
        config: EngineConfig,
    ) -> Self {
        let saver = BracketSaver::spawn(adapter.clone(), config.save_debounce());
        Self {
            id,
            prize_mode,
            bet_type,
            config,
            store,
            adapter,
            saver,
            state: Arc::new(Mutex::new(EngineState {
                entrants: Vec::new(),
                bracket: None,
                third_winner: None,
                status: TournamentStatus::Active,
                placements: None,
                rating_deltas: BTreeMap::new(),
                finish_in_flight: false,
            })),
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn bet_type(&self) -> BetType {
        self.bet_type
    }

    pub fn prize_mode(&self) -> PrizeMode {
        self.prize_mode
    }

    // ── Roster lifecycle ──────────────────────────────────────────────

    /// Replace the roster, rebuilding the bracket as needed.
    ///
    /// Fewer than two entrants clears the bracket (not an error). A first
    /// viable roster builds a fresh skeleton; a changed one rebuilds and
    /// reconciles, keeping decided round-0 results for unchanged pairings
    /// and dropping the third-place pick. Bets-only changes touch nothing.
    pub fn set_roster(&self, entrants: Vec<Entrant>) -> Result<(), EngineError> {
        let mut state = self.lock();
        if state.status == TournamentStatus::Finished {
            return Err(EngineError::Finished);
        }

        let names_changed = state.entrants.len() != entrants.len()
            || state
                .entrants
                .iter()
                .zip(&entrants)
                .any(|(a, b)| a.name != b.name);
        state.entrants = entrants;

        if state.entrants.len() < 2 {
            if state.bracket.take().is_some() {
                tracing::info!(tournament = self.id, "roster below two; bracket cleared");
            }
            state.third_winner = None;
            return Ok(());
        }

        if !names_changed && state.bracket.is_some() {
            return Ok(());
        }

        let roster = state.roster();
        let fresh = match seeding::build_bracket(&roster, &self.store.snapshot()) {
            Some(b) => b,
            None => return Ok(()),
        };
        state.bracket = Some(match state.bracket.take() {
            Some(old) => mutate::merge(&old, fresh),
            None => fresh,
        });
        state.third_winner = None;
        tracing::info!(
            tournament = self.id,
            players = state.entrants.len(),
            "bracket rebuilt"
        );
        drop(state);

        self.schedule_save();
        Ok(())
    }

    /// Adopt a bracket previously serialized by this engine.
    pub fn load_bracket(&self, bracket_json: &str) -> Result<(), EngineError> {
        let bracket = Bracket::from_json(bracket_json)?;
        let mut state = self.lock();
        state.bracket = Some(bracket);
        Ok(())
    }

    // ── Bracket edits ─────────────────────────────────────────────────

    /// Seat a participant in a round-0 slot, or empty it with `None`.
    pub fn assign_slot(
        &self,
        index: usize,
        side: Side,
        name: Option<&str>,
    ) -> Result<(), EngineError> {
        self.edit(|bracket, roster| mutate::assign_slot(bracket, roster, index, side, name))
    }

    /// Move a seated participant between round-0 slots, displacing the
    /// destination's occupant into the vacated source.
    pub fn move_slot(
        &self,
        from_index: usize,
        from_side: Side,
        to_index: usize,
        to_side: Side,
    ) -> Result<(), EngineError> {
        self.edit(|bracket, _| mutate::move_slot(bracket, from_index, from_side, to_index, to_side))
    }

    /// Empty a round-0 slot.
    pub fn clear_slot(&self, index: usize, side: Side) -> Result<(), EngineError> {
        self.edit(|bracket, _| mutate::clear_slot(bracket, index, side))
    }

    /// Record the winner of a played match.
    pub fn set_winner(&self, round: usize, index: usize, name: &str) -> Result<(), EngineError> {
        self.edit(|bracket, _| mutate::set_winner(bracket, round, index, name))
    }

    /// Undo a recorded result.
    pub fn clear_winner(&self, round: usize, index: usize) -> Result<(), EngineError> {
        self.edit(|bracket, _| mutate::clear_winner(bracket, round, index))
    }

    /// Pick (or clear) the third-place winner among the semifinal losers.
    pub fn set_third_place_winner(&self, name: Option<&str>) -> Result<(), EngineError> {
        {
            let mut state = self.lock();
            if state.status == TournamentStatus::Finished {
                return Err(EngineError::Finished);
            }
            let bracket = state.bracket.as_ref().ok_or(EngineError::NoBracket)?;
            let (a, b) =
                placement::third_place_candidates(bracket).ok_or(EngineError::MatchNotReady)?;
            if let Some(name) = name {
                if name != a && name != b {
                    return Err(EngineError::WinnerNotInMatch(name.to_string()));
                }
            }
            state.third_winner = name.map(str::to_string);
        }
        self.poll_completion();
        Ok(())
    }

    // ── Snapshots ─────────────────────────────────────────────────────

    pub fn status(&self) -> TournamentStatus {
        self.lock().status
    }

    pub fn entrants(&self) -> Vec<Entrant> {
        self.lock().entrants.clone()
    }

    pub fn bracket(&self) -> Option<Bracket> {
        self.lock().bracket.clone()
    }

    /// The third-place match, while one exists.
    pub fn third_place(&self) -> Option<ThirdPlaceMatch> {
        let state = self.lock();
        let bracket = state.bracket.as_ref()?;
        placement::third_place_match(bracket, state.third_winner.as_deref())
    }

    /// Everyone currently occupying any bracket slot, for "busy" markers.
    pub fn occupied_names(&self) -> BTreeSet<String> {
        self.lock()
            .bracket
            .as_ref()
            .map(|b| b.occupied_names())
            .unwrap_or_default()
    }

    /// Roster members without a round-0 seat.
    pub fn unplaced_names(&self) -> Vec<String> {
        let state = self.lock();
        let seated = state
            .bracket
            .as_ref()
            .map(|b| b.round0_names())
            .unwrap_or_default();
        state
            .entrants
            .iter()
            .map(|e| e.name.clone())
            .filter(|n| !seated.contains(n))
            .collect()
    }

    /// Final standings, once finished.
    pub fn placements(&self) -> Option<Placements> {
        self.lock().placements.clone()
    }

    /// Awarded rating deltas, once finished.
    pub fn rating_deltas(&self) -> BTreeMap<String, i32> {
        self.lock().rating_deltas.clone()
    }

    pub fn prize_pool(&self) -> i64 {
        self.lock().entrants.iter().map(|e| e.bet).sum()
    }

    pub fn prizes(&self) -> PrizeBreakdown {
        placement::prize_breakdown(self.prize_mode, self.prize_pool())
    }

    // ── Completion ────────────────────────────────────────────────────

    /// Re-evaluate the completion conditions and, when they hold, submit the
    /// finish call once. Runs after every state change; safe to call any
    /// time (an in-flight or already-finished tournament is left alone).
    pub fn poll_completion(&self) {
        if !self.config.auto_finish {
            return;
        }

        let outcome = {
            let mut state = self.lock();
            if state.status == TournamentStatus::Finished || state.finish_in_flight {
                return;
            }
            let Some(bracket) = state.bracket.as_ref() else {
                return;
            };
            let third = placement::third_place_match(bracket, state.third_winner.as_deref());
            let Some(placements) = placement::detect_completion(bracket, third.as_ref()) else {
                return;
            };
            let bracket_json = match bracket.to_json() {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!(tournament = self.id, "bracket serialization failed: {e}");
                    return;
                }
            };
            let roster = state.roster();
            let rating_deltas = placement::rating_deltas(bracket, &placements, &roster);
            state.finish_in_flight = true;
            TournamentOutcome {
                winner_name: placements.winner_name,
                second_name: placements.second_name,
                third_name: placements.third_name,
                bracket_json,
                rating_deltas,
            }
        };

        let id = self.id;
        let adapter = self.adapter.clone();
        let state = self.state.clone();
        tokio::spawn(async move {
            let result = adapter.finish_tournament(id, outcome.clone()).await;
            let mut state = state.lock().unwrap();
            state.finish_in_flight = false;
            match result {
                Ok(()) => {
                    state.status = TournamentStatus::Finished;
                    state.placements = Some(Placements {
                        winner_name: outcome.winner_name.clone(),
                        second_name: outcome.second_name.clone(),
                        third_name: outcome.third_name.clone(),
                    });
                    state.rating_deltas = outcome.rating_deltas;
                    tracing::info!(tournament = id, winner = %outcome.winner_name, "tournament finished");
                }
                Err(e) => {
                    // still active: the guard re-evaluates on the next edit
                    tracing::error!(tournament = id, "finish submission failed: {e}");
                }
            }
        });
    }

    // ── Internals ─────────────────────────────────────────────────────

    fn lock(&self) -> std::sync::MutexGuard<'_, EngineState> {
        self.state.lock().unwrap()
    }

    /// Run one edit against a deep copy, swap it in on success, then kick
    /// off the save debounce and a completion check.
    fn edit<F>(&self, op: F) -> Result<(), EngineError>
    where
        F: FnOnce(&mut Bracket, &[String]) -> Result<(), EngineError>,
    {
        {
            let mut state = self.lock();
            if state.status == TournamentStatus::Finished {
                return Err(EngineError::Finished);
            }
            let roster = state.roster();
            let current = state.bracket.as_ref().ok_or(EngineError::NoBracket)?;
            let mut scratch = current.clone();
            op(&mut scratch, &roster)?;
            state.bracket = Some(scratch);
        }
        self.schedule_save();
        self.poll_completion();
        Ok(())
    }

    fn schedule_save(&self) {
        let state = self.lock();
        if state.status == TournamentStatus::Finished {
            return;
        }
        let Some(bracket) = state.bracket.as_ref() else {
            return;
        };
        match bracket.to_json() {
            Ok(json) => self.saver.schedule(self.id, json),
            Err(e) => {
                tracing::error!(tournament = self.id, "bracket serialization failed: {e}")
            }
        }
    }
}
