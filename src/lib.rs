//! Single-elimination bracket engine for a ping-pong rating tracker.
//!
//! This crate provides the tournament core of the tracker:
//! - Seeded bracket construction from a rated roster, with byes
//! - Interactive re-seeding and result entry with cascading invalidation
//! - An independent third-place match sourced from the semifinal losers
//! - Completion detection and tournament rating awards
//! - Debounced persistence through a pluggable storage adapter
//! - Reconstruction of historical per-match ratings from delta logs
//!
//! Player and match CRUD, HTTP transport, and the base Elo update for
//! ordinary matches live in the surrounding tracker, not here.

pub mod bracket;
pub mod config;
pub mod history;
pub mod mutate;
pub mod persist;
pub mod placement;
pub mod seeding;
pub mod store;
pub mod tournament;

pub use bracket::{Bracket, BracketMatch, Side};
pub use config::EngineConfig;
pub use history::{rating_history, MatchRecord, MatchSide};
pub use mutate::EngineError;
pub use persist::{BracketSaver, PersistenceAdapter, PersistError, TournamentOutcome};
pub use placement::{Placements, PrizeBreakdown, PrizeMode, ThirdPlaceMatch};
pub use store::RatingStore;
pub use tournament::{BetType, Entrant, TournamentEngine, TournamentStatus};
