// Persistence adapter interface and the debounced bracket saver.
//
// Storage is an external collaborator: the engine hands it serialized state
// and never looks at the result beyond logging. Intermediate bracket saves
// are debounced: rapid edits coalesce, the latest payload supersedes any
// unsent one, and a failed save is simply overtaken by the next flush.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

/// Storage-side failure. The engine logs these and moves on; real error
/// handling belongs to the adapter.
#[derive(Debug, Clone, Error)]
pub enum PersistError {
    #[error("storage error: {0}")]
    Storage(String),
    #[error("network error: {0}")]
    Network(String),
}

/// Everything the tracker needs to record a finished tournament.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentOutcome {
    pub winner_name: String,
    pub second_name: Option<String>,
    pub third_name: Option<String>,
    pub bracket_json: String,
    pub rating_deltas: BTreeMap<String, i32>,
}

/// Storage side of the engine: debounced bracket snapshots and the one-shot
/// finish call.
pub trait PersistenceAdapter: Send + Sync {
    fn save_bracket(
        &self,
        tournament_id: i64,
        bracket_json: String,
    ) -> BoxFuture<'static, Result<(), PersistError>>;

    fn finish_tournament(
        &self,
        tournament_id: i64,
        outcome: TournamentOutcome,
    ) -> BoxFuture<'static, Result<(), PersistError>>;
}

struct SavePayload {
    tournament_id: i64,
    bracket_json: String,
}

/// Debounced writer for intermediate bracket state.
///
/// A background task holds at most one pending payload. Each scheduled save
/// replaces the pending one and restarts the quiet window; only after the
/// window passes without another edit does the payload reach the adapter.
/// Dropping every handle flushes whatever is still pending, then stops the
/// task.
#[derive(Clone)]
pub struct BracketSaver {
    tx: mpsc::UnboundedSender<SavePayload>,
}

impl BracketSaver {
    /// Spawn the saver task on the current tokio runtime.
    pub fn spawn(adapter: Arc<dyn PersistenceAdapter>, quiet: Duration) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<SavePayload>();
        tokio::spawn(async move {
            while let Some(mut pending) = rx.recv().await {
                loop {
                    match tokio::time::timeout(quiet, rx.recv()).await {
                        // superseded: keep the newer payload, restart the window
                        Ok(Some(newer)) => pending = newer,
                        // channel closed: flush and stop
                        Ok(None) => {
                            flush(&adapter, pending).await;
                            return;
                        }
                        // quiet window passed
                        Err(_) => {
                            flush(&adapter, pending).await;
                            break;
                        }
                    }
                }
            }
        });
        Self { tx }
    }

    /// Queue a bracket snapshot, superseding any unsent one.
    pub fn schedule(&self, tournament_id: i64, bracket_json: String) {
        let payload = SavePayload {
            tournament_id,
            bracket_json,
        };
        if self.tx.send(payload).is_err() {
            tracing::warn!("bracket saver task is gone; dropping save");
        }
    }
}

async fn flush(adapter: &Arc<dyn PersistenceAdapter>, payload: SavePayload) {
    if let Err(e) = adapter
        .save_bracket(payload.tournament_id, payload.bracket_json)
        .await
    {
        // not retried: the next edit schedules a newer snapshot anyway
        tracing::error!("bracket save failed: {e}");
    }
}
