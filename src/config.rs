// Engine configuration, loaded from environment variables.

use std::time::Duration;

const DEFAULT_SAVE_DEBOUNCE_MS: u64 = 800;

/// Tunables for one engine instance.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Quiet window before an edited bracket is flushed to storage.
    pub save_debounce_ms: u64,
    /// Whether completion automatically submits the finish call. Disable to
    /// drive finishing by hand.
    pub auto_finish: bool,
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// - `PINGPONG_SAVE_DEBOUNCE_MS` - save quiet window in milliseconds
    ///   (default: 800)
    /// - `PINGPONG_AUTO_FINISH` - set to `false` or `0` to disable automatic
    ///   finish submission (default: enabled)
    pub fn from_env() -> Self {
        let save_debounce_ms = std::env::var("PINGPONG_SAVE_DEBOUNCE_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_SAVE_DEBOUNCE_MS);

        let auto_finish = std::env::var("PINGPONG_AUTO_FINISH")
            .map(|v| !(v.eq_ignore_ascii_case("false") || v == "0"))
            .unwrap_or(true);

        EngineConfig {
            save_debounce_ms,
            auto_finish,
        }
    }

    pub fn save_debounce(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            save_debounce_ms: DEFAULT_SAVE_DEBOUNCE_MS,
            auto_finish: true,
        }
    }
}
