//! Application-level configuration loading: engine timings, wager limits and the contestant palette.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use serde_with::{DurationMilliSeconds, serde_as};
use tracing::{info, warn};

use crate::engine::{EngineSettings, wager::WagerRules};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "JEOPARTY_BACK_CONFIG_PATH";
/// Fallback color returned when the palette is exhausted.
const DEFAULT_COLOR: &str = "#ffffff";

/// Immutable runtime configuration shared across the application.
#[serde_as]
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Engine clock period.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "tick_ms")]
    pub tick: Duration,
    /// Answer countdown after a won buzz.
    pub answer_time_ms: u64,
    /// Finale answer countdown.
    pub finale_answer_ms: u64,
    /// Freeze length.
    pub freeze_ms: u64,
    /// Freeze is switched off below this much remaining answer time.
    pub freeze_lockout_ms: u64,
    /// Delay before the first tip.
    pub first_tip_delay_ms: u64,
    /// Delay between tips.
    pub extra_tip_delay_ms: u64,
    /// Delay before buzzing reopens after a wrong answer.
    pub reopen_delay_ms: u64,
    /// Rewind grace window once nobody else can buzz.
    pub rewind_grace_ms: u64,
    /// Delay between the reveal and the first buzz window.
    pub buzz_open_delay_ms: u64,
    /// Pre-reveal hijack multiplier.
    pub hijack_bonus: f64,
    /// Smallest daily double wager.
    pub daily_double_min_wager: i64,
    /// Daily double ceiling per round number.
    pub daily_double_round_cap: i64,
    /// Finale ceiling for low scores.
    pub finale_min_cap: i64,
    /// Contestant colors handed out in order.
    pub colors: Vec<String>,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to the built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<Self>(&contents) {
                Ok(config) => {
                    info!(
                        path = %path.display(),
                        tick_ms = config.tick.as_millis() as u64,
                        colors = config.colors.len(),
                        "loaded configuration"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Engine timings and limits.
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            answer_time_ms: self.answer_time_ms,
            finale_answer_ms: self.finale_answer_ms,
            freeze_ms: self.freeze_ms,
            freeze_lockout_ms: self.freeze_lockout_ms,
            first_tip_delay_ms: self.first_tip_delay_ms,
            extra_tip_delay_ms: self.extra_tip_delay_ms,
            reopen_delay_ms: self.reopen_delay_ms,
            rewind_grace_ms: self.rewind_grace_ms,
            buzz_open_delay_ms: self.buzz_open_delay_ms,
            hijack_bonus: self.hijack_bonus,
            wagers: WagerRules {
                daily_double_min: self.daily_double_min_wager,
                daily_double_round_cap: self.daily_double_round_cap,
                finale_min_cap: self.finale_min_cap,
            },
        }
    }

    /// Return the first palette color not already listed in `used`.
    ///
    /// Wraps around to white once every entry is taken so callers always receive a value.
    pub fn first_unused_color<'u>(&self, used: impl IntoIterator<Item = &'u str> + Clone) -> String {
        self.colors
            .iter()
            .find(|candidate| {
                used.clone()
                    .into_iter()
                    .all(|existing| !existing.eq_ignore_ascii_case(candidate.as_str()))
            })
            .cloned()
            .unwrap_or_else(|| DEFAULT_COLOR.to_owned())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let engine = EngineSettings::default();
        Self {
            tick: Duration::from_millis(30),
            answer_time_ms: engine.answer_time_ms,
            finale_answer_ms: engine.finale_answer_ms,
            freeze_ms: engine.freeze_ms,
            freeze_lockout_ms: engine.freeze_lockout_ms,
            first_tip_delay_ms: engine.first_tip_delay_ms,
            extra_tip_delay_ms: engine.extra_tip_delay_ms,
            reopen_delay_ms: engine.reopen_delay_ms,
            rewind_grace_ms: engine.rewind_grace_ms,
            buzz_open_delay_ms: engine.buzz_open_delay_ms,
            hijack_bonus: engine.hijack_bonus,
            daily_double_min_wager: engine.wagers.daily_double_min,
            daily_double_round_cap: engine.wagers.daily_double_round_cap,
            finale_min_cap: engine.wagers.finale_min_cap,
            colors: default_colors(),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Built-in palette shipped with the binary.
fn default_colors() -> Vec<String> {
    [
        "#e6194b", "#3cb44b", "#ffe119", "#4363d8", "#f58231", "#911eb4", "#46f0f0", "#f032e6",
        "#bcf60c", "#fabebe", "#008080", "#e6beff",
    ]
    .into_iter()
    .map(str::to_owned)
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{ "tick_ms": 50, "answer_time_ms": 8000 }"#).unwrap();
        assert_eq!(config.tick, Duration::from_millis(50));
        assert_eq!(config.engine_settings().answer_time_ms, 8000);
        assert_eq!(config.engine_settings().freeze_ms, 40_000);
        assert_eq!(config.colors.len(), 12);
    }

    #[test]
    fn first_unused_color_skips_taken_entries() {
        let config = AppConfig {
            colors: vec!["#111111".into(), "#222222".into()],
            ..AppConfig::default()
        };
        assert_eq!(config.first_unused_color(["#111111"]), "#222222");
        assert_eq!(config.first_unused_color(["#111111", "#222222"]), DEFAULT_COLOR);
    }
}
