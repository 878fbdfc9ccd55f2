//! Playback configuration
//!
//! Every wait, framing constant and layout force lives here. All sections
//! default to the stock values, so a config file only needs the keys it
//! overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PlaybackError, PlaybackResult};

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Multiplier applied to every wait; 1.0 is real time
    pub time_scale: f64,
    pub framing: FramingConfig,
    pub sparkle: SparkleConfig,
    pub live: LiveTimings,
    pub replay: ReplayTimings,
    pub session: SessionTimings,
    pub layout: LayoutConfig,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            time_scale: 1.0,
            framing: FramingConfig::default(),
            sparkle: SparkleConfig::default(),
            live: LiveTimings::default(),
            replay: ReplayTimings::default(),
            session: SessionTimings::default(),
            layout: LayoutConfig::default(),
        }
    }
}

/// Camera framing retry schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FramingConfig {
    /// Wait before the first look at positions
    pub first_attempt_ms: u64,
    /// Wait between later attempts
    pub retry_ms: u64,
    pub max_attempts: u32,
    /// Attempt after which a stalled layout gets a repaint nudge
    pub refresh_attempt: u32,
    /// Cluster spread multiplier in the framing distance
    pub spread_scale: f32,
    pub transition_ms: u64,
    pub fit_all_transition_ms: u64,
}

impl Default for FramingConfig {
    fn default() -> Self {
        Self {
            first_attempt_ms: 500,
            retry_ms: 1000,
            max_attempts: 15,
            refresh_attempt: 3,
            spread_scale: 2.0,
            transition_ms: 1500,
            fit_all_transition_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SparkleConfig {
    pub step_ms: u64,
    /// Total duration of a seed sparkle
    pub seed_ms: u64,
    /// Total duration of a propagation sparkle
    pub propagation_ms: u64,
}

impl Default for SparkleConfig {
    fn default() -> Self {
        Self {
            step_ms: 200,
            seed_ms: 1500,
            propagation_ms: 1200,
        }
    }
}

/// Waits of the live-run sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveTimings {
    pub warmup_ms: u64,
    pub seed_size_settle_ms: u64,
    pub seed_reveal_ms: u64,
    pub seed_zoom_distance: f32,
    pub seed_focus_ms: u64,
    pub seed_hold_ms: u64,
    pub propagation_zoom_distance: f32,
    pub propagation_focus_ms: u64,
    pub propagation_paint_ms: u64,
    pub propagation_hold_ms: u64,
    pub seed_size_gap_ms: u64,
    pub finale_ms: u64,
}

impl Default for LiveTimings {
    fn default() -> Self {
        Self {
            warmup_ms: 500,
            seed_size_settle_ms: 1000,
            seed_reveal_ms: 500,
            seed_zoom_distance: 120.0,
            seed_focus_ms: 1500,
            seed_hold_ms: 1500,
            propagation_zoom_distance: 200.0,
            propagation_focus_ms: 1200,
            propagation_paint_ms: 100,
            propagation_hold_ms: 2000,
            seed_size_gap_ms: 1500,
            finale_ms: 1000,
        }
    }
}

/// Waits of the saved-run replay sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayTimings {
    /// Layout settle time after a whole new graph was loaded
    pub settle_ms: u64,
    pub fit_all_wait_ms: u64,
    pub seed_zoom_distance: f32,
    pub seed_focus_ms: u64,
    pub seed_hold_ms: u64,
    pub propagation_zoom_distance: f32,
    pub propagation_focus_ms: u64,
    pub propagation_hold_ms: u64,
    pub stage_gap_ms: u64,
}

impl Default for ReplayTimings {
    fn default() -> Self {
        Self {
            settle_ms: 3000,
            fit_all_wait_ms: 2000,
            seed_zoom_distance: 120.0,
            seed_focus_ms: 1500,
            seed_hold_ms: 500,
            propagation_zoom_distance: 200.0,
            propagation_focus_ms: 2000,
            propagation_hold_ms: 1000,
            stage_gap_ms: 500,
        }
    }
}

/// Waits used by the session when swapping graphs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionTimings {
    pub graph_load_ms: u64,
    /// Upper bound on waiting for the layout to go idle
    pub layout_wait_ms: u64,
    pub layout_poll_ms: u64,
    pub restore_ms: u64,
}

impl Default for SessionTimings {
    fn default() -> Self {
        Self {
            graph_load_ms: 1000,
            layout_wait_ms: 3000,
            layout_poll_ms: 100,
            restore_ms: 500,
        }
    }
}

/// Force layout constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Repulsion strength (negative = repulsion)
    pub charge: f32,
    /// Link rest length
    pub link_distance: f32,
    pub link_strength: f32,
    pub center_strength: f32,
    /// Velocity decay (friction)
    pub velocity_decay: f32,
    /// Minimum alpha before the layout goes idle
    pub alpha_min: f32,
    pub alpha_decay: f32,
    /// Radius of the initial sphere placement
    pub initial_radius: f32,
    pub tick_ms: u64,
    /// Publish positions every N ticks
    pub publish_every: u32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            charge: -50.0,
            link_distance: 60.0,
            link_strength: 1.0,
            center_strength: 0.08,
            velocity_decay: 0.6,
            alpha_min: 0.001,
            alpha_decay: 1.0 - 0.001_f32.powf(1.0 / 300.0),
            initial_radius: 100.0,
            tick_ms: 16,
            publish_every: 5,
        }
    }
}

impl PlaybackConfig {
    /// Load from a `.yaml`/`.yml` or `.json` file
    pub fn load(path: &Path) -> PlaybackResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let text = std::fs::read_to_string(path)?;
        let config: PlaybackConfig = match ext.as_str() {
            "yaml" | "yml" => serde_yaml::from_str(&text)?,
            "json" => serde_json::from_str(&text)?,
            other => return Err(PlaybackError::UnsupportedConfigFormat(other.to_string())),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> PlaybackResult<()> {
        if !(self.time_scale.is_finite() && self.time_scale >= 0.0) {
            return Err(PlaybackError::InvalidConfig(format!(
                "time_scale must be a non-negative number, got {}",
                self.time_scale
            )));
        }
        if !(self.framing.spread_scale.is_finite() && self.framing.spread_scale >= 0.0) {
            return Err(PlaybackError::InvalidConfig(format!(
                "framing.spread_scale must be a non-negative number, got {}",
                self.framing.spread_scale
            )));
        }
        if self.layout.publish_every == 0 {
            return Err(PlaybackError::InvalidConfig(
                "layout.publish_every must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_time_scale(mut self, time_scale: f64) -> PlaybackResult<Self> {
        self.time_scale = time_scale;
        self.validate()?;
        Ok(self)
    }
}
