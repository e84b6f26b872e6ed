//! Runtime tunables for the tracker core.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::effect::{resolve_display_effect, DisplayEffect};
use crate::path::DEFAULT_DETECTION_RADIUS;

/// Shortest render period the scheduler accepts: one world tick.
pub const MIN_RENDER_INTERVAL_MS: u64 = 50;

fn default_render_interval() -> u64 {
    500
}

fn default_sample_interval() -> u64 {
    50
}

fn default_reminder_interval() -> u64 {
    30_000
}

fn default_detection_radius() -> f64 {
    DEFAULT_DETECTION_RADIUS
}

fn default_max_name_length() -> usize {
    32
}

fn default_display_effect() -> String {
    DisplayEffect::DEFAULT.as_str().to_string()
}

fn default_travel_message() -> String {
    "Traveling ".to_string()
}

fn default_recording_message() -> String {
    "Recording ".to_string()
}

/// Tracker settings, usually read from the `[tracker]` table of the
/// application config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerSettings {
    /// Period of the render scheduler in milliseconds
    #[serde(default = "default_render_interval")]
    pub render_interval_ms: u64,
    /// Minimum time between two accepted recording samples per agent
    #[serde(default = "default_sample_interval")]
    pub sample_interval_ms: u64,
    /// How long an agent stays on a path before being reminded of it
    #[serde(default = "default_reminder_interval")]
    pub reminder_interval_ms: u64,
    /// Detection radius given to newly recorded paths
    #[serde(default = "default_detection_radius")]
    pub default_detection_radius: f64,
    /// Point cap given to newly recorded paths (0 = unlimited)
    #[serde(default)]
    pub default_max_points: usize,
    /// Longest accepted path name, in characters
    #[serde(default = "default_max_name_length")]
    pub max_name_length: usize,
    /// Display effect given to newly recorded paths
    #[serde(default = "default_display_effect")]
    pub default_display_effect: String,
    /// Prefix of the notification sent while on a completed path
    #[serde(default = "default_travel_message")]
    pub travel_message: String,
    /// Prefix of the notification sent while recording
    #[serde(default = "default_recording_message")]
    pub recording_message: String,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            render_interval_ms: default_render_interval(),
            sample_interval_ms: default_sample_interval(),
            reminder_interval_ms: default_reminder_interval(),
            default_detection_radius: default_detection_radius(),
            default_max_points: 0,
            max_name_length: default_max_name_length(),
            default_display_effect: default_display_effect(),
            travel_message: default_travel_message(),
            recording_message: default_recording_message(),
        }
    }
}

impl TrackerSettings {
    /// Render period, clamped to at least one world tick.
    pub fn render_interval(&self) -> Duration {
        Duration::from_millis(self.render_interval_ms.max(MIN_RENDER_INTERVAL_MS))
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    pub fn reminder_interval(&self) -> Duration {
        Duration::from_millis(self.reminder_interval_ms)
    }

    /// The configured default effect, coerced to something renderable.
    pub fn display_effect(&self) -> DisplayEffect {
        resolve_display_effect(&self.default_display_effect).0
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.render_interval_ms < MIN_RENDER_INTERVAL_MS {
            return Err(format!(
                "render_interval_ms must be at least {MIN_RENDER_INTERVAL_MS} (one world tick)"
            ));
        }
        if !(self.default_detection_radius > 0.0) || !self.default_detection_radius.is_finite() {
            return Err("default_detection_radius must be a positive number".to_string());
        }
        if self.max_name_length == 0 {
            return Err("max_name_length must be greater than zero".to_string());
        }
        Ok(())
    }
}
