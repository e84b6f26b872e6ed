//! Path registry: the concurrent source of truth for paths, recorder
//! assignments and viewer assignments.
//!
//! Handles:
//! - Recording lifecycle (start / stop / remove)
//! - Viewer sets (show / hide, lazy pruning of deleted paths)
//! - Metadata changes on existing paths
//! - Defensive snapshots for command fronts, the render loop and the API
//!
//! Each map is a `DashMap`, so single-key lookups never need a caller-side
//! lock. Operations that span more than one map hold the `transitions` lock
//! for writing; readers that need a consistent view across maps hold it for
//! reading. Point appends also hold it for reading, so a path never gains a
//! point after its recording was stopped.

use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::effect::{resolve_display_effect, DisplayEffect};
use crate::error::{RegistryError, RegistryResult};
use crate::path::{AppendOutcome, Path};
use crate::settings::TrackerSettings;
use crate::types::{AgentId, SpatialPoint};
use chrono::{DateTime, Utc};

/// Values given to paths created by `start_recording`.
#[derive(Debug, Clone)]
struct PathDefaults {
    detection_radius: f64,
    max_points: usize,
    display_effect: DisplayEffect,
    max_name_length: usize,
}

/// Lifecycle state of a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStatus {
    Recording,
    Completed,
}

/// Inspection view of a single path.
#[derive(Debug, Clone, PartialEq)]
pub struct PathSummary {
    pub name: String,
    pub description: String,
    pub point_count: usize,
    pub detection_radius: f64,
    pub display_effect: DisplayEffect,
    pub max_points: usize,
    pub status: PathStatus,
    pub viewer_count: usize,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// Checks a proposed path name against the naming policy: non-empty, at most
/// `max_len` characters, only letters, digits, spaces, `_` and `-`.
pub fn validate_path_name(name: &str, max_len: usize) -> RegistryResult<()> {
    if name.trim().is_empty() {
        return Err(RegistryError::InvalidName("name cannot be empty".to_string()));
    }
    let len = name.chars().count();
    if len > max_len {
        return Err(RegistryError::InvalidName(format!(
            "name is {len} characters long, the limit is {max_len}"
        )));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_alphanumeric() || *c == ' ' || *c == '_' || *c == '-'))
    {
        return Err(RegistryError::InvalidName(format!(
            "character '{bad}' is not allowed"
        )));
    }
    Ok(())
}

/// The set of paths plus who is recording and who is viewing what.
///
/// Single-key lookups go straight to the concurrent maps. Operations that
/// touch more than one map run under the `transitions` lock, so readers
/// taking a snapshot never see half of a transition.
///
/// # Example
///
/// ```
/// use trail_core::{AgentId, PathRegistry, SpatialPoint, TrackerSettings};
///
/// let registry = PathRegistry::new(&TrackerSettings::default());
/// let agent = AgentId::new();
/// registry.start_recording(agent, "alex", "river walk")?;
/// registry.record_point(agent, SpatialPoint::new("overworld", 1.0, 64.0, 2.0));
/// assert_eq!(registry.stop_recording(agent)?, "river walk");
/// assert!(registry.is_completed("river walk"));
/// # Ok::<(), trail_core::RegistryError>(())
/// ```
pub struct PathRegistry {
    /// All paths by name
    paths: DashMap<String, Arc<Path>>,
    /// Agent -> name of the path it is recording
    recorders: DashMap<AgentId, String>,
    /// Agent -> names of the paths it has chosen to view
    viewers: DashMap<AgentId, HashSet<String>>,
    /// Guards transitions that touch more than one map
    transitions: RwLock<()>,
    defaults: PathDefaults,
}

impl PathRegistry {
    /// Creates an empty registry. New paths take their radius, point cap and
    /// effect from `settings`.
    pub fn new(settings: &TrackerSettings) -> Self {
        Self {
            paths: DashMap::new(),
            recorders: DashMap::new(),
            viewers: DashMap::new(),
            transitions: RwLock::new(()),
            defaults: PathDefaults {
                detection_radius: settings.default_detection_radius,
                max_points: settings.default_max_points,
                display_effect: settings.display_effect(),
                max_name_length: settings.max_name_length,
            },
        }
    }

    // ========================================================================
    // Recording lifecycle
    // ========================================================================

    /// Creates `path_name` owned by `agent_name` and makes `agent` its
    /// recorder, as one atomic step.
    pub fn start_recording(
        &self,
        agent: AgentId,
        agent_name: &str,
        path_name: &str,
    ) -> RegistryResult<Arc<Path>> {
        let _guard = self.transitions.write();

        if self.recorders.contains_key(&agent) {
            return Err(RegistryError::AlreadyRecording);
        }
        validate_path_name(path_name, self.defaults.max_name_length)?;
        if self.paths.contains_key(path_name) {
            return Err(RegistryError::NameTaken(path_name.to_string()));
        }

        let path = Arc::new(
            Path::new(path_name, agent_name)
                .with_detection_radius(self.defaults.detection_radius)
                .with_max_points(self.defaults.max_points)
                .with_display_effect(self.defaults.display_effect),
        );
        self.recorders.insert(agent, path_name.to_string());
        self.paths.insert(path_name.to_string(), Arc::clone(&path));

        info!("🎬 {} ({}) started recording path '{}'", agent_name, agent, path_name);
        Ok(path)
    }

    /// Ends the agent's recording; the path stays in the registry, completed.
    /// Returns the name of the path that was being recorded.
    pub fn stop_recording(&self, agent: AgentId) -> RegistryResult<String> {
        let _guard = self.transitions.write();

        let (_, path_name) = self
            .recorders
            .remove(&agent)
            .ok_or(RegistryError::NotRecording)?;

        let points = self
            .paths
            .get(&path_name)
            .map(|path| path.point_count())
            .unwrap_or(0);
        info!("⏹️ {} stopped recording path '{}' ({} points)", agent, path_name, points);
        Ok(path_name)
    }

    /// Deletes a completed path and prunes it from every viewer set.
    pub fn remove_path(&self, path_name: &str) -> RegistryResult<Arc<Path>> {
        let _guard = self.transitions.write();

        if !self.paths.contains_key(path_name) {
            return Err(RegistryError::NotFound(path_name.to_string()));
        }
        if self.is_being_recorded(path_name) {
            return Err(RegistryError::InUse(path_name.to_string()));
        }

        for mut entry in self.viewers.iter_mut() {
            entry.value_mut().remove(path_name);
        }
        self.viewers.retain(|_, names| !names.is_empty());

        let (_, removed) = self
            .paths
            .remove(path_name)
            .ok_or_else(|| RegistryError::NotFound(path_name.to_string()))?;

        info!("🗑️ Removed path '{}'", path_name);
        Ok(removed)
    }

    /// Appends a sampled point to the path `agent` is recording.
    ///
    /// Returns `None` when the agent is not recording.
    pub fn record_point(&self, agent: AgentId, point: SpatialPoint) -> Option<AppendOutcome> {
        let _guard = self.transitions.read();

        let path_name = self.recorders.get(&agent)?.value().clone();
        let path = self.paths.get(&path_name).map(|entry| Arc::clone(entry.value()));
        match path {
            Some(path) => Some(path.append_point(point)),
            None => {
                warn!("Recorder {} references missing path '{}'", agent, path_name);
                None
            }
        }
    }

    // ========================================================================
    // Viewer sets
    // ========================================================================

    /// Adds a completed path to the agent's viewer set.
    pub fn show_path(&self, agent: AgentId, path_name: &str) -> RegistryResult<()> {
        let _guard = self.transitions.write();

        if !self.paths.contains_key(path_name) {
            return Err(RegistryError::NotFound(path_name.to_string()));
        }
        if self.is_being_recorded(path_name) {
            return Err(RegistryError::Recording(path_name.to_string()));
        }

        let mut names = self.viewers.entry(agent).or_default();
        if !names.insert(path_name.to_string()) {
            return Err(RegistryError::AlreadyShown(path_name.to_string()));
        }

        debug!("👁️ {} is now viewing '{}'", agent, path_name);
        Ok(())
    }

    /// Removes a path from the agent's viewer set, dropping the set once empty.
    pub fn hide_path(&self, agent: AgentId, path_name: &str) -> RegistryResult<()> {
        let _guard = self.transitions.write();

        {
            let mut names = self
                .viewers
                .get_mut(&agent)
                .ok_or_else(|| RegistryError::NotShown(path_name.to_string()))?;
            if !names.remove(path_name) {
                return Err(RegistryError::NotShown(path_name.to_string()));
            }
        }
        self.viewers.remove_if(&agent, |_, names| names.is_empty());

        debug!("🙈 {} stopped viewing '{}'", agent, path_name);
        Ok(())
    }

    /// Drops a stale reference from an agent's viewer set, if the path is
    /// really gone. Used by the render loop as it walks viewer sets.
    pub fn prune_viewer(&self, agent: AgentId, path_name: &str) -> bool {
        let _guard = self.transitions.write();

        if self.paths.contains_key(path_name) {
            return false;
        }
        let pruned = self
            .viewers
            .get_mut(&agent)
            .map(|mut names| names.remove(path_name))
            .unwrap_or(false);
        self.viewers.remove_if(&agent, |_, names| names.is_empty());
        if pruned {
            debug!("🧹 Pruned deleted path '{}' from viewer {}", path_name, agent);
        }
        pruned
    }

    // ========================================================================
    // Metadata changes
    // ========================================================================

    /// Replaces the description. Allowed while the path is being recorded.
    pub fn describe_path(&self, path_name: &str, description: &str) -> RegistryResult<()> {
        self.revise(path_name, true, |path| {
            path.set_description(description);
            Ok(())
        })
    }

    /// Sets the proximity radius of a completed path.
    ///
    /// # Errors
    ///
    /// `InvalidValue` for a radius that is not a positive finite number,
    /// `NotFound` for an unknown path, `Recording` while it is being recorded.
    pub fn set_detection_radius(&self, path_name: &str, radius: f64) -> RegistryResult<()> {
        if !(radius > 0.0) || !radius.is_finite() {
            return Err(RegistryError::InvalidValue(
                "radius must be a positive number".to_string(),
            ));
        }
        self.revise(path_name, false, |path| {
            path.set_detection_radius(radius);
            Ok(())
        })
    }

    /// Sets the display effect, coercing unsupported names to the default.
    /// Returns the applied effect and whether the fallback was used.
    pub fn set_display_effect(
        &self,
        path_name: &str,
        requested: &str,
    ) -> RegistryResult<(DisplayEffect, bool)> {
        let (effect, used_fallback) = resolve_display_effect(requested);
        self.revise(path_name, false, |path| {
            path.set_display_effect(effect);
            Ok(())
        })?;
        if used_fallback {
            warn!(
                "Display effect '{}' is not renderable, '{}' uses {} instead",
                requested, path_name, effect
            );
        }
        Ok((effect, used_fallback))
    }

    /// Sets the point cap; `0` means unlimited. Points already recorded
    /// beyond a lowered cap are kept.
    pub fn set_max_points(&self, path_name: &str, max_points: usize) -> RegistryResult<()> {
        self.revise(path_name, true, |path| {
            path.set_max_points(max_points);
            Ok(())
        })
    }

    /// Publishes an edited copy of `path_name`.
    fn revise<F>(&self, path_name: &str, allow_while_recording: bool, edit: F) -> RegistryResult<()>
    where
        F: FnOnce(&mut Path) -> RegistryResult<()>,
    {
        let _guard = self.transitions.write();

        let current = self
            .paths
            .get(path_name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| RegistryError::NotFound(path_name.to_string()))?;
        if !allow_while_recording && self.is_being_recorded(path_name) {
            return Err(RegistryError::Recording(path_name.to_string()));
        }

        let mut revised = (*current).clone();
        edit(&mut revised)?;
        self.paths.insert(path_name.to_string(), Arc::new(revised));

        debug!("✏️ Updated path '{}'", path_name);
        Ok(())
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Replaces the completed paths with `loaded`. Paths being recorded are
    /// kept, and a loaded path whose name collides with one is skipped.
    /// Returns the number of paths installed.
    pub fn load_paths(&self, loaded: HashMap<String, Path>) -> usize {
        let _guard = self.transitions.write();

        let recording: HashSet<String> =
            self.recorders.iter().map(|entry| entry.value().clone()).collect();
        self.paths.retain(|name, _| recording.contains(name));

        let mut installed = 0;
        for (name, path) in loaded {
            if recording.contains(&name) {
                warn!("Skipping loaded path '{}': a path with that name is being recorded", name);
                continue;
            }
            self.paths.insert(name, Arc::new(path));
            installed += 1;
        }
        installed
    }

    // ========================================================================
    // Read accessors (all return copies)
    // ========================================================================

    pub fn get_path(&self, path_name: &str) -> Option<Arc<Path>> {
        self.paths.get(path_name).map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains_path(&self, path_name: &str) -> bool {
        self.paths.contains_key(path_name)
    }

    pub fn path_count(&self) -> usize {
        self.paths.len()
    }

    pub fn is_recording(&self, agent: AgentId) -> bool {
        self.recorders.contains_key(&agent)
    }

    /// Name of the path `agent` is recording.
    pub fn recording_of(&self, agent: AgentId) -> Option<String> {
        self.recorders.get(&agent).map(|entry| entry.value().clone())
    }

    /// The path `agent` is recording, resolved in one consistent step.
    pub fn recording_path_of(&self, agent: AgentId) -> Option<Arc<Path>> {
        let _guard = self.transitions.read();
        let path_name = self.recorders.get(&agent)?.value().clone();
        self.get_path(&path_name)
    }

    pub fn viewers_of(&self, agent: AgentId) -> HashSet<String> {
        self.viewers
            .get(&agent)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Every path, including those being recorded.
    pub fn paths_snapshot(&self) -> HashMap<String, Arc<Path>> {
        let _guard = self.transitions.read();
        self.paths
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect()
    }

    pub fn recorders_snapshot(&self) -> HashMap<AgentId, String> {
        let _guard = self.transitions.read();
        self.recorders
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect()
    }

    /// Copy of every viewer set, taken in one consistent step.
    pub fn viewers_snapshot(&self) -> HashMap<AgentId, HashSet<String>> {
        let _guard = self.transitions.read();
        self.viewers
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect()
    }

    /// Paths with no recorder, ordered by name.
    pub fn completed_paths(&self) -> Vec<Arc<Path>> {
        let _guard = self.transitions.read();
        let recording: HashSet<String> =
            self.recorders.iter().map(|entry| entry.value().clone()).collect();
        let mut completed: Vec<Arc<Path>> = self
            .paths
            .iter()
            .filter(|entry| !recording.contains(entry.key()))
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        completed.sort_by(|a, b| a.name().cmp(b.name()));
        completed
    }

    pub fn is_completed(&self, path_name: &str) -> bool {
        let _guard = self.transitions.read();
        self.paths.contains_key(path_name) && !self.is_being_recorded(path_name)
    }

    pub fn path_summary(&self, path_name: &str) -> Option<PathSummary> {
        let _guard = self.transitions.read();
        let path = self.get_path(path_name)?;
        Some(self.summarize(&path))
    }

    /// Summaries of every path, ordered by name.
    pub fn list_paths(&self) -> Vec<PathSummary> {
        let _guard = self.transitions.read();
        let mut summaries: Vec<PathSummary> = self
            .paths
            .iter()
            .map(|entry| self.summarize(entry.value()))
            .collect();
        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        summaries
    }

    fn summarize(&self, path: &Path) -> PathSummary {
        let status = if self.is_being_recorded(path.name()) {
            PathStatus::Recording
        } else {
            PathStatus::Completed
        };
        let viewer_count = self
            .viewers
            .iter()
            .filter(|entry| entry.value().contains(path.name()))
            .count();
        PathSummary {
            name: path.name().to_string(),
            description: path.description().to_string(),
            point_count: path.point_count(),
            detection_radius: path.detection_radius(),
            display_effect: path.display_effect(),
            max_points: path.max_points(),
            status,
            viewer_count,
            created_by: path.created_by().to_string(),
            created_at: path.created_at(),
        }
    }

    fn is_being_recorded(&self, path_name: &str) -> bool {
        self.recorders.iter().any(|entry| entry.value() == path_name)
    }

    /// Simulates a viewer entry left behind by a removal racing a show.
    #[cfg(test)]
    pub(crate) fn insert_stale_viewer(&self, agent: AgentId, path_name: &str) {
        self.viewers.entry(agent).or_default().insert(path_name.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> PathRegistry {
        PathRegistry::new(&TrackerSettings::default())
    }

    fn point(x: f64) -> SpatialPoint {
        SpatialPoint::new("overworld", x, 64.0, 0.0)
    }

    #[test]
    fn test_start_recording_creates_path_and_recorder() {
        let registry = registry();
        let agent = AgentId::new();
        let path = registry.start_recording(agent, "alex", "river walk").unwrap();

        assert_eq!(path.name(), "river walk");
        assert_eq!(path.created_by(), "alex");
        assert_eq!(registry.recording_of(agent), Some("river walk".to_string()));
        assert!(registry.contains_path("river walk"));
        assert!(!registry.is_completed("river walk"));
    }

    #[test]
    fn test_second_recording_by_same_agent_fails() {
        let registry = registry();
        let agent = AgentId::new();
        registry.start_recording(agent, "alex", "n").unwrap();
        assert_eq!(
            registry.start_recording(agent, "alex", "m").unwrap_err(),
            RegistryError::AlreadyRecording
        );
        assert!(!registry.contains_path("m"));
    }

    #[test]
    fn test_name_taken_by_other_agent() {
        let registry = registry();
        registry.start_recording(AgentId::new(), "alex", "n").unwrap();
        assert_eq!(
            registry.start_recording(AgentId::new(), "sam", "n").unwrap_err(),
            RegistryError::NameTaken("n".to_string())
        );
    }

    #[test]
    fn test_invalid_names_rejected() {
        let registry = registry();
        let agent = AgentId::new();
        for name in ["", "   ", "bad/name", "semi;colon", &"x".repeat(33)] {
            assert!(
                matches!(
                    registry.start_recording(agent, "alex", name),
                    Err(RegistryError::InvalidName(_))
                ),
                "{name:?} should be rejected"
            );
        }
        assert!(registry.start_recording(agent, "alex", "North_trail-2 b").is_ok());
    }

    #[test]
    fn test_stop_recording_completes_path() {
        let registry = registry();
        let agent = AgentId::new();
        registry.start_recording(agent, "alex", "n").unwrap();
        registry.record_point(agent, point(1.0));

        assert_eq!(registry.stop_recording(agent).unwrap(), "n");
        assert!(registry.is_completed("n"));
        assert_eq!(registry.get_path("n").unwrap().point_count(), 1);
        assert_eq!(registry.stop_recording(agent).unwrap_err(), RegistryError::NotRecording);
    }

    #[test]
    fn test_points_are_not_recorded_after_stop() {
        let registry = registry();
        let agent = AgentId::new();
        registry.start_recording(agent, "alex", "n").unwrap();
        registry.stop_recording(agent).unwrap();
        assert_eq!(registry.record_point(agent, point(1.0)), None);
        assert_eq!(registry.get_path("n").unwrap().point_count(), 0);
    }

    #[test]
    fn test_remove_while_recording_is_rejected() {
        let registry = registry();
        let agent = AgentId::new();
        registry.start_recording(agent, "alex", "n").unwrap();
        registry.record_point(agent, point(1.0));
        registry.record_point(agent, point(2.0));

        assert_eq!(
            registry.remove_path("n").unwrap_err(),
            RegistryError::InUse("n".to_string())
        );
        let path = registry.get_path("n").unwrap();
        assert_eq!(path.point_count(), 2);
        assert_eq!(registry.recording_of(agent), Some("n".to_string()));
    }

    #[test]
    fn test_remove_prunes_viewer_sets() {
        let registry = registry();
        let recorder = AgentId::new();
        let viewer = AgentId::new();
        registry.start_recording(recorder, "alex", "a").unwrap();
        registry.stop_recording(recorder).unwrap();
        registry.start_recording(recorder, "alex", "b").unwrap();
        registry.stop_recording(recorder).unwrap();
        registry.show_path(viewer, "a").unwrap();
        registry.show_path(recorder, "a").unwrap();
        registry.show_path(recorder, "b").unwrap();

        registry.remove_path("a").unwrap();

        assert!(!registry.contains_path("a"));
        let viewers = registry.viewers_snapshot();
        assert!(!viewers.contains_key(&viewer));
        assert_eq!(viewers.get(&recorder).unwrap().len(), 1);
        assert_eq!(
            registry.remove_path("a").unwrap_err(),
            RegistryError::NotFound("a".to_string())
        );
    }

    #[test]
    fn test_show_and_hide() {
        let registry = registry();
        let agent = AgentId::new();
        registry.start_recording(agent, "alex", "n").unwrap();
        assert_eq!(
            registry.show_path(agent, "n").unwrap_err(),
            RegistryError::Recording("n".to_string())
        );
        registry.stop_recording(agent).unwrap();

        assert_eq!(
            registry.show_path(agent, "missing").unwrap_err(),
            RegistryError::NotFound("missing".to_string())
        );
        registry.show_path(agent, "n").unwrap();
        assert_eq!(
            registry.show_path(agent, "n").unwrap_err(),
            RegistryError::AlreadyShown("n".to_string())
        );
        assert!(registry.viewers_of(agent).contains("n"));

        registry.hide_path(agent, "n").unwrap();
        assert!(registry.viewers_snapshot().is_empty());
    }

    #[test]
    fn test_hide_without_viewer_entry() {
        let registry = registry();
        let agent = AgentId::new();
        assert_eq!(
            registry.hide_path(agent, "n").unwrap_err(),
            RegistryError::NotShown("n".to_string())
        );
    }

    #[test]
    fn test_hide_path_not_in_set() {
        let registry = registry();
        let agent = AgentId::new();
        registry.start_recording(agent, "alex", "a").unwrap();
        registry.stop_recording(agent).unwrap();
        registry.show_path(agent, "a").unwrap();
        assert_eq!(
            registry.hide_path(agent, "b").unwrap_err(),
            RegistryError::NotShown("b".to_string())
        );
        assert!(registry.viewers_of(agent).contains("a"));
    }

    #[test]
    fn test_snapshots_are_detached() {
        let registry = registry();
        let agent = AgentId::new();
        registry.start_recording(agent, "alex", "a").unwrap();
        registry.stop_recording(agent).unwrap();
        registry.show_path(agent, "a").unwrap();

        let mut viewers = registry.viewers_snapshot();
        viewers.get_mut(&agent).unwrap().clear();
        let mut paths = registry.paths_snapshot();
        paths.clear();

        assert!(registry.viewers_of(agent).contains("a"));
        assert!(registry.contains_path("a"));
    }

    #[test]
    fn test_completed_paths_excludes_recording() {
        let registry = registry();
        let a = AgentId::new();
        let b = AgentId::new();
        registry.start_recording(a, "alex", "zeta").unwrap();
        registry.stop_recording(a).unwrap();
        registry.start_recording(a, "alex", "alpha").unwrap();
        registry.stop_recording(a).unwrap();
        registry.start_recording(b, "sam", "live").unwrap();

        let names: Vec<String> = registry
            .completed_paths()
            .iter()
            .map(|path| path.name().to_string())
            .collect();
        assert_eq!(names, vec!["alpha".to_string(), "zeta".to_string()]);
    }

    #[test]
    fn test_modification_rules() {
        let registry = registry();
        let agent = AgentId::new();
        registry.start_recording(agent, "alex", "n").unwrap();

        registry.describe_path("n", "along the river").unwrap();
        assert_eq!(
            registry.set_detection_radius("n", 4.0).unwrap_err(),
            RegistryError::Recording("n".to_string())
        );
        assert_eq!(
            registry.set_display_effect("n", "flame").unwrap_err(),
            RegistryError::Recording("n".to_string())
        );
        registry.set_max_points("n", 10).unwrap();

        registry.stop_recording(agent).unwrap();
        registry.set_detection_radius("n", 4.0).unwrap();
        assert!(matches!(
            registry.set_detection_radius("n", -1.0),
            Err(RegistryError::InvalidValue(_))
        ));
        assert_eq!(
            registry.set_display_effect("n", "flame").unwrap(),
            (DisplayEffect::Flame, false)
        );
        assert_eq!(
            registry.set_display_effect("n", "block").unwrap(),
            (DisplayEffect::DEFAULT, true)
        );

        let summary = registry.path_summary("n").unwrap();
        assert_eq!(summary.description, "along the river");
        assert_eq!(summary.detection_radius, 4.0);
        assert_eq!(summary.display_effect, DisplayEffect::DEFAULT);
        assert_eq!(summary.max_points, 10);
        assert_eq!(summary.status, PathStatus::Completed);
        assert_eq!(
            registry.describe_path("missing", "x").unwrap_err(),
            RegistryError::NotFound("missing".to_string())
        );
    }

    #[test]
    fn test_cap_change_applies_to_running_recording() {
        let registry = registry();
        let agent = AgentId::new();
        registry.start_recording(agent, "alex", "n").unwrap();
        registry.record_point(agent, point(1.0));
        registry.set_max_points("n", 2).unwrap();
        registry.record_point(agent, point(2.0));
        assert_eq!(registry.record_point(agent, point(3.0)), Some(AppendOutcome::Full));
        assert_eq!(registry.get_path("n").unwrap().point_count(), 2);
    }

    #[test]
    fn test_summary_counts_viewers() {
        let registry = registry();
        let agent = AgentId::new();
        registry.start_recording(agent, "alex", "n").unwrap();
        registry.stop_recording(agent).unwrap();
        registry.show_path(agent, "n").unwrap();
        registry.show_path(AgentId::new(), "n").unwrap();
        assert_eq!(registry.path_summary("n").unwrap().viewer_count, 2);
        assert_eq!(registry.list_paths().len(), 1);
    }

    #[test]
    fn test_load_paths_keeps_recording_paths() {
        let registry = registry();
        let agent = AgentId::new();
        registry.start_recording(agent, "alex", "live").unwrap();

        let mut loaded = HashMap::new();
        loaded.insert("old".to_string(), Path::new("old", "sam"));
        loaded.insert("live".to_string(), Path::new("live", "sam"));
        assert_eq!(registry.load_paths(loaded), 1);

        assert!(registry.contains_path("old"));
        assert_eq!(registry.get_path("live").unwrap().created_by(), "alex");
    }

    #[test]
    fn test_prune_viewer_only_drops_missing_paths() {
        let registry = registry();
        let agent = AgentId::new();
        registry.start_recording(agent, "alex", "n").unwrap();
        registry.stop_recording(agent).unwrap();
        registry.show_path(agent, "n").unwrap();

        assert!(!registry.prune_viewer(agent, "n"));
        registry.insert_stale_viewer(agent, "ghost");
        assert!(registry.prune_viewer(agent, "ghost"));
        assert_eq!(registry.viewers_of(agent).len(), 1);
    }

    #[test]
    fn test_concurrent_start_with_same_name_has_single_winner() {
        let registry = Arc::new(registry());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    registry.start_recording(AgentId::new(), "racer", "contested").is_ok()
                })
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(winners, 1);
        assert_eq!(registry.path_count(), 1);
        let recorders = registry.recorders_snapshot();
        assert_eq!(recorders.values().filter(|name| *name == "contested").count(), 1);
    }
}
