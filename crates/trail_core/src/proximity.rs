//! Proximity detection and notification debounce.
//!
//! Every agent is either idle or on a path. Entering a path (or switching to
//! another one) notifies immediately; staying on the same path only
//! re-notifies once the reminder interval has passed; leaving clears the
//! state silently. Agents that are recording are never scanned and instead
//! get a recording notification on every sample.

use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use crate::registry::PathRegistry;
use crate::settings::TrackerSettings;
use crate::types::{AgentId, SpatialPoint};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    /// The agent is on a completed path
    Traveling,
    /// The agent is recording a path
    Recording,
}

/// A status line addressed to a single agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub path: String,
    pub text: String,
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[derive(Debug, Clone)]
struct OnPath {
    path: String,
    last_notified: Instant,
}

/// Tells agents which path they are walking on.
///
/// An agent entering a completed path's detection radius is notified at
/// once, then reminded while it stays on that path no more often than
/// the reminder interval. Leaving a path is silent. Agents that are
/// recording are told so on every sample instead.
pub struct ProximityNotifier {
    registry: Arc<PathRegistry>,
    /// Agents currently on a path; absent means idle
    states: DashMap<AgentId, OnPath>,
    reminder_interval: Duration,
    travel_message: String,
    recording_message: String,
}

impl ProximityNotifier {
    /// Creates a notifier over `registry`, taking the reminder interval and
    /// message prefixes from `settings`.
    pub fn new(registry: Arc<PathRegistry>, settings: &TrackerSettings) -> Self {
        Self {
            registry,
            states: DashMap::new(),
            reminder_interval: settings.reminder_interval(),
            travel_message: settings.travel_message.clone(),
            recording_message: settings.recording_message.clone(),
        }
    }

    /// Updates the agent's proximity state for its new position.
    ///
    /// # Returns
    ///
    /// The notification to deliver, if one is due.
    pub fn on_movement(&self, agent: AgentId, position: &SpatialPoint) -> Option<Notification> {
        self.on_movement_at(agent, position, Instant::now())
    }

    /// Runs one step of the debounce state machine for `agent`.
    ///
    /// Completed paths are scanned in name order and the first one within
    /// its detection radius wins.
    pub fn on_movement_at(
        &self,
        agent: AgentId,
        position: &SpatialPoint,
        now: Instant,
    ) -> Option<Notification> {
        if let Some(recording) = self.registry.recording_of(agent) {
            return Some(self.notification(NotificationKind::Recording, recording));
        }

        let found = self
            .registry
            .completed_paths()
            .into_iter()
            .find(|path| path.is_near(position))
            .map(|path| path.name().to_string());

        let Some(found) = found else {
            if self.states.remove(&agent).is_some() {
                trace!("{} left its path", agent);
            }
            return None;
        };

        let mut state = self.states.entry(agent).or_insert_with(|| OnPath {
            path: String::new(),
            last_notified: now,
        });

        if state.path == found {
            if now.saturating_duration_since(state.last_notified) < self.reminder_interval {
                return None;
            }
            debug!("🔔 Reminding {} of path '{}'", agent, found);
        } else {
            debug!("🧭 {} entered path '{}'", agent, found);
            state.path = found.clone();
        }
        state.last_notified = now;
        drop(state);

        Some(self.notification(NotificationKind::Traveling, found))
    }

    /// The path `agent` is currently on, if any.
    pub fn current_path(&self, agent: AgentId) -> Option<String> {
        self.states.get(&agent).map(|state| state.path.clone())
    }

    /// Purges debounce state of an agent that left.
    pub fn forget(&self, agent: AgentId) {
        self.states.remove(&agent);
    }

    pub fn tracked_agents(&self) -> usize {
        self.states.len()
    }

    fn notification(&self, kind: NotificationKind, path: String) -> Notification {
        let prefix = match kind {
            NotificationKind::Traveling => &self.travel_message,
            NotificationKind::Recording => &self.recording_message,
        };
        Notification {
            kind,
            text: format!("{prefix}{path}"),
            path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> SpatialPoint {
        SpatialPoint::new("overworld", 0.0, 0.0, 0.0)
    }

    fn completed_path(registry: &PathRegistry, name: &str, points: &[SpatialPoint], radius: f64) {
        let owner = AgentId::new();
        registry.start_recording(owner, "alex", name).unwrap();
        for point in points {
            registry.record_point(owner, point.clone());
        }
        registry.stop_recording(owner).unwrap();
        registry.set_detection_radius(name, radius).unwrap();
    }

    fn setup() -> (Arc<PathRegistry>, ProximityNotifier) {
        let settings = TrackerSettings::default();
        let registry = Arc::new(PathRegistry::new(&settings));
        let notifier = ProximityNotifier::new(Arc::clone(&registry), &settings);
        (registry, notifier)
    }

    #[test]
    fn test_entry_then_debounce_then_reminder() {
        let (registry, notifier) = setup();
        completed_path(&registry, "river", &[origin()], 5.0);
        let agent = AgentId::new();
        let here = SpatialPoint::new("overworld", 3.0, 0.0, 0.0);
        let start = Instant::now();

        let first = notifier.on_movement_at(agent, &here, start).unwrap();
        assert_eq!(first.kind, NotificationKind::Traveling);
        assert_eq!(first.text, "Traveling river");

        assert_eq!(notifier.on_movement_at(agent, &here, start + Duration::from_millis(1)), None);

        let reminder =
            notifier.on_movement_at(agent, &here, start + Duration::from_millis(30_001));
        assert_eq!(reminder.map(|n| n.path), Some("river".to_string()));
    }

    #[test]
    fn test_leaving_clears_state_without_notification() {
        let (registry, notifier) = setup();
        completed_path(&registry, "river", &[origin()], 5.0);
        let agent = AgentId::new();
        let start = Instant::now();

        notifier.on_movement_at(agent, &origin(), start);
        assert_eq!(notifier.current_path(agent), Some("river".to_string()));

        let far = SpatialPoint::new("overworld", 100.0, 0.0, 0.0);
        assert_eq!(notifier.on_movement_at(agent, &far, start + Duration::from_millis(5)), None);
        assert_eq!(notifier.current_path(agent), None);

        // Coming back counts as a fresh entry.
        assert!(notifier
            .on_movement_at(agent, &origin(), start + Duration::from_millis(10))
            .is_some());
    }

    #[test]
    fn test_switching_paths_notifies_immediately() {
        let (registry, notifier) = setup();
        completed_path(&registry, "east", &[SpatialPoint::new("overworld", 50.0, 0.0, 0.0)], 3.0);
        completed_path(&registry, "west", &[origin()], 3.0);
        let agent = AgentId::new();
        let start = Instant::now();

        notifier.on_movement_at(agent, &origin(), start);
        let switched = notifier
            .on_movement_at(
                agent,
                &SpatialPoint::new("overworld", 49.0, 0.0, 0.0),
                start + Duration::from_millis(2),
            )
            .unwrap();
        assert_eq!(switched.path, "east");
    }

    #[test]
    fn test_overlapping_paths_resolve_by_name() {
        let (registry, notifier) = setup();
        completed_path(&registry, "zulu", &[origin()], 5.0);
        completed_path(&registry, "alpha", &[origin()], 5.0);
        let hit = notifier.on_movement(AgentId::new(), &origin()).unwrap();
        assert_eq!(hit.path, "alpha");
    }

    #[test]
    fn test_other_world_is_never_near() {
        let (registry, notifier) = setup();
        completed_path(&registry, "river", &[origin()], 5.0);
        let nether = SpatialPoint::new("nether", 0.0, 0.0, 0.0);
        assert_eq!(notifier.on_movement(AgentId::new(), &nether), None);
    }

    #[test]
    fn test_recording_agent_always_gets_recording_notification() {
        let (registry, notifier) = setup();
        completed_path(&registry, "river", &[origin()], 5.0);
        let agent = AgentId::new();
        registry.start_recording(agent, "sam", "draft").unwrap();
        let start = Instant::now();

        for step in 0..3 {
            let notification = notifier
                .on_movement_at(agent, &origin(), start + Duration::from_millis(step))
                .unwrap();
            assert_eq!(notification.kind, NotificationKind::Recording);
            assert_eq!(notification.text, "Recording draft");
        }
        assert_eq!(notifier.tracked_agents(), 0);
    }

    #[test]
    fn test_paths_being_recorded_are_not_detected() {
        let (registry, notifier) = setup();
        let owner = AgentId::new();
        registry.start_recording(owner, "sam", "draft").unwrap();
        registry.record_point(owner, origin());
        assert_eq!(notifier.on_movement(AgentId::new(), &origin()), None);
    }

    #[test]
    fn test_forget_purges_state() {
        let (registry, notifier) = setup();
        completed_path(&registry, "river", &[origin()], 5.0);
        let agent = AgentId::new();
        notifier.on_movement(agent, &origin());
        assert_eq!(notifier.tracked_agents(), 1);
        notifier.forget(agent);
        assert_eq!(notifier.tracked_agents(), 0);
    }
}
