//! Periodic render loop.
//!
//! Once per period every online agent gets the points of the path it is
//! recording and of every path in its viewer set, each drawn with that
//! path's own display effect.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, trace};

use crate::effect::DisplayEffect;
use crate::error::RenderError;
use crate::host::WorldHost;
use crate::path::Path;
use crate::registry::PathRegistry;
use crate::types::AgentId;

/// Counters for a single render pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub agents: usize,
    pub paths: usize,
    pub points: usize,
    /// Points drawn with the default effect after a rejection
    pub fallbacks: usize,
    /// Points the host refused even with the default effect
    pub skipped: usize,
    /// Stale viewer entries removed
    pub pruned: usize,
}

/// Draws paths for online agents once per period.
///
/// A pass never fails as a whole: a rejected effect falls back to the
/// default, a point the host still refuses is skipped, and an agent that
/// went away is skipped for the rest of that path.
pub struct RenderScheduler {
    registry: Arc<PathRegistry>,
    host: Arc<dyn WorldHost>,
    period: Duration,
}

impl RenderScheduler {
    /// Creates a scheduler. Nothing runs until [`spawn`](Self::spawn).
    pub fn new(registry: Arc<PathRegistry>, host: Arc<dyn WorldHost>, period: Duration) -> Self {
        Self {
            registry,
            host,
            period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Spawns the render task. It stops after the pass in progress when
    /// `shutdown` fires, returning the number of passes it ran.
    pub fn spawn(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<u64> {
        tokio::spawn(async move {
            let mut ticker = interval(self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut passes: u64 = 0;

            info!("🎨 Render scheduler started ({}ms period)", self.period.as_millis());
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.recv() => break,
                    _ = ticker.tick() => {
                        let stats = self.render_pass();
                        passes += 1;
                        trace!("Render pass {}: {:?}", passes, stats);
                    }
                }
            }
            info!("🎨 Render scheduler stopped after {} passes", passes);
            passes
        })
    }

    /// Renders one frame for every online agent.
    pub fn render_pass(&self) -> RenderStats {
        let mut stats = RenderStats::default();
        let viewers = self.registry.viewers_snapshot();

        for agent in self.host.online_agents() {
            stats.agents += 1;

            if let Some(path) = self.registry.recording_path_of(agent) {
                self.render_path(agent, &path, &mut stats);
            }

            let Some(names) = viewers.get(&agent) else {
                continue;
            };
            let mut names: Vec<&String> = names.iter().collect();
            names.sort();
            for name in names {
                match self.registry.get_path(name) {
                    Some(path) => self.render_path(agent, &path, &mut stats),
                    None => {
                        if self.registry.prune_viewer(agent, name) {
                            stats.pruned += 1;
                        }
                    }
                }
            }
        }
        stats
    }

    fn render_path(&self, agent: AgentId, path: &Path, stats: &mut RenderStats) {
        let points = path.points();
        if points.is_empty() {
            return;
        }
        stats.paths += 1;

        let mut effect = path.display_effect();
        for point in points.iter() {
            match self.host.render_point(agent, point, effect) {
                Ok(()) => {
                    stats.points += 1;
                    if effect != path.display_effect() {
                        stats.fallbacks += 1;
                    }
                }
                Err(RenderError::UnsupportedEffect(rejected)) if effect != DisplayEffect::DEFAULT => {
                    debug!(
                        "Renderer rejected {} for path '{}', using {}",
                        rejected,
                        path.name(),
                        DisplayEffect::DEFAULT
                    );
                    effect = DisplayEffect::DEFAULT;
                    match self.host.render_point(agent, point, effect) {
                        Ok(()) => {
                            stats.points += 1;
                            stats.fallbacks += 1;
                        }
                        Err(e) => {
                            debug!("Skipping point of '{}' for {}: {}", path.name(), agent, e);
                            stats.skipped += 1;
                        }
                    }
                }
                Err(RenderError::AgentGone) => {
                    debug!("{} went away mid-render", agent);
                    return;
                }
                Err(e) => {
                    debug!("Skipping point of '{}' for {}: {}", path.name(), agent, e);
                    stats.skipped += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::testing::RecordingHost;
    use crate::settings::TrackerSettings;
    use crate::types::SpatialPoint;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn at(x: f64) -> SpatialPoint {
        SpatialPoint::new("overworld", x, 64.0, 0.0)
    }

    fn completed(registry: &PathRegistry, name: &str, xs: &[f64]) {
        let owner = AgentId::new();
        registry.start_recording(owner, "alex", name).unwrap();
        for x in xs {
            registry.record_point(owner, at(*x));
        }
        registry.stop_recording(owner).unwrap();
    }

    fn scheduler(host: &Arc<RecordingHost>) -> (Arc<PathRegistry>, RenderScheduler) {
        let registry = Arc::new(PathRegistry::new(&TrackerSettings::default()));
        let scheduler = RenderScheduler::new(
            Arc::clone(&registry),
            Arc::clone(host) as Arc<dyn WorldHost>,
            Duration::from_millis(50),
        );
        (registry, scheduler)
    }

    #[test]
    fn test_renders_recording_and_viewed_paths() {
        let agent = AgentId::new();
        let other = AgentId::new();
        let host = Arc::new(RecordingHost::with_online(&[agent, other]));
        let (registry, scheduler) = scheduler(&host);

        completed(&registry, "viewed", &[1.0, 2.0]);
        registry.set_display_effect("viewed", "flame").unwrap();
        registry.show_path(agent, "viewed").unwrap();
        registry.start_recording(agent, "alex", "draft").unwrap();
        registry.record_point(agent, at(9.0));

        let stats = scheduler.render_pass();

        assert_eq!(stats.agents, 2);
        assert_eq!(stats.points, 3);
        let renders = host.renders_for(agent);
        assert!(renders.contains(&(at(9.0), DisplayEffect::DEFAULT)));
        assert!(renders.contains(&(at(1.0), DisplayEffect::Flame)));
        assert!(host.renders_for(other).is_empty());
    }

    #[test]
    fn test_empty_path_is_a_no_op() {
        let agent = AgentId::new();
        let host = Arc::new(RecordingHost::with_online(&[agent]));
        let (registry, scheduler) = scheduler(&host);
        completed(&registry, "empty", &[]);
        registry.show_path(agent, "empty").unwrap();

        let stats = scheduler.render_pass();
        assert_eq!(stats.paths, 0);
        assert!(host.renders.lock().is_empty());
    }

    #[test]
    fn test_rejected_effect_falls_back_to_default() {
        let agent = AgentId::new();
        let host = Arc::new(RecordingHost::with_online(&[agent]));
        host.reject(DisplayEffect::Flame);
        let (registry, scheduler) = scheduler(&host);
        completed(&registry, "viewed", &[1.0, 2.0, 3.0]);
        registry.set_display_effect("viewed", "flame").unwrap();
        registry.show_path(agent, "viewed").unwrap();

        let stats = scheduler.render_pass();

        assert_eq!(stats.points, 3);
        assert_eq!(stats.fallbacks, 3);
        assert!(host
            .renders_for(agent)
            .iter()
            .all(|(_, effect)| *effect == DisplayEffect::DEFAULT));
    }

    #[test]
    fn test_points_skipped_when_default_also_rejected() {
        let agent = AgentId::new();
        let host = Arc::new(RecordingHost::with_online(&[agent]));
        host.reject(DisplayEffect::DEFAULT);
        let (registry, scheduler) = scheduler(&host);
        completed(&registry, "viewed", &[1.0, 2.0]);
        registry.show_path(agent, "viewed").unwrap();

        let stats = scheduler.render_pass();
        assert_eq!(stats.skipped, 2);
        assert_eq!(stats.points, 0);
    }

    #[test]
    fn test_stale_viewer_entry_is_pruned() {
        let agent = AgentId::new();
        let host = Arc::new(RecordingHost::with_online(&[agent]));
        let (registry, scheduler) = scheduler(&host);
        completed(&registry, "kept", &[1.0]);
        registry.show_path(agent, "kept").unwrap();

        let before = registry.viewers_snapshot();
        registry.insert_stale_viewer(agent, "gone");

        let stats = scheduler.render_pass();
        assert_eq!(stats.points, 1);
        assert_eq!(stats.pruned, 1);
        assert_eq!(registry.viewers_snapshot(), before);
    }

    #[test]
    fn test_departed_agent_does_not_stop_the_pass() {
        let gone = AgentId::new();
        let present = AgentId::new();
        let host = Arc::new(RecordingHost::with_online(&[gone, present]));
        host.mark_gone(gone);
        let (registry, scheduler) = scheduler(&host);
        completed(&registry, "first", &[1.0, 2.0]);
        completed(&registry, "second", &[5.0]);
        for agent in [gone, present] {
            registry.show_path(agent, "first").unwrap();
            registry.show_path(agent, "second").unwrap();
        }

        let stats = scheduler.render_pass();

        assert_eq!(stats.agents, 2);
        assert_eq!(stats.points, 3);
        assert_eq!(stats.skipped, 0);
        assert!(host.renders_for(gone).is_empty());
        assert_eq!(host.renders_for(present).len(), 3);
    }

    #[test]
    fn test_render_survives_concurrent_removal_and_show() {
        const WRITERS: usize = 4;
        const ROUNDS: usize = 150;

        let viewers: Vec<AgentId> = (0..4).map(|_| AgentId::new()).collect();
        let host = Arc::new(RecordingHost::with_online(&viewers));
        let (registry, scheduler) = scheduler(&host);
        let done = AtomicBool::new(false);

        let passes = std::thread::scope(|scope| {
            let renderer = scope.spawn(|| {
                let mut passes = 0u64;
                loop {
                    scheduler.render_pass();
                    passes += 1;
                    if done.load(Ordering::Acquire) {
                        break passes;
                    }
                }
            });

            let writers: Vec<_> = (0..WRITERS)
                .map(|writer| {
                    let registry = &registry;
                    let viewers = &viewers;
                    scope.spawn(move || {
                        let owner = AgentId::new();
                        let mut previous: Option<String> = None;
                        for round in 0..ROUNDS {
                            let name = format!("w{writer} r{round}");
                            registry.start_recording(owner, "alex", &name).unwrap();
                            for step in 0..5 {
                                registry.record_point(owner, at(step as f64));
                            }
                            registry.stop_recording(owner).unwrap();
                            for viewer in viewers {
                                registry.show_path(*viewer, &name).unwrap();
                            }
                            if let Some(old) = previous.replace(name) {
                                registry.remove_path(&old).unwrap();
                            }
                        }
                    })
                })
                .collect();

            for writer in writers {
                writer.join().unwrap();
            }
            done.store(true, Ordering::Release);
            renderer.join().unwrap()
        });

        assert!(passes >= 1);
        assert_eq!(registry.path_count(), WRITERS);
        for (_, names) in registry.viewers_snapshot() {
            for name in names {
                assert!(registry.is_completed(&name), "viewer kept '{name}'");
            }
        }

        let settled = scheduler.render_pass();
        assert_eq!(settled.pruned, 0);
        assert_eq!(settled.points, viewers.len() * WRITERS * 5);
    }

    #[test]
    fn test_offline_agents_are_not_rendered() {
        let agent = AgentId::new();
        let host = Arc::new(RecordingHost::default());
        let (registry, scheduler) = scheduler(&host);
        completed(&registry, "viewed", &[1.0]);
        registry.show_path(agent, "viewed").unwrap();

        assert_eq!(scheduler.render_pass(), RenderStats::default());
    }

    #[tokio::test]
    async fn test_spawned_scheduler_stops_on_shutdown() {
        let agent = AgentId::new();
        let host = Arc::new(RecordingHost::with_online(&[agent]));
        let (registry, scheduler) = scheduler(&host);
        completed(&registry, "viewed", &[1.0]);
        registry.show_path(agent, "viewed").unwrap();

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = Arc::new(scheduler).spawn(shutdown_rx);
        tokio::time::sleep(Duration::from_millis(120)).await;
        shutdown_tx.send(()).unwrap();

        let passes = handle.await.unwrap();
        assert!(passes >= 1);
        assert_eq!(host.renders.lock().len() as u64, passes);
    }
}
