//! The tracker service: owns the registry and every component built on it,
//! and drives their lifecycle.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::api::TrailApi;
use crate::error::StorageResult;
use crate::host::WorldHost;
use crate::proximity::{Notification, ProximityNotifier};
use crate::recording::{RecordingService, SampleOutcome};
use crate::registry::PathRegistry;
use crate::render::RenderScheduler;
use crate::settings::TrackerSettings;
use crate::storage::{PathStorage, SaveReport};
use crate::types::{AgentId, MovementSample, SpatialPoint};

/// What a single movement sample caused.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MovementOutcome {
    /// Set when the agent is recording
    pub sample: Option<SampleOutcome>,
    /// Set when a notification was sent
    pub notification: Option<Notification>,
}

/// The tracker as one unit: registry, recorder, notifier and render loop,
/// wired to a host and a store.
///
/// # Lifecycle
///
/// 1. [`new`](Self::new) builds the components; nothing runs yet.
/// 2. [`start`](Self::start) loads stored paths and spawns the render task.
/// 3. The host feeds [`on_movement`](Self::on_movement) and
///    [`on_agent_disconnect`](Self::on_agent_disconnect).
/// 4. [`shutdown`](Self::shutdown) stops rendering and saves every path.
pub struct TrailService {
    settings: TrackerSettings,
    registry: Arc<PathRegistry>,
    recorder: RecordingService,
    notifier: ProximityNotifier,
    scheduler: Arc<RenderScheduler>,
    host: Arc<dyn WorldHost>,
    storage: Arc<dyn PathStorage>,
    /// Channel for coordinating scheduler shutdown
    shutdown_sender: broadcast::Sender<()>,
    render_task: Mutex<Option<JoinHandle<u64>>>,
}

impl TrailService {
    /// Wires the components together.
    ///
    /// # Arguments
    ///
    /// * `settings` - Tunables, assumed already validated
    /// * `host` - The world the tracker draws into and messages through
    /// * `storage` - Where paths are loaded from and saved to
    pub fn new(
        settings: TrackerSettings,
        host: Arc<dyn WorldHost>,
        storage: Arc<dyn PathStorage>,
    ) -> Self {
        let registry = Arc::new(PathRegistry::new(&settings));
        let recorder = RecordingService::new(Arc::clone(&registry), settings.sample_interval());
        let notifier = ProximityNotifier::new(Arc::clone(&registry), &settings);
        let scheduler = Arc::new(RenderScheduler::new(
            Arc::clone(&registry),
            Arc::clone(&host),
            settings.render_interval(),
        ));
        let (shutdown_sender, _) = broadcast::channel(1);

        Self {
            settings,
            registry,
            recorder,
            notifier,
            scheduler,
            host,
            storage,
            shutdown_sender,
            render_task: Mutex::new(None),
        }
    }

    /// Loads stored paths into the registry and starts the render loop.
    /// Returns the number of paths installed.
    pub async fn start(&self) -> StorageResult<usize> {
        let report = self.storage.load_all().await?;
        if report.errors > 0 {
            warn!("{} path file(s) could not be loaded", report.errors);
        }
        let installed = self.registry.load_paths(report.paths);

        let mut task = self.render_task.lock();
        if task.is_some() {
            warn!("Render scheduler already running");
        } else {
            let shutdown = self.shutdown_sender.subscribe();
            *task = Some(Arc::clone(&self.scheduler).spawn(shutdown));
        }

        info!("🚀 Trail tracker started with {} paths", installed);
        Ok(installed)
    }

    /// Handles an agent moving from `from` to `to`: records a point if the
    /// agent is recording, then runs proximity and delivers any
    /// notification through the host.
    pub fn on_movement(
        &self,
        agent: AgentId,
        agent_name: &str,
        from: &SpatialPoint,
        to: &SpatialPoint,
    ) -> MovementOutcome {
        self.on_movement_at(agent, agent_name, from, to, Instant::now())
    }

    /// [`on_movement`](Self::on_movement) for a sample read from a feed.
    pub fn handle_sample(&self, sample: &MovementSample) -> MovementOutcome {
        self.on_movement(sample.agent_id, &sample.agent_name, &sample.from, &sample.to)
    }

    /// Processes one movement sample against an explicit clock reading.
    /// Samples whose coordinates did not change are ignored.
    pub fn on_movement_at(
        &self,
        agent: AgentId,
        agent_name: &str,
        from: &SpatialPoint,
        to: &SpatialPoint,
        now: Instant,
    ) -> MovementOutcome {
        let mut outcome = MovementOutcome::default();
        if !to.moved_from(from) {
            return outcome;
        }

        if self.registry.is_recording(agent) {
            outcome.sample = Some(self.recorder.record_at(agent, to.clone(), now));
        }

        if let Some(notification) = self.notifier.on_movement_at(agent, to, now) {
            debug!("Notifying {} ({}): {}", agent_name, agent, notification);
            self.host.send_notification(agent, &notification);
            outcome.notification = Some(notification);
        }
        outcome
    }

    /// Purges per-agent throttle and debounce state. Recording and viewer
    /// assignments survive a reconnect.
    pub fn on_agent_disconnect(&self, agent: AgentId) {
        self.recorder.forget(agent);
        self.notifier.forget(agent);
        debug!("Cleared transient state of {}", agent);
    }

    pub fn registry(&self) -> &Arc<PathRegistry> {
        &self.registry
    }

    /// Read-only view of the completed paths.
    pub fn api(&self) -> TrailApi {
        TrailApi::new(Arc::clone(&self.registry))
    }

    pub fn settings(&self) -> &TrackerSettings {
        &self.settings
    }

    /// Writes the current registry through the storage gateway.
    pub async fn save(&self) -> StorageResult<SaveReport> {
        self.storage.save_all(&self.registry.paths_snapshot()).await
    }

    /// Stops the render loop, waits for it to finish its current pass, then
    /// flushes every path to storage.
    pub async fn shutdown(&self) -> StorageResult<SaveReport> {
        info!("🛑 Shutting down trail tracker...");
        let _ = self.shutdown_sender.send(());

        let task = self.render_task.lock().take();
        if let Some(task) = task {
            match task.await {
                Ok(passes) => debug!("Render task finished after {} passes", passes),
                Err(e) => error!("Render task ended abnormally: {}", e),
            }
        }

        let report = self.save().await?;
        info!("✅ Trail tracker stopped, {} paths saved", report.saved);
        Ok(report)
    }
}
