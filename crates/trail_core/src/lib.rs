//! TrailTracker core - recorded paths in a live world
//!
//! Agents record named paths as ordered point sequences while they move,
//! and other agents can have completed paths drawn for them. Provides:
//! - A concurrent registry of paths, recorders and viewers
//! - Movement-driven recording with stillness filter, throttle and point cap
//! - Proximity notifications with a debounce state machine
//! - A periodic render loop with display-effect fallback
//! - JSON persistence with lenient loading
//! - A read-only API over completed paths
//!
//! The host world is reached only through the traits in [`host`]. Wire
//! everything together with [`TrailService`].

pub mod api;
pub mod effect;
pub mod error;
pub mod host;
pub mod path;
pub mod proximity;
pub mod recording;
pub mod registry;
pub mod render;
pub mod service;
pub mod settings;
pub mod storage;
pub mod types;

pub use api::{PathInfo, TrailApi};
pub use effect::{resolve_display_effect, DisplayEffect};
pub use error::{Outcome, RegistryError, RegistryResult, RenderError, StorageError, StorageResult};
pub use host::{AgentMessenger, AgentRoster, EffectRenderer, WorldHost};
pub use path::{
    AppendOutcome, Path, PointsSnapshot, DEFAULT_DETECTION_RADIUS, PATH_FORMAT_VERSION,
};
pub use proximity::{Notification, NotificationKind, ProximityNotifier};
pub use recording::{RecordingService, SampleOutcome};
pub use registry::{validate_path_name, PathRegistry, PathStatus, PathSummary};
pub use render::{RenderScheduler, RenderStats};
pub use service::{MovementOutcome, TrailService};
pub use settings::TrackerSettings;
pub use storage::{JsonPathStorage, LoadReport, PathRecord, PathStorage, SaveReport};
pub use types::{AgentId, MovementSample, SpatialPoint};
