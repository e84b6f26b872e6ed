//! Turns movement samples of recording agents into path points.
//!
//! A sample becomes a point only if it passes the per-agent sampling
//! throttle, differs from the path's last point, and fits under the path's
//! point cap. Dropped samples are normal and never reported as errors.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::trace;

use crate::path::AppendOutcome;
use crate::registry::PathRegistry;
use crate::types::{AgentId, SpatialPoint};

/// What happened to a single movement sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleOutcome {
    Recorded,
    NotRecording,
    /// Arrived within the sampling interval of the last accepted sample
    Throttled,
    /// Equal to the path's last point
    Duplicate,
    /// The path reached its point cap
    Full,
}

/// Turns movement samples of recording agents into path points.
///
/// Each agent has its own throttle: a sample arriving within
/// `sample_interval` of the last *appended* point is dropped. Surviving
/// samples go through the registry, which applies the stillness filter and
/// the point cap.
pub struct RecordingService {
    registry: Arc<PathRegistry>,
    last_sample: DashMap<AgentId, Instant>,
    sample_interval: Duration,
}

impl RecordingService {
    /// Creates a recorder appending to paths in `registry`.
    ///
    /// # Arguments
    ///
    /// * `registry` - Registry holding the paths being recorded
    /// * `sample_interval` - Minimum spacing between appended points of one agent
    pub fn new(registry: Arc<PathRegistry>, sample_interval: Duration) -> Self {
        Self {
            registry,
            last_sample: DashMap::new(),
            sample_interval,
        }
    }

    /// Offers a position sample for the path `agent` is recording.
    ///
    /// # Returns
    ///
    /// What happened to the sample. Dropped samples are not errors.
    pub fn record(&self, agent: AgentId, position: SpatialPoint) -> SampleOutcome {
        self.record_at(agent, position, Instant::now())
    }

    /// Same as [`record`](Self::record) with an explicit clock reading.
    pub fn record_at(&self, agent: AgentId, position: SpatialPoint, now: Instant) -> SampleOutcome {
        if !self.registry.is_recording(agent) {
            return SampleOutcome::NotRecording;
        }

        let last = self.last_sample.get(&agent).map(|entry| *entry.value());
        if let Some(last) = last {
            if now.saturating_duration_since(last) < self.sample_interval {
                trace!("Throttled sample from {}", agent);
                return SampleOutcome::Throttled;
            }
        }

        let outcome = match self.registry.record_point(agent, position) {
            None => SampleOutcome::NotRecording,
            Some(AppendOutcome::Appended) => {
                self.last_sample.insert(agent, now);
                SampleOutcome::Recorded
            }
            Some(AppendOutcome::Duplicate) => SampleOutcome::Duplicate,
            Some(AppendOutcome::Full) => SampleOutcome::Full,
        };
        trace!("Sample from {} -> {:?}", agent, outcome);
        outcome
    }

    /// Drops the throttle timestamp of an agent that left.
    pub fn forget(&self, agent: AgentId) {
        self.last_sample.remove(&agent);
    }

    /// Number of agents with a throttle timestamp.
    pub fn tracked_agents(&self) -> usize {
        self.last_sample.len()
    }
}
