//! Path data model.
//!
//! A [`Path`] is a named, ordered list of [`SpatialPoint`]s plus metadata.
//! Points live in a [`PointTrail`]: an append-only log whose readers take a
//! wait-free snapshot and never block the single recording writer.
//!
//! The trail is chunked. Full chunks are sealed into shared immutable slices
//! and only the open tail is copied on append, so appending stays cheap on
//! long paths while every published [`PointsSnapshot`] remains immutable.

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;

use crate::effect::DisplayEffect;
use crate::types::SpatialPoint;

/// Version written into every saved path file.
pub const PATH_FORMAT_VERSION: u32 = 1;

/// Detection radius of a path nobody configured.
pub const DEFAULT_DETECTION_RADIUS: f64 = 3.0;

const CHUNK_LEN: usize = 256;

/// Immutable, point-in-time view of a trail.
#[derive(Debug, Clone, Default)]
pub struct PointsSnapshot {
    sealed: Arc<Vec<Arc<[SpatialPoint]>>>,
    tail: Arc<Vec<SpatialPoint>>,
    len: usize,
}

impl PointsSnapshot {
    pub fn from_points(points: Vec<SpatialPoint>) -> Self {
        let len = points.len();
        let mut sealed = Vec::with_capacity(len / CHUNK_LEN);
        let mut chunks = points.chunks_exact(CHUNK_LEN);
        for chunk in &mut chunks {
            sealed.push(Arc::<[SpatialPoint]>::from(chunk.to_vec()));
        }
        let tail = chunks.remainder().to_vec();
        Self {
            sealed: Arc::new(sealed),
            tail: Arc::new(tail),
            len,
        }
    }

    /// Number of points in the snapshot.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn last(&self) -> Option<&SpatialPoint> {
        self.tail
            .last()
            .or_else(|| self.sealed.last().and_then(|chunk| chunk.last()))
    }

    /// Points in recording order.
    pub fn iter(&self) -> impl Iterator<Item = &SpatialPoint> + '_ {
        self.sealed
            .iter()
            .flat_map(|chunk| chunk.iter())
            .chain(self.tail.iter())
    }

    pub fn to_vec(&self) -> Vec<SpatialPoint> {
        self.iter().cloned().collect()
    }

    /// A new snapshot with `point` appended; `self` is left untouched.
    fn with_point(&self, point: SpatialPoint) -> Self {
        let mut tail = Vec::with_capacity(self.tail.len() + 1);
        tail.extend(self.tail.iter().cloned());
        tail.push(point);

        if tail.len() == CHUNK_LEN {
            let mut sealed = Vec::with_capacity(self.sealed.len() + 1);
            sealed.extend(self.sealed.iter().cloned());
            sealed.push(Arc::<[SpatialPoint]>::from(tail));
            Self {
                sealed: Arc::new(sealed),
                tail: Arc::new(Vec::new()),
                len: self.len + 1,
            }
        } else {
            Self {
                sealed: Arc::clone(&self.sealed),
                tail: Arc::new(tail),
                len: self.len + 1,
            }
        }
    }
}

/// Result of offering a point to a trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Appended,
    /// Identical to the last recorded point
    Duplicate,
    /// The trail already holds `max_points` points
    Full,
}

/// Append-only point log with lock-free readers.
#[derive(Debug)]
pub struct PointTrail {
    current: ArcSwap<PointsSnapshot>,
    writer: Mutex<()>,
}

impl PointTrail {
    pub fn new() -> Self {
        Self::from_snapshot(PointsSnapshot::default())
    }

    pub fn from_snapshot(snapshot: PointsSnapshot) -> Self {
        Self {
            current: ArcSwap::from_pointee(snapshot),
            writer: Mutex::new(()),
        }
    }

    pub fn snapshot(&self) -> Arc<PointsSnapshot> {
        self.current.load_full()
    }

    pub fn len(&self) -> usize {
        self.current.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends `point` unless it repeats the last point or the trail is at
    /// `max_points` (0 means no cap).
    pub fn push(&self, point: SpatialPoint, max_points: usize) -> AppendOutcome {
        let _writer = self.writer.lock();
        let current = self.current.load_full();

        if current.last() == Some(&point) {
            return AppendOutcome::Duplicate;
        }
        if max_points > 0 && current.len() >= max_points {
            return AppendOutcome::Full;
        }

        self.current.store(Arc::new(current.with_point(point)));
        AppendOutcome::Appended
    }
}

impl Default for PointTrail {
    fn default() -> Self {
        Self::new()
    }
}

/// A named trajectory and its metadata.
///
/// The name never changes. The remaining metadata is changed by building a
/// revised copy with [`Path::clone`] and the setters, then publishing the
/// copy in the registry; the copy shares the point chunks of the original.
#[derive(Debug)]
pub struct Path {
    name: String,
    description: String,
    detection_radius: f64,
    created_by: String,
    created_at: DateTime<Utc>,
    max_points: usize,
    display_effect: DisplayEffect,
    format_version: u32,
    trail: PointTrail,
}

impl Path {
    /// Creates an empty path stamped with the current time, using
    /// [`DEFAULT_DETECTION_RADIUS`], no point cap and the default effect.
    pub fn new(name: impl Into<String>, created_by: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            detection_radius: DEFAULT_DETECTION_RADIUS,
            created_by: created_by.into(),
            created_at: Utc::now(),
            max_points: 0,
            display_effect: DisplayEffect::DEFAULT,
            format_version: PATH_FORMAT_VERSION,
            trail: PointTrail::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_detection_radius(mut self, radius: f64) -> Self {
        self.detection_radius = radius;
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn with_max_points(mut self, max_points: usize) -> Self {
        self.max_points = max_points;
        self
    }

    pub fn with_display_effect(mut self, effect: DisplayEffect) -> Self {
        self.display_effect = effect;
        self
    }

    pub fn with_format_version(mut self, version: u32) -> Self {
        self.format_version = version;
        self
    }

    pub fn with_points(mut self, points: Vec<SpatialPoint>) -> Self {
        self.trail = PointTrail::from_snapshot(PointsSnapshot::from_points(points));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn detection_radius(&self) -> f64 {
        self.detection_radius
    }

    pub fn created_by(&self) -> &str {
        &self.created_by
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn max_points(&self) -> usize {
        self.max_points
    }

    pub fn display_effect(&self) -> DisplayEffect {
        self.display_effect
    }

    pub fn format_version(&self) -> u32 {
        self.format_version
    }

    /// Current points. The snapshot stays valid while recording continues.
    pub fn points(&self) -> Arc<PointsSnapshot> {
        self.trail.snapshot()
    }

    pub fn point_count(&self) -> usize {
        self.trail.len()
    }

    /// Offers a recorded point, honouring the stillness filter and the cap.
    pub fn append_point(&self, point: SpatialPoint) -> AppendOutcome {
        self.trail.push(point, self.max_points)
    }

    /// Whether `position` lies within the detection radius of any point.
    pub fn is_near(&self, position: &SpatialPoint) -> bool {
        let radius = self.detection_radius;
        self.points()
            .iter()
            .any(|point| matches!(point.distance(position), Some(d) if d <= radius))
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn set_detection_radius(&mut self, radius: f64) {
        self.detection_radius = radius;
    }

    pub fn set_display_effect(&mut self, effect: DisplayEffect) {
        self.display_effect = effect;
    }

    pub fn set_max_points(&mut self, max_points: usize) {
        self.max_points = max_points;
    }
}

impl Clone for Path {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            description: self.description.clone(),
            detection_radius: self.detection_radius,
            created_by: self.created_by.clone(),
            created_at: self.created_at,
            max_points: self.max_points,
            display_effect: self.display_effect,
            format_version: self.format_version,
            trail: PointTrail::from_snapshot((*self.trail.snapshot()).clone()),
        }
    }
}
