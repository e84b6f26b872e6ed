//! Read-only view of completed paths for external consumers.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

use crate::effect::DisplayEffect;
use crate::path::{Path, PointsSnapshot};
use crate::registry::PathRegistry;
use crate::types::SpatialPoint;

/// Immutable snapshot of a completed path.
#[derive(Debug, Clone)]
pub struct PathInfo {
    name: String,
    description: String,
    detection_radius: f64,
    display_effect: DisplayEffect,
    created_by: String,
    created_at: DateTime<Utc>,
    points: Arc<PointsSnapshot>,
}

impl PathInfo {
    fn from_path(path: &Path) -> Self {
        Self {
            name: path.name().to_string(),
            description: path.description().to_string(),
            detection_radius: path.detection_radius(),
            display_effect: path.display_effect(),
            created_by: path.created_by().to_string(),
            created_at: path.created_at(),
            points: path.points(),
        }
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

    pub fn display_effect(&self) -> DisplayEffect {
        self.display_effect
    }

    pub fn created_by(&self) -> &str {
        &self.created_by
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn points(&self) -> impl Iterator<Item = &SpatialPoint> + '_ {
        self.points.iter()
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }
}

/// Query handle over the registry; never mutates it.
#[derive(Clone)]
pub struct TrailApi {
    registry: Arc<PathRegistry>,
}

impl TrailApi {
    pub fn new(registry: Arc<PathRegistry>) -> Self {
        Self { registry }
    }

    /// Paths that exist and have no recorder.
    pub fn completed_paths(&self) -> HashMap<String, PathInfo> {
        self.registry
            .completed_paths()
            .iter()
            .map(|path| (path.name().to_string(), PathInfo::from_path(path)))
            .collect()
    }

    pub fn is_path_completed(&self, name: &str) -> bool {
        self.registry.is_completed(name)
    }

    /// Snapshot of one completed path. `None` while it is being recorded.
    pub fn completed_path(&self, name: &str) -> Option<PathInfo> {
        if !self.registry.is_completed(name) {
            return None;
        }
        self.registry.get_path(name).map(|path| PathInfo::from_path(&path))
    }
}
