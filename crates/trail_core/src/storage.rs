//! Path persistence: one JSON file per path.
//!
//! Loading is lenient. A file that cannot be parsed is skipped and counted;
//! recoverable problems inside a file (unknown effect, broken points, odd
//! name, newer format) are logged and repaired in place.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;
use tokio::{
    fs as tokio_fs,
    io::{AsyncReadExt, AsyncWriteExt},
};
use tracing::{debug, error, info, instrument, warn};

use crate::effect::{resolve_display_effect, DisplayEffect};
use crate::error::{StorageError, StorageResult};
use crate::path::{Path, DEFAULT_DETECTION_RADIUS, PATH_FORMAT_VERSION};
use crate::registry::validate_path_name;
use crate::types::SpatialPoint;

/// Subfolder that receives files of paths no longer in the registry.
pub const DELETED_DIR: &str = "deleted";

const FILE_EXTENSION: &str = "json";

fn default_version() -> u32 {
    1
}

/// On-disk form of a path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathRecord {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub radius: Option<f64>,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub max_points: usize,
    #[serde(default)]
    pub display_effect: Option<String>,
    /// Kept loose so a single broken point does not reject the file
    #[serde(default)]
    pub points: Vec<serde_json::Value>,
}

impl PathRecord {
    pub fn from_path(path: &Path) -> Self {
        Self {
            version: PATH_FORMAT_VERSION,
            name: path.name().to_string(),
            description: path.description().to_string(),
            radius: Some(path.detection_radius()),
            created_by: path.created_by().to_string(),
            created_at: Some(path.created_at()),
            max_points: path.max_points(),
            display_effect: Some(path.display_effect().as_str().to_string()),
            points: path
                .points()
                .iter()
                .filter_map(|point| serde_json::to_value(point).ok())
                .collect(),
        }
    }

    /// Rebuilds a path, repairing what can be repaired. `source` only
    /// labels log lines. A missing or invalid radius becomes
    /// `default_radius`.
    pub fn into_path(self, source: &FsPath, default_radius: f64) -> StorageResult<Path> {
        if self.name.trim().is_empty() {
            return Err(StorageError::MissingName(source.to_path_buf()));
        }
        if self.version > PATH_FORMAT_VERSION {
            warn!(
                "{} uses format version {}, newer than supported {}",
                source.display(),
                self.version,
                PATH_FORMAT_VERSION
            );
        }
        if let Err(e) = validate_path_name(&self.name, usize::MAX) {
            warn!("{}: path name '{}' is unusual: {}", source.display(), self.name, e);
        }

        let total = self.points.len();
        let points: Vec<SpatialPoint> = self
            .points
            .into_iter()
            .filter_map(|value| serde_json::from_value::<SpatialPoint>(value).ok())
            .filter(SpatialPoint::is_well_formed)
            .collect();
        if points.len() < total {
            warn!(
                "{}: dropped {} obsolete point(s) from path '{}'",
                source.display(),
                total - points.len(),
                self.name
            );
        }

        let effect = match self.display_effect.as_deref() {
            None => DisplayEffect::DEFAULT,
            Some(requested) => {
                let (effect, used_fallback) = resolve_display_effect(requested);
                if used_fallback {
                    warn!(
                        "{}: display effect '{}' is not supported, using {}",
                        source.display(),
                        requested,
                        effect
                    );
                }
                effect
            }
        };

        let mut path = Path::new(self.name, self.created_by)
            .with_description(self.description)
            .with_max_points(self.max_points)
            .with_display_effect(effect)
            .with_format_version(self.version)
            .with_detection_radius(default_radius)
            .with_points(points);
        match self.radius {
            Some(radius) if radius > 0.0 && radius.is_finite() => {
                path = path.with_detection_radius(radius);
            }
            Some(radius) => warn!(
                "{}: invalid radius {} on path '{}', using {}",
                source.display(),
                radius,
                path.name(),
                default_radius
            ),
            None => {}
        }
        if let Some(created_at) = self.created_at {
            path = path.with_created_at(created_at);
        }
        Ok(path)
    }
}

/// Result of loading a directory of path files.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub paths: HashMap<String, Path>,
    pub loaded: usize,
    /// Files skipped because they could not be read or parsed
    pub errors: usize,
}

/// Result of flushing the registry to disk.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SaveReport {
    pub saved: usize,
    pub failed: usize,
    /// Obsolete files moved to the deleted folder
    pub archived: usize,
}

/// Durable store for path definitions.
#[async_trait]
pub trait PathStorage: Send + Sync + std::fmt::Debug {
    /// Load every stored path
    async fn load_all(&self) -> StorageResult<LoadReport>;

    /// Store exactly the given paths, retiring files of any others
    async fn save_all(&self, paths: &HashMap<String, Arc<Path>>) -> StorageResult<SaveReport>;
}

/// Replaces every character outside `[A-Za-z0-9_-]` with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// JSON-file path storage
#[derive(Debug)]
pub struct JsonPathStorage {
    directory: PathBuf,
    default_radius: f64,
}

impl JsonPathStorage {
    /// Creates a store rooted at `directory`. Loaded paths without a usable
    /// radius get the stock default until [`with_default_radius`] says
    /// otherwise.
    ///
    /// [`with_default_radius`]: JsonPathStorage::with_default_radius
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            default_radius: DEFAULT_DETECTION_RADIUS,
        }
    }

    /// Radius given to loaded paths whose own radius is missing or invalid.
    pub fn with_default_radius(mut self, radius: f64) -> Self {
        self.default_radius = radius;
        self
    }

    pub fn default_radius(&self) -> f64 {
        self.default_radius
    }

    /// Folder the path files live in.
    pub fn directory(&self) -> &FsPath {
        &self.directory
    }

    async fn ensure_directory(&self, dir: &FsPath) -> StorageResult<()> {
        tokio_fs::create_dir_all(dir)
            .await
            .map_err(|e| StorageError::DirectoryCreate(dir.to_path_buf(), e))
    }

    /// Stems of the `.json` files currently in the directory.
    async fn existing_files(&self) -> StorageResult<HashMap<String, PathBuf>> {
        let mut files = HashMap::new();
        let mut entries = tokio_fs::read_dir(&self.directory)
            .await
            .map_err(|e| StorageError::DirectoryRead(self.directory.clone(), e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::DirectoryRead(self.directory.clone(), e))?
        {
            let file = entry.path();
            if file.extension().and_then(|s| s.to_str()) != Some(FILE_EXTENSION) {
                continue;
            }
            if let Some(stem) = file.file_stem().and_then(|s| s.to_str()) {
                files.insert(stem.to_string(), file.clone());
            }
        }
        Ok(files)
    }

    #[instrument(skip(self))]
    async fn load_file(&self, file: &FsPath) -> StorageResult<Path> {
        let mut handle = tokio_fs::File::open(file)
            .await
            .map_err(|e| StorageError::FileRead(file.to_path_buf(), e))?;

        let mut contents = String::new();
        handle
            .read_to_string(&mut contents)
            .await
            .map_err(|e| StorageError::FileRead(file.to_path_buf(), e))?;

        let record: PathRecord = serde_json::from_str(&contents)
            .map_err(|e| StorageError::Deserialization(file.to_path_buf(), e))?;
        record.into_path(file, self.default_radius)
    }

    #[instrument(skip(self, path), fields(name = %path.name()))]
    async fn save_file(&self, stem: &str, path: &Path) -> StorageResult<()> {
        let file = self.directory.join(format!("{stem}.{FILE_EXTENSION}"));
        let temp_file = file.with_extension("tmp");

        let json = serde_json::to_string_pretty(&PathRecord::from_path(path))
            .map_err(|e| StorageError::Serialization(path.name().to_string(), e))?;

        let mut handle = tokio_fs::File::create(&temp_file)
            .await
            .map_err(|e| StorageError::FileCreate(temp_file.clone(), e))?;

        handle
            .write_all(json.as_bytes())
            .await
            .map_err(|e| StorageError::FileWrite(temp_file.clone(), e))?;

        handle
            .sync_all()
            .await
            .map_err(|e| StorageError::FileSync(temp_file.clone(), e))?;

        tokio_fs::rename(&temp_file, &file)
            .await
            .map_err(|e| StorageError::FileRename(temp_file, file.clone(), e))?;

        debug!("Saved path '{}' to {}", path.name(), file.display());
        Ok(())
    }

    /// Moves leftover files into the deleted folder.
    async fn archive(&self, leftovers: Vec<PathBuf>) -> StorageResult<usize> {
        if leftovers.is_empty() {
            return Ok(0);
        }
        let deleted_dir = self.directory.join(DELETED_DIR);
        self.ensure_directory(&deleted_dir).await?;

        let mut moved = 0;
        for file in leftovers {
            let Some(file_name) = file.file_name() else {
                continue;
            };
            let target = deleted_dir.join(file_name);
            match tokio_fs::rename(&file, &target).await {
                Ok(()) => moved += 1,
                Err(e) => warn!(
                    "{}",
                    StorageError::FileRename(file.clone(), target.clone(), e)
                ),
            }
        }
        if moved > 0 {
            info!("📦 Moved {} old path file(s) to '{}'", moved, DELETED_DIR);
        }
        Ok(moved)
    }
}

#[async_trait]
impl PathStorage for JsonPathStorage {
    #[instrument(skip(self))]
    async fn load_all(&self) -> StorageResult<LoadReport> {
        let mut report = LoadReport::default();
        if !tokio_fs::try_exists(&self.directory).await.unwrap_or(false) {
            warn!("Path folder {} does not exist, starting empty", self.directory.display());
            self.ensure_directory(&self.directory).await?;
            return Ok(report);
        }

        let mut files: Vec<PathBuf> = self.existing_files().await?.into_values().collect();
        files.sort();

        for file in files {
            match self.load_file(&file).await {
                Ok(path) => {
                    debug!("Loaded path '{}' ({} points)", path.name(), path.point_count());
                    match report.paths.insert(path.name().to_string(), path) {
                        Some(previous) => warn!(
                            "Path '{}' is defined by more than one file, keeping {}",
                            previous.name(),
                            file.display()
                        ),
                        None => report.loaded += 1,
                    }
                }
                Err(e) => {
                    warn!("Skipping {}: {}", file.display(), e);
                    report.errors += 1;
                }
            }
        }

        info!("📂 Loaded {} paths ({} errors)", report.loaded, report.errors);
        Ok(report)
    }

    #[instrument(skip(self, paths), fields(count = paths.len()))]
    async fn save_all(&self, paths: &HashMap<String, Arc<Path>>) -> StorageResult<SaveReport> {
        self.ensure_directory(&self.directory).await?;
        let mut existing = self.existing_files().await?;
        let mut report = SaveReport::default();

        let mut names: Vec<&String> = paths.keys().collect();
        names.sort();

        let mut used: HashSet<String> = HashSet::new();
        for name in names {
            let Some(path) = paths.get(name) else {
                continue;
            };
            let base = sanitize_file_name(name);
            let mut stem = base.clone();
            let mut suffix = 2;
            while used.contains(&stem) {
                stem = format!("{base}_{suffix}");
                suffix += 1;
            }
            used.insert(stem.clone());

            match self.save_file(&stem, path).await {
                Ok(()) => report.saved += 1,
                Err(e) => {
                    error!("Failed to save path '{}': {}", name, e);
                    report.failed += 1;
                }
            }
            existing.remove(&stem);
        }

        report.archived = self.archive(existing.into_values().collect()).await?;
        info!("💾 Saved {} paths to {}", report.saved, self.directory.display());
        Ok(report)
    }
}
