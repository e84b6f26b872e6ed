//! Error types for the trail tracker core

use std::{io::Error as IoError, path::PathBuf};
use thiserror::Error;

use crate::effect::DisplayEffect;

/// Expected, user-facing outcomes of registry operations.
///
/// None of these are faults: every variant describes a request that the
/// in-memory state cannot satisfy right now. The display strings are the
/// messages shown to the requesting agent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("You are already recording a path.")]
    AlreadyRecording,

    #[error("You are not recording any path.")]
    NotRecording,

    #[error("A path named '{0}' already exists.")]
    NameTaken(String),

    #[error("Invalid path name: {0}")]
    InvalidName(String),

    #[error("There is no path named '{0}'.")]
    NotFound(String),

    #[error("Path '{0}' is being recorded. Stop recording before removing it.")]
    InUse(String),

    #[error("You are already viewing path '{0}'.")]
    AlreadyShown(String),

    #[error("You are not viewing a path named '{0}'.")]
    NotShown(String),

    #[error("Path '{0}' is still being recorded. Stop recording first.")]
    Recording(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

/// Path persistence errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to create directory {0}: {1}")]
    DirectoryCreate(PathBuf, IoError),

    #[error("Failed to read directory {0}: {1}")]
    DirectoryRead(PathBuf, IoError),

    #[error("Failed to read file {0}: {1}")]
    FileRead(PathBuf, IoError),

    #[error("Failed to create file {0}: {1}")]
    FileCreate(PathBuf, IoError),

    #[error("Failed to write to file {0}: {1}")]
    FileWrite(PathBuf, IoError),

    #[error("Failed to sync file {0}: {1}")]
    FileSync(PathBuf, IoError),

    #[error("Failed to rename file from {0} to {1}: {2}")]
    FileRename(PathBuf, PathBuf, IoError),

    #[error("Failed to serialize path '{0}': {1}")]
    Serialization(String, serde_json::Error),

    #[error("Failed to deserialize file {0}: {1}")]
    Deserialization(PathBuf, serde_json::Error),

    #[error("Path file {0} has no name")]
    MissingName(PathBuf),
}

/// Rejection reported by the host's render primitive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("Display effect {0} is not supported by the renderer")]
    UnsupportedEffect(DisplayEffect),

    #[error("Agent is no longer reachable")]
    AgentGone,
}

/// Uniform success-flag-plus-message form of a registry outcome, for
/// command fronts that only relay text back to the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub success: bool,
    pub message: String,
}

impl Outcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

impl<T> From<RegistryResult<T>> for Outcome {
    fn from(result: RegistryResult<T>) -> Self {
        match result {
            Ok(_) => Outcome::ok("Success"),
            Err(e) => Outcome::failed(e.to_string()),
        }
    }
}

pub type RegistryResult<T> = Result<T, RegistryError>;
pub type StorageResult<T> = Result<T, StorageError>;
