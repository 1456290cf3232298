//! Trajectory recorder implementation

use crate::error::{Result, TrajectoryError};
use crate::trajectory::{EntryType, TrajectoryEntry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;

/// Records agent runs for debugging and analysis
pub struct TrajectoryRecorder {
    entries: RwLock<Vec<TrajectoryEntry>>,
    file_path: Option<PathBuf>,
}

/// Complete trajectory data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trajectory {
    /// Metadata about the trajectory
    pub metadata: TrajectoryMetadata,

    /// All trajectory entries
    pub entries: Vec<TrajectoryEntry>,
}

/// Metadata for a trajectory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrajectoryMetadata {
    /// Task id of the recorded run
    pub task_id: Option<String>,

    /// When the first entry was recorded
    pub started_at: DateTime<Utc>,

    /// When the last entry was recorded
    pub completed_at: Option<DateTime<Utc>>,

    /// Question the run answered
    pub input: Option<String>,

    /// Final answer, once the run completed
    pub answer: Option<String>,

    /// Whether the run ended with an answer
    pub success: Option<bool>,

    /// Number of recorded entries
    pub total_entries: usize,

    /// Total duration in milliseconds
    pub duration_ms: Option<u64>,
}

impl TrajectoryRecorder {
    /// Create an in-memory recorder
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            file_path: None,
        }
    }

    /// Create a recorder that rewrites `path` after every entry
    pub fn with_file<P: AsRef<Path>>(path: P) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            file_path: Some(path.as_ref().to_path_buf()),
        }
    }

    /// Record a trajectory entry
    pub async fn record(&self, entry: TrajectoryEntry) -> Result<()> {
        self.entries.write().await.push(entry);
        self.save().await
    }

    /// Get all recorded entries
    pub async fn get_entries(&self) -> Vec<TrajectoryEntry> {
        self.entries.read().await.clone()
    }

    /// Save the trajectory to file, if one was configured
    pub async fn save(&self) -> Result<()> {
        let Some(path) = &self.file_path else {
            return Ok(());
        };

        let trajectory = self.build_trajectory().await;
        let json = serde_json::to_string_pretty(&trajectory).map_err(|e| {
            TrajectoryError::RecordingFailed {
                message: format!("Failed to serialize trajectory: {}", e),
            }
        })?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, json).await?;
        Ok(())
    }

    /// Load a trajectory from file
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Trajectory> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .await
            .map_err(|_| TrajectoryError::LoadFailed {
                path: path.to_string_lossy().to_string(),
            })?;
        Ok(serde_json::from_str(&content)?)
    }

    async fn build_trajectory(&self) -> Trajectory {
        let entries = self.entries.read().await.clone();

        let started_at = entries
            .first()
            .map(|e| e.timestamp)
            .unwrap_or_else(Utc::now);
        let completed_at = entries.last().map(|e| e.timestamp);
        let duration_ms = completed_at.map(|end| (end - started_at).num_milliseconds() as u64);

        let mut task_id = None;
        let mut input = None;
        let mut answer = None;
        let mut success = None;
        for entry in &entries {
            match &entry.entry_type {
                EntryType::TaskStart {
                    task_id: id,
                    input: question,
                    ..
                } => {
                    task_id = Some(id.clone());
                    input = Some(question.clone());
                }
                EntryType::TaskComplete {
                    success: s,
                    answer: a,
                    ..
                } => {
                    success = Some(*s);
                    answer = Some(a.clone());
                }
                _ => {}
            }
        }

        Trajectory {
            metadata: TrajectoryMetadata {
                task_id,
                started_at,
                completed_at,
                input,
                answer,
                success,
                total_entries: entries.len(),
                duration_ms,
            },
            entries,
        }
    }

    /// Get the file path if set
    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }
}

impl Default for TrajectoryRecorder {
    fn default() -> Self {
        Self::new()
    }
}
