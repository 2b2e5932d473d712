//! Periodic checkpoints with bounded retention
//!
//! Checkpoints live under the run's output directory as
//! `checkpoint-<global step>/`, each holding the runtime's saved weights plus a
//! `trainer_state.json`. After every save, the oldest checkpoints beyond the
//! retention limit are deleted. Retention only counts checkpoints written
//! through the same manager, so directories left by an earlier run in the same
//! output directory are neither pruned nor reported.
//!
//! Resuming is not automatic: [`CheckpointManager::latest`] only reports the
//! newest checkpoint so a caller can choose to load it explicitly.

use crate::error::{MtError, MtResult};
use crate::runtime::ModelRuntime;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const TRAINER_STATE_FILE: &str = "trainer_state.json";

/// Progress recorded alongside saved weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerState {
    pub global_step: u64,
    pub epoch: usize,
    pub learning_rate: f64,
    pub train_loss: f32,
    pub eval_loss: Option<f32>,
}

/// Writes and prunes `checkpoint-<step>` directories
#[derive(Debug, Clone)]
pub struct CheckpointManager {
    dir: PathBuf,
    /// Keep at most this many checkpoints; `None` keeps all
    save_total_limit: Option<usize>,
    /// Checkpoints written by this manager and not yet pruned, oldest first
    saved: Vec<(u64, PathBuf)>,
}

impl CheckpointManager {
    pub fn new(dir: impl Into<PathBuf>, save_total_limit: Option<usize>) -> Self {
        Self {
            dir: dir.into(),
            save_total_limit,
            saved: Vec::new(),
        }
    }

    /// Save `runtime` as the checkpoint for `state.global_step`, then prune
    pub async fn save(
        &mut self,
        runtime: &dyn ModelRuntime,
        state: &TrainerState,
    ) -> MtResult<PathBuf> {
        let path = self.dir.join(format!("checkpoint-{}", state.global_step));
        runtime.save(&path).await?;
        fs::write(path.join(TRAINER_STATE_FILE), serde_json::to_vec_pretty(state)?)?;
        tracing::info!("Saved checkpoint {}", path.display());

        self.saved.retain(|(step, _)| *step != state.global_step);
        self.saved.push((state.global_step, path.clone()));
        self.saved.sort_by_key(|(step, _)| *step);
        self.prune()?;
        Ok(path)
    }

    /// Checkpoints this manager wrote that are still on disk, oldest first
    pub fn saved(&self) -> Vec<PathBuf> {
        self.saved.iter().map(|(_, path)| path.clone()).collect()
    }

    /// Every checkpoint in the directory as `(step, path)`, oldest first
    pub fn list(&self) -> MtResult<Vec<(u64, PathBuf)>> {
        let mut checkpoints = Vec::new();
        if !self.dir.exists() {
            return Ok(checkpoints);
        }

        let re = Regex::new(r"^checkpoint-(\d+)$").unwrap();

        let entries = fs::read_dir(&self.dir).map_err(|e| {
            MtError::Checkpoint(format!("failed to read {}: {}", self.dir.display(), e))
        })?;
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let step = re
                .captures(&name)
                .and_then(|caps| caps[1].parse::<u64>().ok());
            if let Some(step) = step {
                checkpoints.push((step, entry.path()));
            }
        }

        // numeric order: checkpoint-1000 sorts after checkpoint-500
        checkpoints.sort_by_key(|(step, _)| *step);
        Ok(checkpoints)
    }

    /// Newest checkpoint, if any
    pub fn latest(&self) -> MtResult<Option<PathBuf>> {
        Ok(self.list()?.pop().map(|(_, path)| path))
    }

    /// Read the trainer state stored in a checkpoint directory
    pub fn load_state(checkpoint: &Path) -> MtResult<TrainerState> {
        let path = checkpoint.join(TRAINER_STATE_FILE);
        let content = fs::read_to_string(&path).map_err(|e| {
            MtError::Checkpoint(format!("cannot read {}: {}", path.display(), e))
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Delete this manager's oldest checkpoints beyond the retention limit
    pub fn prune(&mut self) -> MtResult<()> {
        let Some(limit) = self.save_total_limit else {
            return Ok(());
        };

        let excess = self.saved.len().saturating_sub(limit);
        for (_, victim) in self.saved.drain(..excess) {
            fs::remove_dir_all(&victim).map_err(|e| {
                MtError::Checkpoint(format!("failed to prune {}: {}", victim.display(), e))
            })?;
            tracing::debug!("Pruned checkpoint {}", victim.display());
        }
        Ok(())
    }
}
