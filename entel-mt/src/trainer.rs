//! Fine-tuning orchestration
//!
//! Drives one training run end to end over prepared data:
//!
//! 1. tokenize every partition of every [`DirectedDataset`] (truncating to
//!    `max_sequence_length`)
//! 2. for each epoch, shuffle the training pairs with a per-epoch seed and
//!    batch them
//! 3. apply one update per batch with a linearly decaying learning rate
//! 4. every `eval_steps` evaluate on the validation partition, every
//!    `save_steps` write a checkpoint and prune old ones
//! 5. save the final model and `trainer_state.json` into the output directory
//!
//! Progression is strictly linear. A failing step aborts the run with
//! [`MtError::Training`]; nothing resumes automatically.

use crate::adapter::ModelAdapter;
use crate::batching::{Batch, TokenizedPair, make_batches, shuffled_batches};
use crate::checkpoint::{CheckpointManager, TRAINER_STATE_FILE, TrainerState};
use crate::error::{MtError, MtResult};
use entel::{DirectedDataset, Partition};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const TRAINING_ARGS_FILE: &str = "training_args.json";

/// Optimization settings for a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hyperparameters {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    /// Token cap for both inputs and labels
    pub max_sequence_length: usize,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            epochs: 3,
            batch_size: 4,
            learning_rate: 5e-5,
            max_sequence_length: 128,
        }
    }
}

/// Everything that shapes a training run besides the data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub hyperparameters: Hyperparameters,
    /// Write a checkpoint every this many updates
    pub save_steps: u64,
    /// Retain at most this many checkpoints
    pub save_total_limit: Option<usize>,
    /// Evaluate on the validation partition every this many updates
    pub eval_steps: u64,
    /// Log the running training loss every this many updates
    pub logging_steps: u64,
    /// Base seed for per-epoch shuffling
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            hyperparameters: Hyperparameters::default(),
            save_steps: 500,
            save_total_limit: Some(3),
            eval_steps: 500,
            logging_steps: 100,
            seed: 42,
        }
    }
}

impl TrainingConfig {
    /// Settings used for bidirectional runs, which keep fewer checkpoints
    pub fn bidirectional() -> Self {
        Self {
            save_total_limit: Some(2),
            logging_steps: 50,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> MtResult<()> {
        let hp = &self.hyperparameters;
        if hp.epochs == 0 {
            return Err(MtError::Config("epochs must be at least 1".to_string()));
        }
        if hp.batch_size == 0 {
            return Err(MtError::Config("batch size must be at least 1".to_string()));
        }
        if !hp.learning_rate.is_finite() || hp.learning_rate <= 0.0 {
            return Err(MtError::Config(format!(
                "learning rate must be positive, got {}",
                hp.learning_rate
            )));
        }
        if hp.max_sequence_length < 2 {
            return Err(MtError::Config(
                "max sequence length must leave room for special tokens".to_string(),
            ));
        }
        if self.save_steps == 0 || self.eval_steps == 0 || self.logging_steps == 0 {
            return Err(MtError::Config(
                "save, eval and logging step intervals must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub global_steps: u64,
    pub epochs: usize,
    pub train_loss: f32,
    pub eval_loss: Option<f32>,
    pub test_loss: Option<f32>,
    pub output_dir: PathBuf,
    /// Checkpoints still on disk after pruning, oldest first
    pub checkpoints: Vec<PathBuf>,
}

/// Learning rate for the update after `step` completed updates
pub fn linear_decay(base_lr: f64, step: u64, total_steps: u64) -> f64 {
    if total_steps == 0 {
        return base_lr;
    }
    let remaining = total_steps.saturating_sub(step) as f64;
    base_lr * remaining / total_steps as f64
}

/// Tokenized partitions of all directed datasets, concatenated
struct TokenizedData {
    train: Vec<TokenizedPair>,
    validation: Vec<TokenizedPair>,
    test: Vec<TokenizedPair>,
}

pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Run the full training loop and save the result into `output_dir`
    pub async fn run(
        &self,
        adapter: &mut ModelAdapter,
        data: &[DirectedDataset],
        output_dir: &Path,
    ) -> MtResult<TrainingReport> {
        self.config.validate()?;
        let hp = &self.config.hyperparameters;

        let tokenized = self.tokenize(adapter, data).await?;
        if tokenized.train.is_empty() {
            return Err(MtError::Config("no training records to fine-tune on".to_string()));
        }

        let pad = adapter.pad_token_id();
        let val_batches = make_batches(&tokenized.validation, hp.batch_size, pad);
        let test_batches = make_batches(&tokenized.test, hp.batch_size, pad);

        let steps_per_epoch = tokenized.train.len().div_ceil(hp.batch_size) as u64;
        let total_steps = steps_per_epoch * hp.epochs as u64;

        fs::create_dir_all(output_dir)?;
        fs::write(
            output_dir.join(TRAINING_ARGS_FILE),
            serde_json::to_vec_pretty(&self.config)?,
        )?;
        let mut checkpoints = CheckpointManager::new(output_dir, self.config.save_total_limit);

        info!(
            "Training on {} pairs ({} validation, {} test): {} epochs × {} steps",
            tokenized.train.len(),
            tokenized.validation.len(),
            tokenized.test.len(),
            hp.epochs,
            steps_per_epoch
        );

        let mut global_step: u64 = 0;
        let mut last_loss = 0.0f32;
        let mut eval_loss = None;

        for epoch in 1..=hp.epochs {
            let batches = shuffled_batches(
                &tokenized.train,
                hp.batch_size,
                pad,
                self.config.seed.wrapping_add(epoch as u64),
            );

            let mut epoch_loss = 0.0f32;
            let mut window_loss = 0.0f32;
            for batch in &batches {
                let learning_rate = linear_decay(hp.learning_rate, global_step, total_steps);
                let loss = adapter
                    .train_step(batch, learning_rate)
                    .await
                    .map_err(|e| training_error(epoch, e))?;

                global_step += 1;
                last_loss = loss;
                epoch_loss += loss;
                window_loss += loss;

                if global_step % self.config.logging_steps == 0 {
                    info!(
                        "step {}/{} (epoch {}): loss {:.4}, lr {:.3e}",
                        global_step,
                        total_steps,
                        epoch,
                        window_loss / self.config.logging_steps as f32,
                        learning_rate
                    );
                    window_loss = 0.0;
                }

                if global_step % self.config.eval_steps == 0 {
                    eval_loss = self.evaluate(adapter, &val_batches, epoch).await?;
                    if let Some(loss) = eval_loss {
                        info!("step {}: eval loss {:.4}", global_step, loss);
                    }
                }

                if global_step % self.config.save_steps == 0 {
                    let state = TrainerState {
                        global_step,
                        epoch,
                        learning_rate,
                        train_loss: loss,
                        eval_loss,
                    };
                    checkpoints.save(adapter.runtime(), &state).await?;
                }
            }

            info!(
                "Epoch {}/{} done: mean loss {:.4}",
                epoch,
                hp.epochs,
                epoch_loss / batches.len().max(1) as f32
            );
        }

        let final_eval = self.evaluate(adapter, &val_batches, hp.epochs).await?;
        if final_eval.is_some() {
            eval_loss = final_eval;
        }
        let test_loss = self.evaluate(adapter, &test_batches, hp.epochs).await?;

        adapter.save_pretrained(output_dir).await?;
        let state = TrainerState {
            global_step,
            epoch: hp.epochs,
            learning_rate: linear_decay(hp.learning_rate, global_step, total_steps),
            train_loss: last_loss,
            eval_loss,
        };
        fs::write(
            output_dir.join(TRAINER_STATE_FILE),
            serde_json::to_vec_pretty(&state)?,
        )?;

        info!(
            "✅ Training complete after {} steps; model saved to {}",
            global_step,
            output_dir.display()
        );

        Ok(TrainingReport {
            global_steps: global_step,
            epochs: hp.epochs,
            train_loss: last_loss,
            eval_loss,
            test_loss,
            output_dir: output_dir.to_path_buf(),
            checkpoints: checkpoints.saved(),
        })
    }

    async fn tokenize(
        &self,
        adapter: &ModelAdapter,
        data: &[DirectedDataset],
    ) -> MtResult<TokenizedData> {
        let max_length = self.config.hyperparameters.max_sequence_length;
        let mut tokenized = TokenizedData {
            train: Vec::new(),
            validation: Vec::new(),
            test: Vec::new(),
        };

        for directed in data {
            for partition in Partition::ALL {
                let pairs = adapter
                    .tokenize(directed.dataset.partition(partition), directed.pair, max_length)
                    .await?;
                match partition {
                    Partition::Train => tokenized.train.extend(pairs),
                    Partition::Validation => tokenized.validation.extend(pairs),
                    Partition::Test => tokenized.test.extend(pairs),
                }
            }
        }
        Ok(tokenized)
    }

    async fn evaluate(
        &self,
        adapter: &ModelAdapter,
        batches: &[Batch],
        epoch: usize,
    ) -> MtResult<Option<f32>> {
        adapter
            .evaluate(batches)
            .await
            .map_err(|e| training_error(epoch, e))
    }
}

fn training_error(epoch: usize, err: MtError) -> MtError {
    MtError::Training {
        epoch,
        message: err.to_string(),
    }
}
