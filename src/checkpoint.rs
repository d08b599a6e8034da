//! Checkpoint system for saving and loading run state.

use crate::config::Config;
use crate::creature::{Creature, CreatureId};
use crate::stats::StatsHistory;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use thiserror::Error;

const MAGIC: &[u8; 4] = b"SMSS";

/// Complete run state for checkpointing
#[derive(Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Version for compatibility checking
    pub version: u32,
    /// Next generation to run
    pub generation: u32,
    /// Configuration, kept in its YAML form
    #[serde(with = "yaml_config")]
    pub config: Config,
    /// Whole population
    pub creatures: Vec<Creature>,
    /// Per-generation statistics so far
    pub stats_history: StatsHistory,
    /// Next creature ID
    pub next_creature_id: CreatureId,
    /// Seed the run was started with
    pub random_seed: u64,
    /// Generator state, so a resumed run continues the same stream
    pub rng: ChaCha8Rng,
}

impl Checkpoint {
    /// Current checkpoint version
    pub const VERSION: u32 = 1;

    /// Create a new checkpoint
    pub fn new(
        generation: u32,
        config: Config,
        creatures: Vec<Creature>,
        stats_history: StatsHistory,
        next_creature_id: CreatureId,
        random_seed: u64,
        rng: ChaCha8Rng,
    ) -> Self {
        Self {
            version: Self::VERSION,
            generation,
            config,
            creatures,
            stats_history,
            next_creature_id,
            random_seed,
            rng,
        }
    }

    /// Save checkpoint to binary file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), CheckpointError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        writer.write_all(MAGIC)?;
        let encoded = bincode::serialize(self)?;
        writer.write_all(&encoded)?;
        writer.flush()?;

        Ok(())
    }

    /// Load checkpoint from binary file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CheckpointError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(CheckpointError::InvalidFormat("Invalid magic bytes".to_string()));
        }

        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer)?;
        let checkpoint: Checkpoint = bincode::deserialize(&buffer)?;

        if checkpoint.version != Self::VERSION {
            return Err(CheckpointError::VersionMismatch {
                expected: Self::VERSION,
                found: checkpoint.version,
            });
        }

        Ok(checkpoint)
    }

    /// Get approximate size in bytes
    pub fn size_bytes(&self) -> usize {
        bincode::serialized_size(self).unwrap_or(0) as usize
    }
}

/// The config uses self-describing enum forms that bincode cannot read
/// back, so it travels as a YAML string inside the binary payload.
mod yaml_config {
    use crate::config::Config;
    use serde::{de, ser, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(config: &Config, serializer: S) -> Result<S::Ok, S::Error> {
        let yaml = serde_yaml::to_string(config).map_err(ser::Error::custom)?;
        serializer.serialize_str(&yaml)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Config, D::Error> {
        let yaml = String::deserialize(deserializer)?;
        serde_yaml::from_str(&yaml).map_err(de::Error::custom)
    }
}

/// Errors that can occur during checkpoint operations
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
}

/// Checkpoint manager for automatic saving
pub struct CheckpointManager {
    /// Base directory for checkpoints
    pub base_dir: String,
    /// Generations between checkpoints
    pub interval: u32,
    /// Maximum checkpoints to keep
    pub max_checkpoints: usize,
    last_checkpoint: u32,
}

impl CheckpointManager {
    /// Create a new checkpoint manager
    pub fn new(base_dir: String, interval: u32, max_checkpoints: usize) -> Self {
        std::fs::create_dir_all(&base_dir).ok();

        Self {
            base_dir,
            interval,
            max_checkpoints,
            last_checkpoint: 0,
        }
    }

    /// Check if a checkpoint should be saved
    pub fn should_save(&self, generation: u32) -> bool {
        generation > 0 && self.interval > 0 && generation % self.interval == 0 && generation != self.last_checkpoint
    }

    /// Generate checkpoint filename
    pub fn checkpoint_path(&self, generation: u32) -> String {
        format!("{}/checkpoint_{:08}.bin", self.base_dir, generation)
    }

    /// Save checkpoint and update state
    pub fn save(&mut self, checkpoint: &Checkpoint) -> Result<String, CheckpointError> {
        let path = self.checkpoint_path(checkpoint.generation);
        checkpoint.save(&path)?;
        self.last_checkpoint = checkpoint.generation;

        self.cleanup()?;

        Ok(path)
    }

    /// Remove old checkpoints beyond max limit
    fn cleanup(&self) -> Result<(), CheckpointError> {
        let mut checkpoints: Vec<_> = std::fs::read_dir(&self.base_dir)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().starts_with("checkpoint_"))
            .collect();

        if checkpoints.len() > self.max_checkpoints {
            // Zero-padded generation keeps name order chronological
            checkpoints.sort_by_key(|e| e.file_name());

            let to_remove = checkpoints.len() - self.max_checkpoints;
            for entry in checkpoints.into_iter().take(to_remove) {
                std::fs::remove_file(entry.path())?;
            }
        }

        Ok(())
    }

    /// Find latest checkpoint in directory
    pub fn find_latest(&self) -> Option<String> {
        std::fs::read_dir(&self.base_dir)
            .ok()?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().starts_with("checkpoint_"))
            .max_by_key(|e| e.file_name())
            .map(|e| e.path().to_string_lossy().to_string())
    }
}
