//! Data export for analysis in external tools.

use crate::analysis::convention::Convention;
use crate::creature::Creature;
use crate::stats::StatsHistory;
use std::fs::File;
use std::io::{Result, Write};
use std::path::Path;

/// Export system for saving run data
pub struct ExportSystem;

impl ExportSystem {
    /// Export the per-generation series to CSV
    pub fn export_stats_csv<P: AsRef<Path>>(history: &StatsHistory, path: P) -> Result<()> {
        let mut file = File::create(path)?;

        writeln!(
            file,
            "generation,population,episodes,success_rate,fitness_mean,fitness_variance,fitness_max,reward_sender,reward_receiver,bias_gap_sender,bias_gap_receiver,age_mean,offspring,survivors"
        )?;

        let opt = |v: Option<f64>| v.map_or(String::new(), |v| format!("{:.4}", v));
        for s in &history.snapshots {
            writeln!(
                file,
                "{},{},{},{:.4},{:.4},{:.4},{:.4},{:.4},{:.4},{},{},{:.2},{},{}",
                s.generation,
                s.population,
                s.episodes,
                s.success_rate,
                s.fitness_mean,
                s.fitness_variance,
                s.fitness_max,
                s.mean_reward.sender,
                s.mean_reward.receiver,
                opt(s.bias_gap.sender),
                opt(s.bias_gap.receiver),
                s.age_mean,
                s.offspring,
                s.survivors,
            )?;
        }

        Ok(())
    }

    /// Export the current population to CSV.
    ///
    /// `self_success` is how well each creature understands itself, under
    /// `state_dist`.
    pub fn export_population_csv<P: AsRef<Path>>(creatures: &[Creature], state_dist: &[f64], path: P) -> Result<()> {
        let mut file = File::create(path)?;

        writeln!(
            file,
            "id,generation,parent1_id,parent2_id,lifespan,fitness,episodes_sender,episodes_receiver,sender_bias_mean,receiver_bias_mean,self_success,signaling_system"
        )?;

        for c in creatures {
            let parent1 = c.parent1_id.map_or(String::new(), |id| id.to_string());
            let parent2 = c.parent2_id.map_or(String::new(), |id| id.to_string());
            let convention = Convention::analyze(&c.learners.sender, &c.learners.receiver, state_dist);

            writeln!(
                file,
                "{},{},{},{},{},{:.3},{},{},{:.4},{:.4},{:.4},{}",
                c.id,
                c.generation,
                parent1,
                parent2,
                c.lifespan,
                c.fitness,
                c.episodes.sender,
                c.episodes.receiver,
                c.genes.sender.mean(),
                c.genes.receiver.mean(),
                convention.expected_success,
                convention.is_signaling_system(),
            )?;
        }

        Ok(())
    }
}
