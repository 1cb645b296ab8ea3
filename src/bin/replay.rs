// replay — re-run a recorded experiment log through the guidance pipeline.
//
// Rebuilds each tick's snapshot from a guidance_data_*.json file and feeds
// it to the same estimator -> policy -> clamp path the live controller uses,
// then reports how far the recomputed actions diverge from the recorded
// ones. Useful for A/B testing config changes against captured runs.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use deep_guidance_rs::config::GuidanceConfig;
use deep_guidance_rs::control::control_tick;
use deep_guidance_rs::data_log::TickRecord;
use deep_guidance_rs::estimator::TargetStateEstimator;
use deep_guidance_rs::policy::MlpPolicy;
use deep_guidance_rs::pose_history::PoseHistoryBuffer;
use deep_guidance_rs::types::FusedSnapshot;

#[derive(Parser, Debug)]
#[command(name = "replay")]
#[command(about = "Replay a guidance_data_*.json log through the control pipeline", long_about = None)]
struct Args {
    /// Path to a guidance_data_*.json log
    #[arg(long)]
    log: PathBuf,

    /// Trained policy artifact (JSON actor network)
    #[arg(long, default_value = "actor.json")]
    model: PathBuf,

    /// JSON file overriding the default guidance configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Skip observation normalization (A/B testing)
    #[arg(long, default_value_t = false)]
    raw_observation: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => GuidanceConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => GuidanceConfig::default(),
    };
    if args.raw_observation {
        config.normalize_observation = false;
    }
    config.validate()?;

    let policy = MlpPolicy::load(&args.model)
        .with_context(|| format!("loading policy artifact {}", args.model.display()))?;

    let file = File::open(&args.log).with_context(|| format!("opening {}", args.log.display()))?;
    let records: Vec<TickRecord> =
        serde_json::from_reader(BufReader::new(file)).context("parsing log")?;
    if records.is_empty() {
        println!("Log is empty, nothing to replay");
        return Ok(());
    }

    let mut estimator = TargetStateEstimator::new(&config);
    let mut history = PoseHistoryBuffer::new(config.history_depth());

    let mut latches = 0usize;
    let mut vision_ticks = 0usize;
    let mut squared_error_sum = 0.0;
    let mut max_divergence = 0.0f64;

    for record in &records {
        let snapshot = FusedSnapshot {
            timestamp: record.time,
            red: record.red,
            black: record.black,
            vision: record.vision,
        };
        let output = control_tick(&mut estimator, &mut history, &policy, &config, &snapshot);

        latches += output.events.len();
        if output.relative.from_vision {
            vision_ticks += 1;
        }
        for axis in 0..3 {
            let diff = output.action[axis] - record.action[axis];
            squared_error_sum += diff * diff;
            max_divergence = max_divergence.max(diff.abs());
        }
    }

    let rmse = (squared_error_sum / (records.len() * 3) as f64).sqrt();

    println!("=== Replay Summary ===");
    println!("Ticks replayed: {}", records.len());
    println!(
        "Time span: {:.1} s - {:.1} s",
        records.first().map(|r| r.time).unwrap_or(0.0),
        records.last().map(|r| r.time).unwrap_or(0.0)
    );
    println!("Vision-guided ticks: {} ({:.1}%)", vision_ticks,
        100.0 * vision_ticks as f64 / records.len() as f64);
    println!("Target latches: {latches}");
    println!("Action RMSE vs recorded: {rmse:.6}");
    println!("Max per-axis divergence: {max_divergence:.6}");

    Ok(())
}
