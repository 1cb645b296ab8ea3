use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use deep_guidance_rs::config::GuidanceConfig;
use deep_guidance_rs::control::ControlWorker;
use deep_guidance_rs::data_log::save_log;
use deep_guidance_rs::ingest::IngestionWorker;
use deep_guidance_rs::lifecycle::LifecycleController;
use deep_guidance_rs::mailbox::Mailbox;
use deep_guidance_rs::policy::MlpPolicy;
use deep_guidance_rs::transport;

#[derive(Parser, Debug)]
#[command(name = "deep_guidance")]
#[command(about = "Vision-guided chaser control loop", long_about = None)]
struct Args {
    /// Duration in seconds (0 = run until killed)
    #[arg(value_name = "SECONDS", default_value = "0")]
    duration: u64,

    /// Repeater socket path
    #[arg(long, default_value = "/tmp/jetsonRepeater")]
    socket: PathBuf,

    /// Trained policy artifact (JSON actor network)
    #[arg(long, default_value = "actor.json")]
    model: PathBuf,

    /// Output directory for experiment logs
    #[arg(long, default_value = "guidance_sessions")]
    output_dir: PathBuf,

    /// JSON file overriding the default guidance configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Command the configured constant accelerations instead of the policy
    #[arg(long)]
    debug_constant_acceleration: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    println!("[{}] Deep Guidance RS starting", ts_now());
    println!("  Duration: {} seconds (0=continuous)", args.duration);
    println!("  Socket: {}", args.socket.display());
    println!("  Model: {}", args.model.display());
    println!("  Output Dir: {}", args.output_dir.display());

    let mut config = match &args.config {
        Some(path) => GuidanceConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => GuidanceConfig::default(),
    };
    if args.debug_constant_acceleration {
        config.debug_constant_acceleration = true;
        println!(
            "  DEBUG: constant accelerations [{}, {}, {}]",
            config.constant_ax, config.constant_ay, config.constant_alpha
        );
    }
    config.validate()?;

    // The policy first: a missing trained model is not recoverable, so fail
    // before touching the socket.
    let policy = MlpPolicy::load(&args.model)
        .with_context(|| format!("loading policy artifact {}", args.model.display()))?;
    if policy.input_len() != config.observation_len() {
        anyhow::bail!(
            "policy expects {} inputs but the configured observation has {}",
            policy.input_len(),
            config.observation_len()
        );
    }
    println!("[{}] Policy loaded ({} inputs)", ts_now(), policy.input_len());

    let mut lifecycle = LifecycleController::new();

    let stream = match transport::connect_with_retry(
        &args.socket,
        Duration::from_secs_f64(config.connect_retry_secs),
        Duration::from_secs_f64(config.read_timeout_secs),
        &lifecycle.stop_flag(),
    )? {
        Some(stream) => stream,
        None => return Ok(()),
    };
    println!("[{}] Connected to repeater", ts_now());

    let writer = stream.try_clone().context("cloning stream for the control worker")?;
    let mailbox = Arc::new(Mailbox::new());

    let ingestion = IngestionWorker::new(stream, mailbox.clone(), lifecycle.stop_flag());
    let control =
        ControlWorker::new(writer, mailbox, lifecycle.stop_flag(), Box::new(policy), config);

    lifecycle.start(move || ingestion.run(), move || control.run());
    println!("[{}] Workers started", ts_now());

    let start = Instant::now();
    loop {
        std::thread::sleep(Duration::from_millis(500));
        if args.duration > 0 && start.elapsed().as_secs() >= args.duration {
            println!("[{}] Duration reached, stopping gently...", ts_now());
            break;
        }
    }

    lifecycle.request_stop();
    let records = lifecycle.join();

    match save_log(&records, &args.output_dir)? {
        Some(path) => println!(
            "[{}] Saved {} tick records to {}",
            ts_now(),
            records.len(),
            path.display()
        ),
        None => println!("[{}] Not saving a log because there is no data to write", ts_now()),
    }

    println!("[{}] Done", ts_now());
    Ok(())
}

fn ts_now() -> String {
    Utc::now().format("%H:%M:%S").to_string()
}
