use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use log::{error, info, warn};
use serde_json::json;

use motion_replay_rs::reorder::reorder_samples;
use motion_replay_rs::storage;
use motion_replay_rs::types::AXIS_NAMES;
use motion_replay_rs::{reconstruct_decoded, Frame, ReconstructionConfig};

#[derive(Parser, Debug)]
#[command(name = "motion_replay")]
#[command(about = "Turn recorded IMU telemetry into robot arm movement plans", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    overrides: ConfigArgs,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    /// JSON configuration file; missing keys keep their defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Seconds between samples
    #[arg(long, global = true)]
    dt: Option<f64>,

    /// High-pass cutoff frequency (Hz)
    #[arg(long, global = true)]
    cutoff_hz: Option<f64>,

    /// High-pass filter order
    #[arg(long, global = true)]
    filter_order: Option<usize>,

    /// Output poses per second
    #[arg(long, global = true)]
    sampling_rate: Option<f64>,

    /// Kalman process noise
    #[arg(long, global = true)]
    q: Option<f64>,

    /// Kalman measurement noise
    #[arg(long, global = true)]
    r: Option<f64>,
}

impl ConfigArgs {
    fn resolve(&self) -> Result<ReconstructionConfig> {
        let mut config = match &self.config {
            Some(path) => storage::load_config(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => ReconstructionConfig::default(),
        };
        if let Some(dt) = self.dt {
            config.dt = dt;
        }
        if let Some(cutoff) = self.cutoff_hz {
            config.high_pass.cutoff_hz = cutoff;
        }
        if let Some(order) = self.filter_order {
            config.high_pass.order = order;
        }
        if let Some(rate) = self.sampling_rate {
            config.sampling_rate = rate;
        }
        if let Some(q) = self.q {
            config.kalman.process_noise = q;
        }
        if let Some(r) = self.r {
            config.kalman.measurement_noise = r;
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rotate raw telemetry into the robot frame and save the flat samples
    Reorder {
        /// Raw extraction output (.json or .json.gz)
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value = "reordered")]
        output_dir: PathBuf,
    },
    /// Reconstruct one telemetry file into a movement plan
    Convert {
        /// Raw or reordered telemetry (.json or .json.gz)
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value = "niryo_movements")]
        output_dir: PathBuf,
    },
    /// Convert every telemetry file in a directory
    Batch {
        #[arg(long)]
        input_dir: PathBuf,
        #[arg(long, default_value = "niryo_movements")]
        output_dir: PathBuf,
    },
    /// Validate a movement plan and print its extents
    Inspect {
        #[arg(long)]
        plan: PathBuf,
    },
}

fn ts_now() -> String {
    Utc::now().to_rfc3339()
}

fn run_reorder(input: &Path, output_dir: &Path) -> Result<serde_json::Value> {
    let mut decoded = storage::load_telemetry(input)
        .with_context(|| format!("reading telemetry {}", input.display()))?;
    if decoded.frame == Some(Frame::Reordered) {
        warn!("{} is already in the robot frame; writing it unchanged", input.display());
    } else {
        reorder_samples(&mut decoded.samples);
    }
    let path = storage::save_reordered(&decoded.samples, output_dir, input)
        .with_context(|| format!("writing reordered samples to {}", output_dir.display()))?;
    Ok(json!({
        "input": input.display().to_string(),
        "output": path.display().to_string(),
        "samples": decoded.samples.len(),
        "skipped_entries": decoded.skipped_entries,
    }))
}

fn run_convert(input: &Path, output_dir: &Path, config: &ReconstructionConfig) -> Result<serde_json::Value> {
    let decoded = storage::load_telemetry(input)
        .with_context(|| format!("reading telemetry {}", input.display()))?;
    let result = reconstruct_decoded(decoded, config)
        .with_context(|| format!("reconstructing {}", input.display()))?;
    let path = storage::save_plan(&result.plan, output_dir, input)
        .with_context(|| format!("writing movement plan to {}", output_dir.display()))?;
    Ok(json!({
        "input": input.display().to_string(),
        "output": path.display().to_string(),
        "report": result.report,
    }))
}

fn run_batch(input_dir: &Path, output_dir: &Path, config: &ReconstructionConfig) -> Result<serde_json::Value> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(input_dir)
        .with_context(|| format!("listing {}", input_dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && storage::is_telemetry_file(path))
        .collect();
    entries.sort();

    let mut converted = Vec::new();
    let mut failures = Vec::new();
    let mut claimed: HashMap<PathBuf, PathBuf> = HashMap::new();
    for path in &entries {
        let target = storage::plan_path(output_dir, path);
        let outcome = match claimed.get(&target) {
            Some(owner) => Err(anyhow::anyhow!(
                "output {} already written from {}",
                target.display(),
                owner.display()
            )),
            None => run_convert(path, output_dir, config),
        };
        match outcome {
            Ok(summary) => {
                claimed.insert(target, path.clone());
                converted.push(summary);
            }
            Err(e) => {
                error!("Failed {}: {:#}", path.display(), e);
                failures.push(json!({
                    "input": path.display().to_string(),
                    "error": format!("{:#}", e),
                }));
            }
        }
    }
    info!(
        "Batch finished: {} converted, {} failed",
        converted.len(),
        failures.len()
    );
    Ok(json!({
        "succeeded": converted.len(),
        "failed": failures.len(),
        "results": converted,
        "failures": failures,
    }))
}

fn run_inspect(plan_path: &Path) -> Result<serde_json::Value> {
    let plan = storage::load_plan(plan_path)
        .with_context(|| format!("loading movement plan {}", plan_path.display()))?;
    let extents: serde_json::Map<String, serde_json::Value> = plan
        .extents()
        .map(|ext| {
            AXIS_NAMES
                .iter()
                .zip(ext)
                .map(|(name, (min, max))| (name.to_string(), json!({"min": min, "max": max})))
                .collect()
        })
        .unwrap_or_default();
    Ok(json!({
        "plan": plan_path.display().to_string(),
        "movements": plan.len(),
        "extents": extents,
    }))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let result = match &cli.command {
        Command::Reorder { input, output_dir } => run_reorder(input, output_dir)?,
        Command::Convert { input, output_dir } => {
            run_convert(input, output_dir, &cli.overrides.resolve()?)?
        }
        Command::Batch {
            input_dir,
            output_dir,
        } => run_batch(input_dir, output_dir, &cli.overrides.resolve()?)?,
        Command::Inspect { plan } => run_inspect(plan)?,
    };

    let summary = json!({
        "generated_at": ts_now(),
        "result": result,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_recording(path: &Path) {
        let entries: Vec<serde_json::Value> = (0..20)
            .map(|i| {
                json!({
                    "Gyroscope": {"3-axis gyroscope": [[0.1, 0.0, 0.0], [0.1, 0.0, 0.0]]},
                    "Accelerometer": {"3-axis accelerometer": [[0.0, (i as f64) * 0.1, 9.8], [0.0, 0.0, 9.8]]},
                    "Interval in ms": format!("({}, {})", i * 20, i * 20 + 10)
                })
            })
            .collect();
        std::fs::write(path, serde_json::Value::Array(entries).to_string()).unwrap();
    }

    #[test]
    fn test_batch_reports_colliding_outputs() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write_recording(&input.path().join("reordered_run.json"));
        write_recording(&input.path().join("run.json"));
        write_recording(&input.path().join("walk.json"));

        let summary = run_batch(input.path(), output.path(), &ReconstructionConfig::default()).unwrap();
        assert_eq!(summary["succeeded"], 2);
        assert_eq!(summary["failed"], 1);
        let error = summary["failures"][0]["error"].as_str().unwrap();
        assert!(error.contains("niryo_run.json"));
        assert!(output.path().join("niryo_walk.json").is_file());
    }

    #[test]
    fn test_failed_conversion_does_not_claim_output() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        std::fs::write(input.path().join("reordered_run.json"), "[]").unwrap();
        write_recording(&input.path().join("run.json"));

        let summary = run_batch(input.path(), output.path(), &ReconstructionConfig::default()).unwrap();
        assert_eq!(summary["succeeded"], 1);
        assert_eq!(summary["failed"], 1);
        assert!(output.path().join("niryo_run.json").is_file());
    }
}
