// storage.rs: telemetry files in, reordered samples and movement plans out

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use log::info;
use serde::Serialize;
use serde_json::Value;

use crate::config::ReconstructionConfig;
use crate::error::Result;
use crate::movement::MovementPlan;
use crate::telemetry::{decode_telemetry, DecodedTelemetry};
use crate::types::Sample;

const REORDERED_PREFIX: &str = "reordered_";
const PLAN_PREFIX: &str = "niryo_";

fn is_gzip(path: &Path) -> bool {
    path.extension().map(|e| e == "gz").unwrap_or(false)
}

/// Whether a file looks like telemetry this crate can read.
pub fn is_telemetry_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    name.ends_with(".json") || name.ends_with(".json.gz")
}

/// File name without `.json` / `.json.gz`.
pub fn base_name(path: &Path) -> String {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("output");
    let name = name.strip_suffix(".gz").unwrap_or(name);
    name.strip_suffix(".json").unwrap_or(name).to_string()
}

/// Read a JSON document, transparently gunzipping `.gz` files.
pub fn load_json_value(path: &Path) -> Result<Value> {
    let file = File::open(path)?;
    if is_gzip(path) {
        let reader = BufReader::new(GzDecoder::new(file));
        Ok(serde_json::from_reader(reader)?)
    } else {
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}

pub fn load_telemetry(path: &Path) -> Result<DecodedTelemetry> {
    let document = load_json_value(path)?;
    decode_telemetry(&document)
}

fn write_pretty<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

/// Write reordered samples as `<dir>/reordered_<base>.json`.
pub fn save_reordered(samples: &[Sample], output_dir: &Path, source: &Path) -> Result<PathBuf> {
    let path = output_dir.join(format!("{}{}.json", REORDERED_PREFIX, base_name(source)));
    write_pretty(&path, samples)?;
    info!("Wrote {} reordered samples to {}", samples.len(), path.display());
    Ok(path)
}

/// Where the plan for `source` goes: `<dir>/niryo_<base>.json`.
///
/// A `reordered_` prefix on the source name is not repeated in the output name,
/// so `run.json`, `run.json.gz` and `reordered_run.json` share one plan path.
pub fn plan_path(output_dir: &Path, source: &Path) -> PathBuf {
    let base = base_name(source);
    let base = base.strip_prefix(REORDERED_PREFIX).unwrap_or(&base);
    output_dir.join(format!("{}{}.json", PLAN_PREFIX, base))
}

pub fn save_plan(plan: &MovementPlan, output_dir: &Path, source: &Path) -> Result<PathBuf> {
    let path = plan_path(output_dir, source);
    write_pretty(&path, plan)?;
    info!("Wrote {} movements to {}", plan.len(), path.display());
    Ok(path)
}

pub fn load_plan(path: &Path) -> Result<MovementPlan> {
    let text = fs::read_to_string(path)?;
    MovementPlan::from_json(&text)
}

/// Load a (possibly partial) configuration file; missing keys keep defaults.
pub fn load_config(path: &Path) -> Result<ReconstructionConfig> {
    let text = fs::read_to_string(path)?;
    let config: ReconstructionConfig = serde_json::from_str(&text)?;
    config.validate()?;
    Ok(config)
}
