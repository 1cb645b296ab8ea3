use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::types::{PlanarPose, PoseSample, VisionObservation};

/// One control tick's worth of experiment data. Ticks with a non-positive
/// timestamp mean the experiment has not started and are never recorded.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TickRecord {
    pub time: f64,
    pub action: [f64; 3],
    pub red: PoseSample,
    pub black: PoseSample,
    pub vision: VisionObservation,
    pub target_inertial: PlanarPose,
}

/// Flush the run's records to a timestamped JSON file in `dir`. Returns
/// `None` without touching the filesystem when there is nothing to write.
pub fn save_log(records: &[TickRecord], dir: &Path) -> io::Result<Option<PathBuf>> {
    if records.is_empty() {
        return Ok(None);
    }
    fs::create_dir_all(dir)?;
    let stamp = Utc::now().format("%Y-%m-%d_%H-%M-%S");
    let path = dir.join(format!("guidance_data_{stamp}.json"));
    let json = serde_json::to_string_pretty(records)?;
    fs::write(&path, json)?;
    Ok(Some(path))
}
