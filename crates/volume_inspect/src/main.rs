use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use state_store::VolumeReader;
use volume_inspect::{render_report, volume_exists};

const DEFAULT_DATA_DIR: &str = "/data";

fn main() -> anyhow::Result<ExitCode> {
    let data_dir = env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| env::var_os("DATA_DIR").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

    let reader = VolumeReader::new(&data_dir);
    if !volume_exists(&reader) {
        println!("ERROR: {} volume not found or empty", data_dir.display());
        return Ok(ExitCode::FAILURE);
    }

    let report = render_report(&reader)
        .with_context(|| format!("inspecting {}", data_dir.display()))?;
    print!("{report}");
    Ok(ExitCode::SUCCESS)
}
