use std::path::PathBuf;

use anyhow::{Context, Result};

pub fn database_file_path() -> Result<PathBuf> {
    let base = dirs::data_dir().context("unable to resolve data directory")?;
    Ok(base.join("chaptrack").join("chaptrack.db"))
}

pub fn default_manifest_path() -> PathBuf {
    PathBuf::from("chapters.json")
}
