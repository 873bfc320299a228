use std::fs;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::sampling::SampleTable;

use super::{Result, RoiDocument};

fn is_yaml(path: &Path) -> bool {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    matches!(extension.as_str(), "yaml" | "yml")
}

fn read<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path)?;
    Ok(if is_yaml(path) {
        serde_yaml::from_str::<T>(&raw)?
    } else {
        serde_json::from_str::<T>(&raw)?
    })
}

fn write<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let serialized = if is_yaml(path) {
        serde_yaml::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    fs::write(path, serialized)?;
    Ok(())
}

pub fn load_document(path: impl AsRef<Path>) -> Result<RoiDocument> {
    read(path.as_ref())
}

pub fn save_document(path: impl AsRef<Path>, document: &RoiDocument) -> Result<()> {
    write(path.as_ref(), document)
}

pub fn load_sample_table(path: impl AsRef<Path>) -> Result<SampleTable> {
    read(path.as_ref())
}
