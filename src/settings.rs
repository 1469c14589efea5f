use serde::{Deserialize, Serialize};
use std::{io, path::Path};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read settings.json: {0}")]
    FileRead(#[from] io::Error),
    #[error("failed to deserialize settings.json: {0}")]
    Deserialize(#[from] serde_json::Error),
}

/// Tunables of point resolution and segment geometry.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// upper bound for the distance between a resolved point and its route
    /// neighbours
    pub max_reasonable_distance_km: f64,
    /// with both neighbours known, the bound is at most this factor times
    /// their distance
    pub neighbour_distance_factor: f64,
    /// segments longer than this are drawn as great-circle arcs
    pub great_circle_threshold_nm: f64,
    pub great_circle_points: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_reasonable_distance_km: 4000.0,
            neighbour_distance_factor: 1.5,
            great_circle_threshold_nm: 100.0,
            great_circle_points: 50,
        }
    }
}

pub type SettingsResult = Result<Settings, SettingsError>;

pub fn parse_settings_json(content: &[u8]) -> SettingsResult {
    Ok(serde_json::from_slice(content)?)
}

impl Settings {
    pub fn load(path: &Path) -> SettingsResult {
        parse_settings_json(&fs_err::read(path)?)
    }
}
