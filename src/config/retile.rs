use crate::geometry::{DetectorGeometry, DetectorPreset};
use crate::pipeline::SplitOptions;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Either a named detector or a fully explicit geometry.
///
/// ```json
/// { "preset": "eiger2-16m-quad" }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum GeometryConfig {
    Preset { preset: DetectorPreset },
    Explicit(DetectorGeometry),
}

impl GeometryConfig {
    pub fn geometry(&self) -> DetectorGeometry {
        match self {
            GeometryConfig::Preset { preset } => DetectorGeometry::preset(*preset),
            GeometryConfig::Explicit(geometry) => geometry.clone(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct RetileConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub geometry: GeometryConfig,
    #[serde(default)]
    pub split: SplitOptions,
    #[serde(default)]
    pub report_json: Option<PathBuf>,
}

pub fn load_config(path: &Path) -> Result<RetileConfig, String> {
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
    let config: RetileConfig = serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse config {}: {e}", path.display()))?;
    config
        .geometry
        .geometry()
        .validate()
        .map_err(|e| format!("Invalid geometry in {}: {e}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::GroupMap;
    use std::io::Write;

    #[test]
    fn preset_geometry_parses() {
        let config: RetileConfig = serde_json::from_str(
            r#"{"input": "in.h5", "output": "out.h5", "geometry": {"preset": "eiger2-9m"}}"#,
        )
        .unwrap();
        assert_eq!(
            config.geometry,
            GeometryConfig::Preset {
                preset: DetectorPreset::Eiger2_9m
            }
        );
        assert_eq!(config.geometry.geometry().module_count(), 18);
        assert_eq!(config.split, SplitOptions::default());
        assert!(config.report_json.is_none());
    }

    #[test]
    fn explicit_geometry_parses() {
        let config: RetileConfig = serde_json::from_str(
            r#"{
                "input": "in.h5",
                "output": "out.h5",
                "geometry": {
                    "module_fast": 4, "module_slow": 2,
                    "gap_fast": 1, "gap_slow": 1,
                    "grid_fast": 2, "grid_slow": 2,
                    "group_map": {"explicit": [[0, 2], [1, 3]]}
                },
                "split": {"fill_value": 7},
                "report_json": "report.json"
            }"#,
        )
        .unwrap();
        let geometry = config.geometry.geometry();
        assert_eq!(geometry.global_fast(), 9);
        assert_eq!(geometry.group_map, GroupMap::Explicit(vec![vec![0, 2], vec![1, 3]]));
        assert_eq!(config.split.fill_value, 7);
        assert_eq!(config.report_json, Some(PathBuf::from("report.json")));
    }

    #[test]
    fn invalid_geometry_is_reported_with_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"input": "a", "output": "b", "geometry": {{
                "module_fast": 4, "module_slow": 2, "gap_fast": 0, "gap_slow": 1,
                "grid_fast": 2, "grid_slow": 2}}}}"#
        )
        .unwrap();
        let err = load_config(file.path()).unwrap_err();
        assert!(err.starts_with("Invalid geometry"), "{err}");
    }
}
