//! Small readers and writers for sysfs-style attribute files.
//!
//! Missing or unreadable files are absent data, never errors: callers get
//! `None` and decide what absence means.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::thermal::{FanStatus, PsuStatus, ThermalSnapshot};
use crate::tracing::prelude::*;

/// Trimmed contents of `path`, or `None` if it cannot be read.
pub fn read_value(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(data) => Some(data.trim().to_string()),
        Err(e) => {
            trace!(path = %path.display(), error = %e, "sysfs read failed");
            None
        }
    }
}

/// `1`/`0` attribute. Anything else reads as `None`.
pub fn read_flag(path: &Path) -> Option<bool> {
    match read_value(path)?.as_str() {
        "1" => Some(true),
        "0" => Some(false),
        _ => None,
    }
}

/// hwmon-style temperature in millidegrees, returned in °C.
///
/// A raw value equal to one of `sentinels` is returned as-is: drivers write
/// their invalid/error markers unscaled, and [`TempThreshold`] compares them
/// in the same raw form.
///
/// [`TempThreshold`]: crate::thermal::TempThreshold
pub fn read_temperature(path: &Path, sentinels: &[f32]) -> Option<f32> {
    let raw: i64 = read_value(path)?.parse().ok()?;
    let raw = raw as f32;
    if sentinels.contains(&raw) {
        return Some(raw);
    }
    Some(raw / 1000.0)
}

pub fn write_value(path: &Path, value: impl std::fmt::Display) -> std::io::Result<()> {
    fs::write(path, value.to_string())
}

/// Attribute files describing one fan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FanPaths {
    pub present: PathBuf,
    /// Reads `1` while the rotor is stalled or out of tolerance.
    pub rotor_fault: PathBuf,
}

/// Collects [`ThermalSnapshot`]s from attribute files.
#[derive(Debug, Clone, Default)]
pub struct SysfsThermalSource {
    pub sensors: BTreeMap<String, PathBuf>,
    pub fans: Vec<FanPaths>,
    pub psus: Vec<PathBuf>,
    /// Raw sentinel values passed through unscaled.
    pub sentinels: Vec<f32>,
}

impl SysfsThermalSource {
    pub fn snapshot(&self) -> ThermalSnapshot {
        ThermalSnapshot {
            temperatures: self
                .sensors
                .iter()
                .map(|(name, path)| (name.clone(), read_temperature(path, &self.sentinels)))
                .collect(),
            fans: self
                .fans
                .iter()
                .map(|fan| {
                    let present = read_flag(&fan.present).unwrap_or(false);
                    FanStatus {
                        present,
                        rotor_ok: !read_flag(&fan.rotor_fault).unwrap_or(false),
                    }
                })
                .collect(),
            psus: self
                .psus
                .iter()
                .map(|path| PsuStatus {
                    present: read_flag(path).unwrap_or(false),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::thermal::config::SFF_TEMP;
    use crate::thermal::{MonitorConfig, Reading};
    use tempfile::TempDir;

    fn attr(dir: &TempDir, name: &str, value: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, value).unwrap();
        path
    }

    #[test]
    fn reads_trimmed_values() {
        let dir = TempDir::new().unwrap();
        let path = attr(&dir, "value", "  QSFP_DD\n");
        assert_eq!(read_value(&path).as_deref(), Some("QSFP_DD"));
    }

    #[test]
    fn missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        assert_eq!(read_value(&dir.path().join("nope")), None);
        assert_eq!(read_flag(&dir.path().join("nope")), None);
    }

    #[test]
    fn parses_flags_and_temperatures() {
        let dir = TempDir::new().unwrap();
        assert_eq!(read_flag(&attr(&dir, "on", "1\n")), Some(true));
        assert_eq!(read_flag(&attr(&dir, "off", "0")), Some(false));
        assert_eq!(read_flag(&attr(&dir, "junk", "yes")), None);
        assert_eq!(read_temperature(&attr(&dir, "temp", "45500\n"), &[]), Some(45.5));
        assert_eq!(read_temperature(&attr(&dir, "bad", "n/a"), &[]), None);
    }

    #[test]
    fn builds_snapshot_from_attributes() {
        let dir = TempDir::new().unwrap();
        let source = SysfsThermalSource {
            sensors: BTreeMap::from([
                ("INLET_TEMP".to_string(), attr(&dir, "temp1", "30000")),
                ("CPU_TEMP".to_string(), dir.path().join("missing")),
            ]),
            fans: vec![FanPaths {
                present: attr(&dir, "fan1_present", "1"),
                rotor_fault: attr(&dir, "fan1_fault", "1"),
            }],
            psus: vec![attr(&dir, "psu1_present", "0")],
            sentinels: Vec::new(),
        };

        let snapshot = source.snapshot();

        assert_eq!(snapshot.temperature("INLET_TEMP"), Some(30.0));
        assert_eq!(snapshot.temperatures.get("CPU_TEMP"), Some(&None));
        assert_eq!(
            snapshot.fans,
            vec![FanStatus {
                present: true,
                rotor_ok: false
            }]
        );
        assert_eq!(snapshot.psus, vec![PsuStatus { present: false }]);
    }

    #[test]
    fn sentinels_pass_through_unscaled() {
        let dir = TempDir::new().unwrap();
        let sentinels = [-10000.0, -9999.0];

        assert_eq!(
            read_temperature(&attr(&dir, "invalid", "-10000\n"), &sentinels),
            Some(-10000.0)
        );
        assert_eq!(
            read_temperature(&attr(&dir, "error", "-9999"), &sentinels),
            Some(-9999.0)
        );
        assert_eq!(
            read_temperature(&attr(&dir, "cold", "-10000"), &[]),
            Some(-10.0)
        );
        assert_eq!(
            read_temperature(&attr(&dir, "warm", "65000"), &sentinels),
            Some(65.0)
        );
    }

    #[test]
    fn sentinel_from_sysfs_classifies_as_invalid() {
        let dir = TempDir::new().unwrap();
        let threshold = MonitorConfig::default().thresholds[SFF_TEMP].clone();
        let source = SysfsThermalSource {
            sensors: BTreeMap::from([(SFF_TEMP.to_string(), attr(&dir, "sff", "-10000"))]),
            sentinels: vec![-10000.0, -9999.0],
            ..SysfsThermalSource::default()
        };

        let raw = source.snapshot().temperature(SFF_TEMP);

        assert_eq!(Reading::classify(raw, Some(&threshold)), Reading::Invalid);
    }

    #[test]
    fn writes_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pwm1");
        write_value(&path, 128u8).unwrap();
        assert_eq!(read_value(&path).as_deref(), Some("128"));
    }
}
