//! Platform description loaded by the daemon.
//!
//! One JSON file names every attribute path the daemon touches and carries
//! the thermal [`MonitorConfig`]. Omitted sections take their defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::chassis::{
    Chassis, ChassisInfo, Component, FirmwareInventory, JsonFirmwareInventory, RebootCausePaths,
    SysfsTransceiver, Transceiver, TransceiverPaths,
};
use crate::error::{Error, Result};
use crate::sysfs::{FanPaths, SysfsThermalSource};
use crate::thermal::MonitorConfig;

/// Environment variable naming the platform file.
pub const CONFIG_ENV: &str = "CHASSISD_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "/etc/chassisd/platform.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    pub chassis: ChassisInfo,
    /// Ports in front-panel order.
    pub transceivers: Vec<TransceiverPaths>,
    /// Sensor name to hwmon `temp*_input` file.
    pub sensors: BTreeMap<String, PathBuf>,
    pub fans: Vec<FanPaths>,
    /// PSU presence attributes.
    pub psus: Vec<PathBuf>,
    /// Fan duty output; without it commands are only logged.
    pub pwm: Option<PathBuf>,
    pub reboot_cause: RebootCausePaths,
    pub firmware_inventory: PathBuf,
    /// Upgrade utility and any leading arguments.
    pub upgrade_command: Vec<String>,
    /// Firmware ids, e.g. `BIOS0`, `CPLD0`.
    pub components: Vec<String>,
    pub monitor: MonitorConfig,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            chassis: ChassisInfo::default(),
            transceivers: Vec::new(),
            sensors: BTreeMap::new(),
            fans: Vec::new(),
            psus: Vec::new(),
            pwm: None,
            reboot_cause: RebootCausePaths::default(),
            firmware_inventory: PathBuf::from("/usr/share/sonic/platform/firmware.json"),
            upgrade_command: vec!["upgrade.py".to_string()],
            components: Vec::new(),
            monitor: MonitorConfig::default(),
        }
    }
}

impl PlatformConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.upgrade_command.is_empty() && !self.components.is_empty() {
            return Err(Error::InvalidConfig(
                "upgrade_command must not be empty when components are listed".into(),
            ));
        }
        self.monitor.validate()
    }

    pub fn build_chassis(&self) -> Chassis {
        let transceivers = self
            .transceivers
            .iter()
            .enumerate()
            .map(|(index, paths)| {
                Box::new(SysfsTransceiver::new(index, paths.clone())) as Box<dyn Transceiver>
            })
            .collect();

        let inventory: Arc<dyn FirmwareInventory> =
            Arc::new(JsonFirmwareInventory::new(&self.firmware_inventory));
        let components = self
            .components
            .iter()
            .map(|fw_id| Component::new(fw_id, inventory.clone(), self.upgrade_command.clone()))
            .collect();

        Chassis::new(
            self.chassis.clone(),
            transceivers,
            components,
            self.reboot_cause.clone(),
        )
    }

    pub fn thermal_source(&self) -> SysfsThermalSource {
        let sentinels = self
            .monitor
            .thresholds
            .values()
            .flat_map(|threshold| [threshold.invalid, threshold.error])
            .flatten()
            .collect();

        SysfsThermalSource {
            sensors: self.sensors.clone(),
            fans: self.fans.clone(),
            psus: self.psus.clone(),
            sentinels,
        }
    }
}
