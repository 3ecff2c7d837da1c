//! Firmware-bearing components (BIOS, CPLD, FPGA, ...).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tokio::process::Command;

use crate::error::{Error, Result};
use crate::tracing::prelude::*;

const NOT_AVAILABLE: &str = "N/A";

/// What the platform reports about one firmware image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FirmwareInfo {
    pub alias: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub firmware_version: Option<String>,
}

/// Source of [`FirmwareInfo`] keyed by firmware id (e.g. `CPLD0`).
pub trait FirmwareInventory: Send + Sync {
    fn firmware(&self, fw_id: &str) -> Option<FirmwareInfo>;
}

/// Inventory published as a JSON object of `fw_id -> FirmwareInfo`.
///
/// Re-read on every lookup; versions change underneath us after an
/// upgrade.
#[derive(Debug, Clone)]
pub struct JsonFirmwareInventory {
    path: PathBuf,
}

impl JsonFirmwareInventory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FirmwareInventory for JsonFirmwareInventory {
    fn firmware(&self, fw_id: &str) -> Option<FirmwareInfo> {
        let json = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str::<BTreeMap<String, FirmwareInfo>>(&json) {
            Ok(mut entries) => entries.remove(fw_id),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Malformed firmware inventory");
                None
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum BootType {
    None,
    Fast,
    Warm,
    Cold,
}

pub struct Component {
    fw_id: String,
    inventory: Arc<dyn FirmwareInventory>,
    /// Upgrade utility and leading arguments; `cold <image> 0` is appended.
    upgrade_command: Vec<String>,
}

impl Component {
    pub fn new(
        fw_id: impl Into<String>,
        inventory: Arc<dyn FirmwareInventory>,
        upgrade_command: Vec<String>,
    ) -> Self {
        Self {
            fw_id: fw_id.into(),
            inventory,
            upgrade_command,
        }
    }

    pub fn fw_id(&self) -> &str {
        &self.fw_id
    }

    fn field(&self, pick: impl FnOnce(FirmwareInfo) -> Option<String>) -> String {
        self.inventory
            .firmware(&self.fw_id)
            .and_then(pick)
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }

    pub fn name(&self) -> String {
        self.field(|info| info.alias)
    }

    pub fn description(&self) -> String {
        self.field(|info| info.kind)
    }

    /// Version currently running, as read from hardware.
    pub fn firmware_version(&self) -> String {
        self.field(|info| info.firmware_version)
    }

    pub fn available_firmware_version(&self, _image: &Path) -> Result<String> {
        Err(Error::Unsupported("available_firmware_version"))
    }

    /// No follow-up action is ever needed after install.
    pub fn firmware_update_notification(&self, _image: &Path) -> Option<String> {
        None
    }

    /// Run the upgrade utility against `image`. Success is exit status zero;
    /// there is no retry.
    pub async fn install_firmware(&self, image: &Path) -> Result<()> {
        if !image.is_file() {
            error!(image = %image.display(), "Firmware image not found");
            return Err(Error::ImageNotFound(image.to_path_buf()));
        }

        let (program, leading) = self
            .upgrade_command
            .split_first()
            .ok_or_else(|| Error::Other("no firmware upgrade command configured".into()))?;

        let output = Command::new(program)
            .args(leading)
            .arg("cold")
            .arg(image)
            .arg("0")
            .output()
            .await?;

        let mut captured = String::from_utf8_lossy(&output.stdout).into_owned();
        captured.push_str(&String::from_utf8_lossy(&output.stderr));

        if output.status.success() {
            info!(component = %self.name(), "Firmware install succeeded");
            Ok(())
        } else {
            error!(
                component = %self.name(),
                status = ?output.status.code(),
                output = %captured.trim_end(),
                "Firmware install failed"
            );
            Err(Error::FirmwareInstall {
                status: output.status.code(),
                output: captured,
            })
        }
    }

    pub async fn update_firmware(&self, _image: &Path) -> Result<()> {
        Err(Error::Unsupported("update_firmware"))
    }

    pub async fn auto_update_firmware(&self, _image: &Path, _boot_type: BootType) -> Result<i32> {
        Err(Error::Unsupported("auto_update_firmware"))
    }
}
