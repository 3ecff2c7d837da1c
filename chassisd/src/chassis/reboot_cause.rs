use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::error::Result;
use crate::sysfs;
use crate::tracing::prelude::*;

pub const REBOOT_CAUSE_FILE: &str = "reboot-cause.txt";

const UNKNOWN_DESCRIPTION: &str = "Unknown reason";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum RebootCause {
    #[strum(serialize = "Non-Hardware")]
    NonHardware,
    #[strum(serialize = "Hardware - Other")]
    HardwareOther,
}

/// Directories holding the software-recorded reboot cause, searched in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebootCausePaths {
    /// As seen from the host.
    pub host: PathBuf,
    /// As seen from inside the platform-monitor container.
    pub container: PathBuf,
}

impl Default for RebootCausePaths {
    fn default() -> Self {
        Self {
            host: PathBuf::from("/host/reboot-cause/"),
            container: PathBuf::from("/usr/share/sonic/platform/api_files/reboot-cause/"),
        }
    }
}

impl RebootCausePaths {
    /// Cause of the previous reboot.
    ///
    /// The first existing `reboot-cause.txt` wins. Recorded text means the
    /// software initiated the reboot; no usable record means the hardware did
    /// for reasons we cannot tell.
    pub fn read(&self) -> (RebootCause, String) {
        let recorded = [&self.host, &self.container]
            .into_iter()
            .map(|dir| dir.join(REBOOT_CAUSE_FILE))
            .find(|path| path.exists())
            .and_then(|path| sysfs::read_value(&path))
            .filter(|text| !text.is_empty());

        match recorded {
            Some(text) => (RebootCause::NonHardware, text),
            None => (RebootCause::HardwareOther, UNKNOWN_DESCRIPTION.to_string()),
        }
    }
}

/// Record an over-temperature reboot for the platform to pick up after boot.
pub fn write_judge_file(path: &Path, sensor: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, format!("{sensor}\n"))?;
    warn!(path = %path.display(), sensor, "Over-temperature reboot flag written");
    Ok(())
}
