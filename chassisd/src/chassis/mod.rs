//! The switch chassis and the hardware hanging off it.
//!
//! A [`Chassis`] owns every transceiver port together with the presence bit
//! the watcher keeps for it. Ports and components are handed in ready-made
//! from the platform table; nothing is looked up at runtime.

use bitvec::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::led::LedColor;
use crate::tracing::prelude::*;

pub mod component;
mod presence;
pub mod reboot_cause;
pub mod transceiver;

pub use component::{BootType, Component, FirmwareInfo, FirmwareInventory, JsonFirmwareInventory};
pub use presence::PortEvent;
pub use reboot_cause::{RebootCause, RebootCausePaths};
pub use transceiver::{SysfsTransceiver, Transceiver, TransceiverPaths};

const NOT_AVAILABLE: &str = "N/A";

/// Presence poll period of [`Chassis::wait_for_change`].
pub const PRESENCE_TICK: Duration = Duration::from_secs(1);

/// Identity strings from the system EEPROM.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChassisInfo {
    pub name: Option<String>,
    pub platform: Option<String>,
    pub model: Option<String>,
    pub serial: Option<String>,
    pub base_mac: Option<String>,
}

pub struct Chassis {
    info: ChassisInfo,
    transceivers: Vec<Box<dyn Transceiver>>,
    /// Last presence seen by the watcher, one bit per port.
    presence: BitVec,
    components: Vec<Component>,
    reboot_cause_paths: RebootCausePaths,
    status_led: LedColor,
    tick: Duration,
}

impl Chassis {
    /// Every port starts out absent; the first watch reports what is seated.
    pub fn new(
        info: ChassisInfo,
        transceivers: Vec<Box<dyn Transceiver>>,
        components: Vec<Component>,
        reboot_cause_paths: RebootCausePaths,
    ) -> Self {
        let presence = bitvec![0; transceivers.len()];
        Self {
            info,
            transceivers,
            presence,
            components,
            reboot_cause_paths,
            status_led: LedColor::Green,
            tick: PRESENCE_TICK,
        }
    }

    pub fn num_transceivers(&self) -> usize {
        self.transceivers.len()
    }

    pub fn transceiver(&self, index: usize) -> Option<&dyn Transceiver> {
        match self.transceivers.get(index) {
            Some(port) => Some(port.as_ref()),
            None => {
                warn!(
                    index,
                    "Transceiver index out of range (0-{})",
                    self.transceivers.len().saturating_sub(1)
                );
                None
            }
        }
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn component(&self, index: usize) -> Option<&Component> {
        let component = self.components.get(index);
        if component.is_none() {
            warn!(
                index,
                "Component index out of range (0-{})",
                self.components.len().saturating_sub(1)
            );
        }
        component
    }

    pub fn reboot_cause(&self) -> (RebootCause, String) {
        self.reboot_cause_paths.read()
    }

    pub fn name(&self) -> &str {
        self.info.name.as_deref().unwrap_or(NOT_AVAILABLE)
    }

    pub fn platform(&self) -> &str {
        self.info.platform.as_deref().unwrap_or(NOT_AVAILABLE)
    }

    pub fn model(&self) -> &str {
        self.info.model.as_deref().unwrap_or(NOT_AVAILABLE)
    }

    pub fn serial(&self) -> &str {
        self.info.serial.as_deref().unwrap_or(NOT_AVAILABLE)
    }

    pub fn base_mac(&self) -> &str {
        self.info.base_mac.as_deref().unwrap_or(NOT_AVAILABLE)
    }

    pub fn revision(&self) -> &str {
        "0"
    }

    pub fn position_in_parent(&self) -> i32 {
        -1
    }

    pub fn is_replaceable(&self) -> bool {
        false
    }

    pub fn is_modular(&self) -> bool {
        false
    }

    pub fn presence(&self) -> bool {
        true
    }

    pub fn status(&self) -> bool {
        true
    }

    pub fn status_led(&self) -> LedColor {
        self.status_led
    }

    pub fn set_status_led(&mut self, color: LedColor) {
        if self.status_led != color {
            debug!(from = %self.status_led, to = %color, "Status LED changed");
        }
        self.status_led = color;
    }

    /// Thermal management runs in the fan-control task, not behind the chassis.
    pub fn thermal_manager(&self) -> Result<()> {
        Err(Error::Unsupported("thermal_manager"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct EmptyPort;

    impl Transceiver for EmptyPort {
        fn presence(&self) -> bool {
            false
        }

        fn read_eeprom(&mut self, _offset: usize, _len: usize) -> Option<Vec<u8>> {
            None
        }

        fn clear_eeprom_buffer(&mut self) {}

        fn reinit(&mut self) {}
    }

    fn chassis(info: ChassisInfo, ports: usize) -> Chassis {
        let transceivers = (0..ports)
            .map(|_| Box::new(EmptyPort) as Box<dyn Transceiver>)
            .collect();
        Chassis::new(info, transceivers, Vec::new(), RebootCausePaths::default())
    }

    #[test]
    fn identity_falls_back_to_not_available() {
        let chassis = chassis(
            ChassisInfo {
                name: Some("AS9716-32D".into()),
                serial: Some("EC2049000123".into()),
                ..ChassisInfo::default()
            },
            0,
        );

        assert_eq!(chassis.name(), "AS9716-32D");
        assert_eq!(chassis.serial(), "EC2049000123");
        assert_eq!(chassis.model(), "N/A");
        assert_eq!(chassis.base_mac(), "N/A");
        assert_eq!(chassis.revision(), "0");
        assert_eq!(chassis.position_in_parent(), -1);
        assert!(!chassis.is_replaceable());
        assert!(!chassis.is_modular());
        assert!(chassis.presence() && chassis.status());
    }

    #[test]
    fn transceiver_lookup_is_bounds_checked() {
        let chassis = chassis(ChassisInfo::default(), 2);
        assert_eq!(chassis.num_transceivers(), 2);
        assert!(chassis.transceiver(1).is_some());
        assert!(chassis.transceiver(2).is_none());
        assert!(chassis.component(0).is_none());
    }

    #[test]
    fn presence_starts_absent() {
        let chassis = chassis(ChassisInfo::default(), 4);
        assert!(chassis.presence.not_any());
        assert_eq!(chassis.presence.len(), 4);
    }

    #[test]
    fn status_led_is_settable() {
        let mut chassis = chassis(ChassisInfo::default(), 0);
        assert_eq!(chassis.status_led(), LedColor::Green);
        chassis.set_status_led(LedColor::Amber);
        assert_eq!(chassis.status_led(), LedColor::Amber);
    }

    #[test]
    fn thermal_manager_is_unsupported() {
        let chassis = chassis(ChassisInfo::default(), 0);
        assert!(matches!(
            chassis.thermal_manager(),
            Err(Error::Unsupported("thermal_manager"))
        ));
    }

    #[test]
    fn reboot_cause_reads_configured_paths() {
        let dir = TempDir::new().unwrap();
        let paths = RebootCausePaths {
            host: dir.path().to_path_buf(),
            container: dir.path().join("pmon"),
        };
        std::fs::write(dir.path().join(reboot_cause::REBOOT_CAUSE_FILE), "warm-reboot").unwrap();

        let chassis = Chassis::new(ChassisInfo::default(), Vec::new(), Vec::new(), paths);

        assert_eq!(
            chassis.reboot_cause(),
            (RebootCause::NonHardware, "warm-reboot".to_string())
        );
    }
}
