//! Front-panel LED policy.
//!
//! PSU and fan LEDs turn amber once the number of faulty units reaches the
//! configured count. The system LED stays green unless it is configured to
//! follow the PSU or fan LED.

use serde::Serialize;
use strum::{Display, EnumString};

use crate::thermal::{LedControlParams, ThermalSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum LedColor {
    Off,
    Green,
    Amber,
    Red,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LedStatus {
    pub sys: LedColor,
    pub psu: LedColor,
    pub fan: LedColor,
}

impl LedStatus {
    pub fn evaluate(params: &LedControlParams, faulty_psus: usize, faulty_fans: usize) -> Self {
        let level = |faulty: usize, amber_num: u32| {
            if amber_num > 0 && faulty >= amber_num as usize {
                LedColor::Amber
            } else {
                LedColor::Green
            }
        };

        let psu = level(faulty_psus, params.psu_amber_num);
        let fan = level(faulty_fans, params.fan_amber_num);

        let sys = if (params.check_psu && psu == LedColor::Amber)
            || (params.check_fan && fan == LedColor::Amber)
        {
            LedColor::Amber
        } else {
            LedColor::Green
        };

        Self { sys, psu, fan }
    }

    /// Count absent PSUs and absent or stalled fans in `snapshot`.
    pub fn from_snapshot(params: &LedControlParams, snapshot: &ThermalSnapshot) -> Self {
        let faulty_psus = snapshot.psus.iter().filter(|psu| !psu.present).count();
        let faulty_fans = snapshot
            .fans
            .iter()
            .filter(|fan| !fan.present || !fan.rotor_ok)
            .count();
        Self::evaluate(params, faulty_psus, faulty_fans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::thermal::{FanStatus, PsuStatus};
    use std::str::FromStr;

    #[test]
    fn all_green_when_healthy() {
        let status = LedStatus::evaluate(&LedControlParams::default(), 0, 0);
        assert_eq!(
            status,
            LedStatus {
                sys: LedColor::Green,
                psu: LedColor::Green,
                fan: LedColor::Green,
            }
        );
    }

    #[test]
    fn sys_led_ignores_faults_by_default() {
        let status = LedStatus::evaluate(&LedControlParams::default(), 1, 1);
        assert_eq!(status.psu, LedColor::Amber);
        assert_eq!(status.fan, LedColor::Amber);
        assert_eq!(status.sys, LedColor::Green);
    }

    #[test]
    fn sys_led_follows_psu_when_configured() {
        let params = LedControlParams {
            check_psu: true,
            ..LedControlParams::default()
        };
        assert_eq!(LedStatus::evaluate(&params, 1, 0).sys, LedColor::Amber);
        assert_eq!(LedStatus::evaluate(&params, 0, 1).sys, LedColor::Green);
    }

    #[test]
    fn amber_needs_configured_fault_count() {
        let params = LedControlParams {
            fan_amber_num: 2,
            ..LedControlParams::default()
        };
        assert_eq!(LedStatus::evaluate(&params, 0, 1).fan, LedColor::Green);
        assert_eq!(LedStatus::evaluate(&params, 0, 2).fan, LedColor::Amber);
    }

    #[test]
    fn counts_faults_from_snapshot() {
        let snapshot = ThermalSnapshot {
            fans: vec![
                FanStatus { present: true, rotor_ok: true },
                FanStatus { present: true, rotor_ok: false },
            ],
            psus: vec![PsuStatus { present: true }],
            ..ThermalSnapshot::default()
        };

        let status = LedStatus::from_snapshot(&LedControlParams::default(), &snapshot);
        assert_eq!(status.fan, LedColor::Amber);
        assert_eq!(status.psu, LedColor::Green);
    }

    #[test]
    fn colors_parse_case_insensitively() {
        assert_eq!(LedColor::from_str("AMBER").unwrap(), LedColor::Amber);
        assert_eq!(LedColor::Green.to_string(), "green");
    }
}
