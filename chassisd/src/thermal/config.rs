//! Fan-control policy store.
//!
//! Loaded once at startup and read-only afterwards. [`MonitorConfig::default`]
//! is the reference platform table; a JSON file may override any section.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const INLET_TEMP: &str = "INLET_TEMP";
pub const OUTLET_TEMP: &str = "OUTLET_TEMP";
pub const SWITCH_TEMP: &str = "SWITCH_TEMP";
pub const CPU_TEMP: &str = "CPU_TEMP";
pub const SFF_TEMP: &str = "SFF_TEMP";

/// Open-loop model: PWM as a direct function of the inlet temperature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum OpenLoopPolicy {
    Linear(LinearPolicy),
    Curve(CurvePolicy),
}

impl OpenLoopPolicy {
    pub fn enabled(&self) -> bool {
        match self {
            OpenLoopPolicy::Linear(p) => p.enabled,
            OpenLoopPolicy::Curve(p) => p.enabled,
        }
    }

    pub fn pwm_bounds(&self) -> (u8, u8) {
        match self {
            OpenLoopPolicy::Linear(p) => (p.pwm_min, p.pwm_max),
            OpenLoopPolicy::Curve(p) => (p.pwm_min, p.pwm_max),
        }
    }
}

/// `pwm = pwm_min + k * (tin - tin_min)` above `tin_min`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearPolicy {
    #[serde(default)]
    pub enabled: bool,
    pub pwm_min: u8,
    pub pwm_max: u8,
    pub k: f32,
    pub tin_min: f32,
}

/// `pwm = a*tin^2 + b*tin + c` above `tin_min`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurvePolicy {
    #[serde(default)]
    pub enabled: bool,
    pub pwm_min: u8,
    pub pwm_max: u8,
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub tin_min: f32,
}

/// Closed-loop gains for one named sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PidPolicy {
    #[serde(default)]
    pub enabled: bool,
    pub pwm_min: u8,
    pub pwm_max: u8,
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
    /// Temperature the loop regulates towards (°C).
    pub target: f32,
}

/// Warning/critical levels for one sensor.
///
/// `invalid` and `error` are sentinel readings reported by drivers that
/// cannot measure; they never take part in comparisons. Sentinels are the
/// raw attribute value the driver writes (not scaled from millidegrees).
/// Warning and critical levels are in °C.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TempThreshold {
    pub warning: f32,
    pub critical: f32,
    /// Sensor is monitored for PID but never escalates.
    #[serde(default)]
    pub ignore_threshold: bool,
    #[serde(default)]
    pub invalid: Option<f32>,
    #[serde(default)]
    pub error: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FanControlParams {
    /// Seconds between control ticks.
    pub interval: u64,
    pub max_pwm: u8,
    pub min_pwm: u8,
    pub abnormal_pwm: u8,
    pub warning_pwm: u8,
    pub temp_invalid_pid_pwm: u8,
    pub temp_error_pid_pwm: u8,
    /// Consecutive failed reads of a `check_temp_fail` sensor before full speed.
    pub temp_fail_num: u32,
    pub check_temp_fail: Vec<String>,
    pub temp_warning_num: u32,
    pub temp_critical_num: u32,
    /// Good samples required before leaving warning speed.
    pub temp_warning_countdown: u32,
    /// Good samples required before leaving full speed.
    pub temp_critical_countdown: u32,
    pub rotor_error_count: u32,
    pub psu_absent_fullspeed_num: u32,
    pub fan_absent_fullspeed_num: u32,
    pub rotor_error_fullspeed_num: u32,
    pub check_crit_reboot_flag: bool,
    pub check_crit_reboot_num: u32,
}

impl Default for FanControlParams {
    fn default() -> Self {
        Self {
            interval: 5,
            max_pwm: 0xff,
            min_pwm: 0x55,
            abnormal_pwm: 0xff,
            warning_pwm: 0xff,
            temp_invalid_pid_pwm: 0x55,
            temp_error_pid_pwm: 0x55,
            temp_fail_num: 3,
            check_temp_fail: vec![
                INLET_TEMP.to_string(),
                SWITCH_TEMP.to_string(),
                CPU_TEMP.to_string(),
            ],
            temp_warning_num: 3,
            temp_critical_num: 3,
            temp_warning_countdown: 60,
            temp_critical_countdown: 60,
            rotor_error_count: 6,
            psu_absent_fullspeed_num: 1,
            fan_absent_fullspeed_num: 1,
            rotor_error_fullspeed_num: 1,
            check_crit_reboot_flag: true,
            check_crit_reboot_num: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedControlParams {
    pub interval: u64,
    /// System LED follows PSU faults.
    pub check_psu: bool,
    /// System LED follows fan faults.
    pub check_fan: bool,
    /// Faulty PSUs before the PSU LED turns amber.
    pub psu_amber_num: u32,
    /// Faulty fans before the fan LED turns amber.
    pub fan_amber_num: u32,
    pub sys_leds: Vec<String>,
    pub psu_leds: Vec<String>,
    pub fan_leds: Vec<String>,
}

impl Default for LedControlParams {
    fn default() -> Self {
        Self {
            interval: 5,
            check_psu: false,
            check_fan: false,
            psu_amber_num: 1,
            fan_amber_num: 1,
            sys_leds: vec!["FRONT_SYS_LED".to_string()],
            psu_leds: vec!["FRONT_PSU_LED".to_string()],
            fan_leds: vec!["FRONT_FAN_LED".to_string()],
        }
    }
}

/// Flag files recording an over-temperature reboot, read back after boot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OtpRebootFiles {
    pub switch: PathBuf,
    pub other: PathBuf,
}

impl Default for OtpRebootFiles {
    fn default() -> Self {
        Self {
            switch: PathBuf::from("/etc/.otp_switch_reboot_flag"),
            other: PathBuf::from("/etc/.otp_other_reboot_flag"),
        }
    }
}

impl OtpRebootFiles {
    /// Judge file for a reboot caused by `sensor`.
    pub fn for_sensor(&self, sensor: &str) -> &Path {
        if sensor == SWITCH_TEMP {
            &self.switch
        } else {
            &self.other
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Sensor feeding the open-loop models.
    pub inlet_sensor: String,
    pub open_loop: Vec<OpenLoopPolicy>,
    pub pid: BTreeMap<String, PidPolicy>,
    pub thresholds: BTreeMap<String, TempThreshold>,
    pub fan_control: FanControlParams,
    pub led_control: LedControlParams,
    pub otp_reboot_files: OtpRebootFiles,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        let pid = |kp, ki, kd, target| PidPolicy {
            enabled: false,
            pwm_min: 0x55,
            pwm_max: 0xff,
            kp,
            ki,
            kd,
            target,
        };
        let threshold = |warning, critical| TempThreshold {
            warning,
            critical,
            ignore_threshold: false,
            invalid: None,
            error: None,
        };

        Self {
            inlet_sensor: INLET_TEMP.to_string(),
            open_loop: vec![
                OpenLoopPolicy::Linear(LinearPolicy {
                    enabled: false,
                    pwm_min: 0x55,
                    pwm_max: 0xff,
                    k: 11.0,
                    tin_min: 38.0,
                }),
                OpenLoopPolicy::Curve(CurvePolicy {
                    enabled: true,
                    pwm_min: 0x55,
                    pwm_max: 0xff,
                    a: -0.05,
                    b: 11.32,
                    c: -166.0,
                    tin_min: 25.0,
                }),
            ],
            pid: BTreeMap::from([
                (CPU_TEMP.to_string(), pid(1.0, 0.4, 0.0, 80.0)),
                (SWITCH_TEMP.to_string(), pid(1.0, 0.4, 0.3, 90.0)),
                (OUTLET_TEMP.to_string(), pid(2.0, 0.4, 0.3, 60.0)),
                (SFF_TEMP.to_string(), pid(1.0, 1.0, 0.3, 65.0)),
            ]),
            thresholds: BTreeMap::from([
                (SWITCH_TEMP.to_string(), threshold(105.0, 110.0)),
                (INLET_TEMP.to_string(), threshold(55.0, 60.0)),
                (OUTLET_TEMP.to_string(), threshold(70.0, 75.0)),
                (CPU_TEMP.to_string(), threshold(85.0, 91.0)),
                (
                    SFF_TEMP.to_string(),
                    TempThreshold {
                        warning: 999.0,
                        critical: 1000.0,
                        ignore_threshold: true,
                        invalid: Some(-10000.0),
                        error: Some(-9999.0),
                    },
                ),
            ]),
            fan_control: FanControlParams::default(),
            led_control: LedControlParams::default(),
            otp_reboot_files: OtpRebootFiles::default(),
        }
    }
}

impl MonitorConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Reject tables the evaluator cannot honour.
    pub fn validate(&self) -> Result<()> {
        let fc = &self.fan_control;

        if fc.interval == 0 {
            return Err(Error::InvalidConfig("fan_control.interval must be > 0".into()));
        }
        if fc.min_pwm > fc.max_pwm {
            return Err(Error::InvalidConfig(format!(
                "fan_control.min_pwm {:#x} exceeds max_pwm {:#x}",
                fc.min_pwm, fc.max_pwm
            )));
        }
        for (name, pwm) in [
            ("warning_pwm", fc.warning_pwm),
            ("abnormal_pwm", fc.abnormal_pwm),
        ] {
            if pwm > fc.max_pwm {
                return Err(Error::InvalidConfig(format!(
                    "fan_control.{name} {pwm:#x} exceeds max_pwm {:#x}",
                    fc.max_pwm
                )));
            }
        }
        for (name, count) in [
            ("temp_fail_num", fc.temp_fail_num),
            ("temp_warning_num", fc.temp_warning_num),
            ("temp_critical_num", fc.temp_critical_num),
            ("rotor_error_count", fc.rotor_error_count),
        ] {
            if count == 0 {
                return Err(Error::InvalidConfig(format!(
                    "fan_control.{name} must be > 0"
                )));
            }
        }

        for policy in &self.open_loop {
            let (min, max) = policy.pwm_bounds();
            if min > max {
                return Err(Error::InvalidConfig(format!(
                    "open-loop pwm_min {min:#x} exceeds pwm_max {max:#x}"
                )));
            }
        }

        for (name, pid) in &self.pid {
            if pid.pwm_min > pid.pwm_max {
                return Err(Error::InvalidConfig(format!(
                    "pid.{name}: pwm_min {:#x} exceeds pwm_max {:#x}",
                    pid.pwm_min, pid.pwm_max
                )));
            }
        }

        for (name, threshold) in &self.thresholds {
            if threshold.warning > threshold.critical {
                return Err(Error::InvalidConfig(format!(
                    "thresholds.{name}: warning {} above critical {}",
                    threshold.warning, threshold.critical
                )));
            }
        }

        Ok(())
    }
}
