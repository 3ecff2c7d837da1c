//! Conditions that force the fans to `abnormal_pwm` whatever the policies say.

use std::collections::BTreeMap;

use strum::Display;

use super::alarm::{AlarmStatus, EscalationAlarm};
use super::config::FanControlParams;
use super::reading::Reading;
use super::snapshot::ThermalSnapshot;
use crate::tracing::prelude::*;

#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum FailSafeReason {
    #[strum(to_string = "temperature read failure on {0}")]
    TempReadFailure(String),
    #[strum(to_string = "fan absent")]
    FanAbsent,
    #[strum(to_string = "PSU absent")]
    PsuAbsent,
    /// Number of fans whose rotor alarm has fired.
    #[strum(to_string = "{0} fan(s) with rotor error")]
    RotorError(usize),
}

/// Fail-safe counters. Each condition must persist for its configured number
/// of consecutive samples and clears on the first sample without it.
#[derive(Debug, Clone)]
pub struct FailSafe {
    temp_fail: BTreeMap<String, EscalationAlarm>,
    fan_absent: EscalationAlarm,
    psu_absent: EscalationAlarm,
    rotor: Vec<EscalationAlarm>,
    rotor_error_count: u32,
    rotor_error_fullspeed_num: usize,
}

impl FailSafe {
    pub fn new(params: &FanControlParams) -> Self {
        Self {
            temp_fail: params
                .check_temp_fail
                .iter()
                .map(|name| (name.clone(), EscalationAlarm::new(params.temp_fail_num, 0)))
                .collect(),
            fan_absent: EscalationAlarm::new(params.fan_absent_fullspeed_num, 0),
            psu_absent: EscalationAlarm::new(params.psu_absent_fullspeed_num, 0),
            rotor: Vec::new(),
            rotor_error_count: params.rotor_error_count,
            rotor_error_fullspeed_num: params.rotor_error_fullspeed_num.max(1) as usize,
        }
    }

    /// Update every counter with this tick's data and return the reasons
    /// currently forcing full speed.
    pub fn evaluate(
        &mut self,
        snapshot: &ThermalSnapshot,
        readings: &BTreeMap<String, Reading>,
    ) -> Vec<FailSafeReason> {
        let mut reasons = Vec::new();

        for (name, alarm) in &mut self.temp_fail {
            let failed = matches!(
                readings.get(name).copied().unwrap_or(Reading::Unavailable),
                Reading::Unavailable | Reading::Error
            );
            let status = alarm.check(failed);
            log_transition(&format!("{name} read failure"), status);
            if status.is_escalated() {
                reasons.push(FailSafeReason::TempReadFailure(name.clone()));
            }
        }

        let fan_missing = snapshot.fans.iter().any(|fan| !fan.present);
        let status = self.fan_absent.check(fan_missing);
        log_transition("fan absent", status);
        if status.is_escalated() {
            reasons.push(FailSafeReason::FanAbsent);
        }

        let psu_missing = snapshot.psus.iter().any(|psu| !psu.present);
        let status = self.psu_absent.check(psu_missing);
        log_transition("PSU absent", status);
        if status.is_escalated() {
            reasons.push(FailSafeReason::PsuAbsent);
        }

        if self.rotor.len() != snapshot.fans.len() {
            let count = self.rotor_error_count;
            self.rotor
                .resize_with(snapshot.fans.len(), || EscalationAlarm::new(count, 0));
        }
        let mut rotor_errors = 0;
        for (index, (alarm, fan)) in self.rotor.iter_mut().zip(&snapshot.fans).enumerate() {
            let status = alarm.check(fan.present && !fan.rotor_ok);
            log_transition(&format!("fan {index} rotor error"), status);
            if status.is_escalated() {
                rotor_errors += 1;
            }
        }
        if rotor_errors >= self.rotor_error_fullspeed_num {
            reasons.push(FailSafeReason::RotorError(rotor_errors));
        }

        reasons
    }
}

fn log_transition(condition: &str, status: AlarmStatus) {
    match status {
        AlarmStatus::Triggered => warn!(condition, "Fail-safe condition raised"),
        AlarmStatus::Resolved => info!(condition, "Fail-safe condition cleared"),
        _ => {}
    }
}
