use serde::Serialize;
use strum::Display;

use super::alarm::{AlarmStatus, EscalationAlarm};
use super::config::{FanControlParams, TempThreshold};
use super::reading::Reading;
use crate::tracing::prelude::*;

/// Escalation level, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ThermalState {
    Normal,
    Warning,
    Critical,
}

/// Warning and critical escalation for one sensor.
///
/// Readings that are not [`Reading::Valid`] are skipped: they neither count
/// as a violation nor advance a countdown.
#[derive(Debug, Clone)]
pub struct SensorMonitor {
    name: String,
    threshold: TempThreshold,
    warning: EscalationAlarm,
    critical: EscalationAlarm,
}

impl SensorMonitor {
    pub fn new(name: impl Into<String>, threshold: TempThreshold, params: &FanControlParams) -> Self {
        Self {
            name: name.into(),
            threshold,
            warning: EscalationAlarm::new(params.temp_warning_num, params.temp_warning_countdown),
            critical: EscalationAlarm::new(
                params.temp_critical_num,
                params.temp_critical_countdown,
            ),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ThermalState {
        if self.critical.is_escalated() {
            ThermalState::Critical
        } else if self.warning.is_escalated() {
            ThermalState::Warning
        } else {
            ThermalState::Normal
        }
    }

    /// Consecutive samples above the warning level.
    pub fn warning_violations(&self) -> u32 {
        self.warning.violations()
    }

    pub fn critical_violations(&self) -> u32 {
        self.critical.violations()
    }

    pub fn observe(&mut self, reading: Reading) -> ThermalState {
        let Some(temp) = reading.value() else {
            return self.state();
        };
        if self.threshold.ignore_threshold {
            return ThermalState::Normal;
        }

        let warning = self.warning.check(temp > self.threshold.warning);
        let critical = self.critical.check(temp > self.threshold.critical);

        for (level, status) in [("warning", warning), ("critical", critical)] {
            match status {
                AlarmStatus::Triggered => warn!(
                    sensor = %self.name,
                    temp_c = %temp,
                    level = level,
                    "Temperature escalated"
                ),
                AlarmStatus::Resolved => info!(
                    sensor = %self.name,
                    temp_c = %temp,
                    level = level,
                    "Temperature de-escalated"
                ),
                _ => {}
            }
        }

        self.state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn switch_monitor(params: &FanControlParams) -> SensorMonitor {
        SensorMonitor::new(
            "SWITCH_TEMP",
            TempThreshold {
                warning: 105.0,
                critical: 110.0,
                ignore_threshold: false,
                invalid: None,
                error: None,
            },
            params,
        )
    }

    #[test]
    fn should_escalate_exactly_after_third_sample_and_reset_counter_on_fourth() {
        let params = FanControlParams::default();
        let mut monitor = switch_monitor(&params);

        assert_eq!(monitor.observe(Reading::Valid(106.0)), ThermalState::Normal);
        assert_eq!(monitor.observe(Reading::Valid(106.0)), ThermalState::Normal);
        assert_eq!(monitor.warning_violations(), 2);

        assert_eq!(monitor.observe(Reading::Valid(106.0)), ThermalState::Warning);
        assert_eq!(monitor.warning_violations(), 3);

        assert_eq!(monitor.observe(Reading::Valid(104.0)), ThermalState::Warning);
        assert_eq!(monitor.warning_violations(), 0);
    }

    #[test]
    fn should_hold_warning_for_countdown() {
        let params = FanControlParams {
            temp_warning_countdown: 4,
            ..FanControlParams::default()
        };
        let mut monitor = switch_monitor(&params);
        for _ in 0..3 {
            monitor.observe(Reading::Valid(106.0));
        }

        for _ in 0..3 {
            assert_eq!(monitor.observe(Reading::Valid(100.0)), ThermalState::Warning);
        }
        assert_eq!(monitor.observe(Reading::Valid(100.0)), ThermalState::Normal);
    }

    #[test]
    fn should_go_critical_after_critical_count() {
        let params = FanControlParams::default();
        let mut monitor = switch_monitor(&params);

        monitor.observe(Reading::Valid(111.0));
        monitor.observe(Reading::Valid(111.0));
        assert_eq!(monitor.observe(Reading::Valid(111.0)), ThermalState::Critical);
    }

    #[test]
    fn should_skip_unusable_readings() {
        let params = FanControlParams::default();
        let mut monitor = switch_monitor(&params);

        monitor.observe(Reading::Valid(106.0));
        monitor.observe(Reading::Valid(106.0));
        monitor.observe(Reading::Unavailable);
        monitor.observe(Reading::Error);

        assert_eq!(monitor.warning_violations(), 2);
        assert_eq!(monitor.observe(Reading::Valid(106.0)), ThermalState::Warning);
    }

    #[test]
    fn should_never_escalate_ignored_sensor() {
        let params = FanControlParams::default();
        let mut monitor = SensorMonitor::new(
            "SFF_TEMP",
            TempThreshold {
                warning: 10.0,
                critical: 20.0,
                ignore_threshold: true,
                invalid: None,
                error: None,
            },
            &params,
        );

        for _ in 0..10 {
            assert_eq!(monitor.observe(Reading::Valid(500.0)), ThermalState::Normal);
        }
    }

    #[test]
    fn severity_orders_states() {
        assert!(ThermalState::Critical > ThermalState::Warning);
        assert!(ThermalState::Warning > ThermalState::Normal);
        assert_eq!(ThermalState::Critical.to_string(), "critical");
    }
}
