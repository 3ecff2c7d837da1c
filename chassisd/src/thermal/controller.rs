use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::config::MonitorConfig;
use super::failsafe::{FailSafe, FailSafeReason};
use super::fan_pid::{FanPIDController, SentinelPwm};
use super::reading::Reading;
use super::snapshot::ThermalSnapshot;
use super::state::{SensorMonitor, ThermalState};
use crate::tracing::prelude::*;

/// Over-temperature reboot asked for by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebootRequest {
    pub sensor: String,
    /// Flag file to write before rebooting.
    pub judge_file: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanSpeedCommand {
    pub pwm: u8,
    pub state: ThermalState,
    /// Empty unless the fail-safe forced `abnormal_pwm`.
    pub fail_safe: Vec<FailSafeReason>,
    pub reboot_request: Option<RebootRequest>,
}

impl FanSpeedCommand {
    pub fn idle(pwm: u8) -> Self {
        Self {
            pwm,
            state: ThermalState::Normal,
            fail_safe: Vec::new(),
            reboot_request: None,
        }
    }
}

/// Turns thermal snapshots into fan duty.
///
/// Per tick the duty is the highest of the enabled open-loop models (fed by
/// the inlet sensor), the enabled PID loops and `min_pwm`. Warning state
/// raises it to at least `warning_pwm`, critical state to `max_pwm`, and any
/// fail-safe condition to at least `abnormal_pwm`.
pub struct ThermalController {
    config: MonitorConfig,
    tick_duration: Duration,
    pids: BTreeMap<String, FanPIDController>,
    monitors: Vec<SensorMonitor>,
    failsafe: FailSafe,
    /// Consecutive ticks each sensor has spent in critical state.
    critical_ticks: BTreeMap<String, u32>,
    sensors: BTreeSet<String>,
    fan_speed_tx: watch::Sender<FanSpeedCommand>,
    snapshot_rx: watch::Receiver<Option<ThermalSnapshot>>,
    current_state: ThermalState,
}

impl ThermalController {
    pub fn new(
        config: MonitorConfig,
        fan_speed_tx: watch::Sender<FanSpeedCommand>,
        snapshot_rx: watch::Receiver<Option<ThermalSnapshot>>,
    ) -> Self {
        let params = &config.fan_control;

        let pids = config
            .pid
            .iter()
            .filter(|(_, policy)| policy.enabled)
            .map(|(name, policy)| (name.clone(), FanPIDController::new(policy.clone())))
            .collect();

        let monitors = config
            .thresholds
            .iter()
            .map(|(name, threshold)| SensorMonitor::new(name.clone(), threshold.clone(), params))
            .collect();

        let sensors = config
            .thresholds
            .keys()
            .chain(config.pid.keys())
            .chain(params.check_temp_fail.iter())
            .chain(std::iter::once(&config.inlet_sensor))
            .cloned()
            .collect();

        Self {
            tick_duration: Duration::from_secs(params.interval),
            failsafe: FailSafe::new(params),
            pids,
            monitors,
            critical_ticks: BTreeMap::new(),
            sensors,
            fan_speed_tx,
            snapshot_rx,
            current_state: ThermalState::Normal,
            config,
        }
    }

    pub async fn run(mut self, cancellation: CancellationToken) {
        let mut interval = tokio::time::interval(self.tick_duration);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancellation.cancelled() => {
                    break;
                }
                _ = interval.tick() => {
                    self.tick();
                }
            }
        }
    }

    pub fn current_state(&self) -> ThermalState {
        self.current_state
    }

    #[cfg(test)]
    fn set_tick_duration(&mut self, duration: Duration) {
        self.tick_duration = duration;
    }

    fn tick(&mut self) {
        let Some(snapshot) = self.snapshot_rx.borrow_and_update().clone() else {
            debug!("Thermal controller tick: no snapshot available yet");
            return;
        };

        let command = self.evaluate(&snapshot);

        if self.fan_speed_tx.send(command).is_err() {
            debug!("Fan speed command channel closed");
        }
    }

    /// Run one control step over `snapshot`.
    pub fn evaluate(&mut self, snapshot: &ThermalSnapshot) -> FanSpeedCommand {
        let params = &self.config.fan_control;

        let readings: BTreeMap<String, Reading> = self
            .sensors
            .iter()
            .map(|name| {
                let reading =
                    Reading::classify(snapshot.temperature(name), self.config.thresholds.get(name));
                (name.clone(), reading)
            })
            .collect();

        let mut pwm = params.min_pwm;

        if let Some(tin) = readings
            .get(&self.config.inlet_sensor)
            .and_then(|r| r.value())
        {
            for policy in self.config.open_loop.iter().filter(|p| p.enabled()) {
                pwm = pwm.max(policy.pwm(tin));
            }
        }

        let fallback = SentinelPwm {
            invalid: params.temp_invalid_pid_pwm,
            error: params.temp_error_pid_pwm,
        };
        for (name, pid) in &mut self.pids {
            let reading = readings.get(name).copied().unwrap_or(Reading::Unavailable);
            pwm = pwm.max(pid.update(reading, fallback));
        }

        pwm = pwm.clamp(params.min_pwm, params.max_pwm);

        let mut state = ThermalState::Normal;
        let mut reboot_request = None;
        for monitor in &mut self.monitors {
            let reading = readings
                .get(monitor.name())
                .copied()
                .unwrap_or(Reading::Unavailable);
            let sensor_state = monitor.observe(reading);
            state = state.max(sensor_state);

            let ticks = self
                .critical_ticks
                .entry(monitor.name().to_string())
                .or_default();
            if sensor_state == ThermalState::Critical {
                *ticks += 1;
            } else {
                *ticks = 0;
            }

            if params.check_crit_reboot_flag
                && *ticks >= params.check_crit_reboot_num
                && reboot_request.is_none()
            {
                reboot_request = Some(RebootRequest {
                    sensor: monitor.name().to_string(),
                    judge_file: self
                        .config
                        .otp_reboot_files
                        .for_sensor(monitor.name())
                        .to_path_buf(),
                });
            }
        }

        match state {
            ThermalState::Normal => {}
            ThermalState::Warning => pwm = pwm.max(params.warning_pwm),
            ThermalState::Critical => pwm = params.max_pwm,
        }

        let fail_safe = self.failsafe.evaluate(snapshot, &readings);
        if !fail_safe.is_empty() {
            pwm = pwm.max(params.abnormal_pwm);
        }

        if state != self.current_state {
            info!(
                previous_state = %self.current_state,
                new_state = %state,
                "Thermal state changed"
            );
            self.current_state = state;
        }

        if let Some(request) = &reboot_request {
            error!(
                sensor = %request.sensor,
                ticks = params.check_crit_reboot_num,
                "Critical temperature persisted, reboot requested"
            );
        }

        debug!(
            state = %state,
            pwm = pwm,
            fail_safe = fail_safe.len(),
            "Thermal control tick"
        );

        FanSpeedCommand {
            pwm,
            state,
            fail_safe,
            reboot_request,
        }
    }
}
