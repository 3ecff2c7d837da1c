//! Temperature-driven fan control policy.

mod alarm;
pub mod config;
mod controller;
mod failsafe;
mod fan_pid;
mod open_loop;
mod reading;
mod snapshot;
mod state;

pub use alarm::{AlarmStatus, EscalationAlarm};
pub use config::{
    CurvePolicy, FanControlParams, LedControlParams, LinearPolicy, MonitorConfig, OpenLoopPolicy,
    OtpRebootFiles, PidPolicy, TempThreshold,
};
pub use controller::{FanSpeedCommand, RebootRequest, ThermalController};
pub use failsafe::{FailSafe, FailSafeReason};
pub use fan_pid::{FanPIDController, SampleHistory, SentinelPwm};
pub use reading::Reading;
pub use snapshot::{FanStatus, PsuStatus, ThermalSnapshot};
pub use state::{SensorMonitor, ThermalState};
