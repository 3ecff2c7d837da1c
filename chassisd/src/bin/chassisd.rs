//! Platform daemon: fan control and transceiver presence.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use chassisd::chassis::Chassis;
use chassisd::chassis::reboot_cause::write_judge_file;
use chassisd::config::{CONFIG_ENV, DEFAULT_CONFIG_PATH, PlatformConfig};
use chassisd::led::LedStatus;
use chassisd::sysfs::{self, SysfsThermalSource};
use chassisd::thermal::{FanSpeedCommand, LedControlParams, ThermalController, ThermalSnapshot};
use chassisd::tracing::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    chassisd::tracing::init_journald_or_stdout();

    let config = load_config()?;
    let chassis = config.build_chassis();

    let (cause, description) = chassis.reboot_cause();
    info!(
        platform = chassis.platform(),
        ports = chassis.num_transceivers(),
        %cause,
        %description,
        "chassisd starting"
    );

    let monitor = config.monitor.clone();
    let shutdown = CancellationToken::new();
    let (fan_tx, fan_rx) = watch::channel(FanSpeedCommand::idle(monitor.fan_control.min_pwm));
    let (snapshot_tx, snapshot_rx) = watch::channel(None);

    let mut tasks = JoinSet::new();
    tasks.spawn(ThermalController::new(monitor.clone(), fan_tx, snapshot_rx).run(shutdown.clone()));
    tasks.spawn(sample(
        config.thermal_source(),
        Duration::from_secs(monitor.fan_control.interval),
        monitor.led_control.clone(),
        snapshot_tx,
        shutdown.clone(),
    ));
    tasks.spawn(actuate(config.pwm.clone(), fan_rx, shutdown.clone()));
    tasks.spawn(watch_presence(chassis, shutdown.clone()));

    wait_for_signal().await?;
    info!("Shutting down");
    shutdown.cancel();

    while let Some(result) = tasks.join_next().await {
        if let Err(e) = result {
            error!(error = %e, "Task failed during shutdown");
        }
    }

    Ok(())
}

fn load_config() -> Result<PlatformConfig> {
    let path = env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    if !path.exists() {
        warn!(path = %path.display(), "Platform config not found, using defaults");
        return Ok(PlatformConfig::default());
    }

    let config = PlatformConfig::load(&path)
        .with_context(|| format!("loading platform config {}", path.display()))?;
    info!(path = %path.display(), "Loaded platform config");
    Ok(config)
}

/// Publish a fresh snapshot every control interval.
async fn sample(
    source: SysfsThermalSource,
    period: Duration,
    led_control: LedControlParams,
    snapshot_tx: watch::Sender<Option<ThermalSnapshot>>,
    shutdown: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    let mut leds: Option<LedStatus> = None;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = interval.tick() => {
                let snapshot = source.snapshot();

                let status = LedStatus::from_snapshot(&led_control, &snapshot);
                if leds != Some(status) {
                    info!(sys = %status.sys, psu = %status.psu, fan = %status.fan, "LED status");
                    leds = Some(status);
                }

                snapshot_tx.send_replace(Some(snapshot));
            }
        }
    }
}

/// Apply fan commands and record over-temperature reboot requests.
async fn actuate(
    pwm_path: Option<PathBuf>,
    mut fan_rx: watch::Receiver<FanSpeedCommand>,
    shutdown: CancellationToken,
) {
    let mut reboot_recorded = false;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            changed = fan_rx.changed() => {
                if changed.is_err() {
                    debug!("Fan command channel closed");
                    break;
                }
                let command = fan_rx.borrow_and_update().clone();

                match &pwm_path {
                    Some(path) => {
                        if let Err(e) = sysfs::write_value(path, command.pwm) {
                            error!(path = %path.display(), error = %e, "Failed to write fan PWM");
                        }
                    }
                    None => debug!(pwm = command.pwm, "No PWM output configured"),
                }

                match &command.reboot_request {
                    Some(request) if !reboot_recorded => {
                        if let Err(e) = write_judge_file(&request.judge_file, &request.sensor) {
                            error!(error = %e, "Failed to record over-temperature reboot");
                        }
                        reboot_recorded = true;
                    }
                    Some(_) => {}
                    None => reboot_recorded = false,
                }
            }
        }
    }
}

async fn watch_presence(mut chassis: Chassis, shutdown: CancellationToken) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            (changed, events) = chassis.wait_for_change(Duration::ZERO) => {
                if !changed {
                    continue;
                }
                for (port, event) in &events {
                    debug!(port, event = event.as_str(), "Transceiver event");
                }
            }
        }
    }
}

async fn wait_for_signal() -> Result<()> {
    let mut sigterm = signal(SignalKind::terminate()).context("installing SIGTERM handler")?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => result.context("waiting for Ctrl-C")?,
        _ = sigterm.recv() => {}
    }

    Ok(())
}
