use std::collections::BTreeMap;

/// One round of sensor and FRU readings fed to the controller.
///
/// A temperature of `None` means the read failed. A sensor missing from the
/// map is treated the same way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThermalSnapshot {
    pub temperatures: BTreeMap<String, Option<f32>>,
    pub fans: Vec<FanStatus>,
    pub psus: Vec<PsuStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanStatus {
    pub present: bool,
    /// Rotor speed within tolerance of its target.
    pub rotor_ok: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PsuStatus {
    pub present: bool,
}

impl ThermalSnapshot {
    pub fn temperature(&self, sensor: &str) -> Option<f32> {
        self.temperatures.get(sensor).copied().flatten()
    }

    pub fn with_temperature(mut self, sensor: &str, value: Option<f32>) -> Self {
        self.temperatures.insert(sensor.to_string(), value);
        self
    }
}
