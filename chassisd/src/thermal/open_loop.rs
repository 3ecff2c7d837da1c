use super::config::{CurvePolicy, LinearPolicy, OpenLoopPolicy};

/// Clamp a computed duty into `[min, max]` and truncate to a PWM byte.
pub(super) fn clamp_pwm(value: f32, min: u8, max: u8) -> u8 {
    if value.is_nan() {
        return min;
    }
    value.clamp(min as f32, max as f32) as u8
}

impl LinearPolicy {
    pub fn pwm(&self, tin: f32) -> u8 {
        if tin <= self.tin_min {
            return self.pwm_min;
        }
        let pwm = self.pwm_min as f32 + self.k * (tin - self.tin_min);
        clamp_pwm(pwm, self.pwm_min, self.pwm_max)
    }
}

impl CurvePolicy {
    pub fn pwm(&self, tin: f32) -> u8 {
        if tin <= self.tin_min {
            return self.pwm_min;
        }
        let pwm = self.a * tin * tin + self.b * tin + self.c;
        clamp_pwm(pwm, self.pwm_min, self.pwm_max)
    }
}

impl OpenLoopPolicy {
    /// Duty for the given inlet temperature (°C).
    pub fn pwm(&self, tin: f32) -> u8 {
        match self {
            OpenLoopPolicy::Linear(p) => p.pwm(tin),
            OpenLoopPolicy::Curve(p) => p.pwm(tin),
        }
    }
}
