use super::config::PidPolicy;
use super::open_loop::clamp_pwm;
use super::reading::Reading;

pub const HISTORY_LEN: usize = 3;

/// Fixed ring of the most recent samples. The oldest slot is overwritten.
#[derive(Debug, Clone, Default)]
pub struct SampleHistory {
    samples: [f32; HISTORY_LEN],
    next: usize,
    len: usize,
}

impl SampleHistory {
    pub fn push(&mut self, value: f32) {
        self.samples[self.next] = value;
        self.next = (self.next + 1) % HISTORY_LEN;
        self.len = (self.len + 1).min(HISTORY_LEN);
    }

    pub fn is_full(&self) -> bool {
        self.len == HISTORY_LEN
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Samples held so far, oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = f32> + '_ {
        let oldest = (self.next + HISTORY_LEN - self.len) % HISTORY_LEN;
        (0..self.len).map(move |i| self.samples[(oldest + i) % HISTORY_LEN])
    }

    /// The sample before the latest one.
    pub fn previous(&self) -> Option<f32> {
        self.iter().rev().nth(1)
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Duty cycles substituted for sentinel readings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SentinelPwm {
    pub invalid: u8,
    pub error: u8,
}

/// Positional PID over a three-sample history.
///
/// With `error = target - current` for each sample in the history:
///
/// ```text
/// out = pwm_min + Kp*error(current) + Ki*sum(error(history)) + Kd*(current - previous)
/// ```
///
/// clamped to the policy's PWM range. The integral covers however many
/// samples the ring holds; the derivative term is zero until there is a
/// previous sample.
#[derive(Debug, Clone)]
pub struct FanPIDController {
    pub policy: PidPolicy,
    pub history: SampleHistory,
    pub last_pwm: u8,
}

impl FanPIDController {
    pub fn new(policy: PidPolicy) -> Self {
        let last_pwm = policy.pwm_min;
        Self {
            policy,
            history: SampleHistory::default(),
            last_pwm,
        }
    }

    pub fn update(&mut self, reading: Reading, fallback: SentinelPwm) -> u8 {
        let current = match reading {
            Reading::Valid(v) => v,
            Reading::Invalid => return fallback.invalid,
            Reading::Error | Reading::Unavailable => return fallback.error,
        };

        self.history.push(current);

        let p = &self.policy;
        let error = p.target - current;
        let integral: f32 = self.history.iter().map(|v| p.target - v).sum();
        let derivative = self.history.previous().map_or(0.0, |prev| current - prev);

        let output = p.pwm_min as f32 + p.kp * error + p.ki * integral + p.kd * derivative;

        self.last_pwm = clamp_pwm(output, p.pwm_min, p.pwm_max);
        self.last_pwm
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.last_pwm = self.policy.pwm_min;
    }
}
