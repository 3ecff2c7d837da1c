//! A sample-counted alarm with a de-escalation countdown.
//!
//! Escalates after a condition holds for `trigger` consecutive samples and
//! stays escalated until the condition has been false for `hold`
//! consecutive samples. Used for temperature warning/critical levels and for
//! the fail-safe counters, where the unit of time is one control tick.
//!
//! # State Machine
//!
//! ```text
//!          check(true)        n >= trigger
//!  Idle ──────────────► Counting(n) ──────────► Fired ◄────────┐
//!   ▲                     │                      │             │
//!   │     check(false)    │        check(false)  │  check(true)│
//!   └─────────────────────┘                      ▼             │
//!   ▲                                       Holding(r) ────────┘
//!   │          r reaches 0                       │
//!   └────────────────────────────────────────────┘
//! ```
//!
//! - **Counting:** the violation counter; any false sample drops it to zero.
//! - **Fired:** escalated. A false sample starts the countdown.
//! - **Holding:** still escalated while `r` more good samples are needed. A
//!   true sample returns to Fired, so the next countdown starts in full.
//!
//! The violation counter is zeroed by every false sample, including the ones
//! inside the countdown; the countdown itself is only re-armed by a true
//! sample.

/// Result of [`EscalationAlarm::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmStatus {
    /// Condition false, not escalated.
    Idle,

    /// Condition true, fewer than `trigger` consecutive samples so far.
    Pending,

    /// Just escalated. Returned once per episode.
    Triggered,

    /// Escalated and the condition is true.
    Active,

    /// Escalated, condition false, countdown running.
    Holding,

    /// Countdown finished; returned once, then `Idle`.
    Resolved,
}

impl AlarmStatus {
    pub fn is_escalated(self) -> bool {
        matches!(
            self,
            AlarmStatus::Triggered | AlarmStatus::Active | AlarmStatus::Holding
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Counting,
    Fired,
    Holding(u32),
}

#[derive(Debug, Clone)]
pub struct EscalationAlarm {
    trigger: u32,
    hold: u32,
    violations: u32,
    state: State,
}

impl EscalationAlarm {
    /// `trigger` consecutive true samples escalate; `hold` consecutive false
    /// samples de-escalate. A `hold` of zero behaves like one.
    pub fn new(trigger: u32, hold: u32) -> Self {
        Self {
            trigger: trigger.max(1),
            hold,
            violations: 0,
            state: State::Idle,
        }
    }

    /// Consecutive true samples seen, zeroed by any false sample.
    pub fn violations(&self) -> u32 {
        self.violations
    }

    pub fn is_escalated(&self) -> bool {
        matches!(self.state, State::Fired | State::Holding(_))
    }

    pub fn check(&mut self, condition: bool) -> AlarmStatus {
        if condition {
            self.violations = self.violations.saturating_add(1);
        } else {
            self.violations = 0;
        }

        match (self.state, condition) {
            (State::Idle, false) => AlarmStatus::Idle,

            (State::Idle | State::Counting, true) => {
                if self.violations >= self.trigger {
                    self.state = State::Fired;
                    AlarmStatus::Triggered
                } else {
                    self.state = State::Counting;
                    AlarmStatus::Pending
                }
            }

            (State::Counting, false) => {
                self.state = State::Idle;
                AlarmStatus::Idle
            }

            (State::Fired, true) => AlarmStatus::Active,

            (State::Holding(_), true) => {
                self.state = State::Fired;
                AlarmStatus::Active
            }

            (State::Fired, false) => self.count_down(self.hold),

            (State::Holding(remaining), false) => self.count_down(remaining),
        }
    }

    fn count_down(&mut self, remaining: u32) -> AlarmStatus {
        match remaining.saturating_sub(1) {
            0 => {
                self.state = State::Idle;
                AlarmStatus::Resolved
            }
            left => {
                self.state = State::Holding(left);
                AlarmStatus::Holding
            }
        }
    }

    pub fn reset(&mut self) {
        self.violations = 0;
        self.state = State::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_stays_idle_on_false() {
        let mut alarm = EscalationAlarm::new(3, 2);
        assert_eq!(alarm.check(false), AlarmStatus::Idle);
        assert_eq!(alarm.check(false), AlarmStatus::Idle);
    }

    #[test]
    fn one_short_of_trigger_does_not_escalate() {
        let mut alarm = EscalationAlarm::new(3, 2);
        assert_eq!(alarm.check(true), AlarmStatus::Pending);
        assert_eq!(alarm.check(true), AlarmStatus::Pending);
        assert!(!alarm.is_escalated());
    }

    #[test]
    fn triggers_on_the_nth_consecutive_violation() {
        let mut alarm = EscalationAlarm::new(3, 2);
        alarm.check(true);
        alarm.check(true);
        assert_eq!(alarm.check(true), AlarmStatus::Triggered);
        assert!(alarm.is_escalated());
    }

    #[test]
    fn trigger_of_one_fires_immediately() {
        let mut alarm = EscalationAlarm::new(1, 1);
        assert_eq!(alarm.check(true), AlarmStatus::Triggered);
    }

    #[test]
    fn interrupted_run_does_not_accumulate() {
        let mut alarm = EscalationAlarm::new(3, 2);
        alarm.check(true);
        alarm.check(true);
        assert_eq!(alarm.check(false), AlarmStatus::Idle);
        assert_eq!(alarm.violations(), 0);

        alarm.check(true);
        assert_eq!(alarm.check(true), AlarmStatus::Pending);
    }

    #[test]
    fn triggered_is_one_shot() {
        let mut alarm = EscalationAlarm::new(1, 2);
        assert_eq!(alarm.check(true), AlarmStatus::Triggered);
        assert_eq!(alarm.check(true), AlarmStatus::Active);
        assert_eq!(alarm.check(true), AlarmStatus::Active);
    }

    #[test]
    fn single_good_sample_does_not_deescalate() {
        let mut alarm = EscalationAlarm::new(1, 3);
        alarm.check(true);

        assert_eq!(alarm.check(false), AlarmStatus::Holding);
        assert!(alarm.is_escalated());
        assert_eq!(alarm.violations(), 0);
    }

    #[test]
    fn resolves_after_full_countdown() {
        let mut alarm = EscalationAlarm::new(1, 3);
        alarm.check(true);

        assert_eq!(alarm.check(false), AlarmStatus::Holding);
        assert_eq!(alarm.check(false), AlarmStatus::Holding);
        assert_eq!(alarm.check(false), AlarmStatus::Resolved);
        assert!(!alarm.is_escalated());
        assert_eq!(alarm.check(false), AlarmStatus::Idle);
    }

    #[test]
    fn violation_during_countdown_rearms_it() {
        let mut alarm = EscalationAlarm::new(1, 3);
        alarm.check(true);
        alarm.check(false);
        alarm.check(false);

        assert_eq!(alarm.check(true), AlarmStatus::Active);

        assert_eq!(alarm.check(false), AlarmStatus::Holding);
        assert_eq!(alarm.check(false), AlarmStatus::Holding);
        assert_eq!(alarm.check(false), AlarmStatus::Resolved);
    }

    #[test]
    fn zero_hold_resolves_on_first_good_sample() {
        let mut alarm = EscalationAlarm::new(1, 0);
        alarm.check(true);
        assert_eq!(alarm.check(false), AlarmStatus::Resolved);
    }

    #[test]
    fn rearms_after_resolved() {
        let mut alarm = EscalationAlarm::new(2, 1);
        alarm.check(true);
        assert_eq!(alarm.check(true), AlarmStatus::Triggered);
        assert_eq!(alarm.check(false), AlarmStatus::Resolved);

        assert_eq!(alarm.check(true), AlarmStatus::Pending);
        assert_eq!(alarm.check(true), AlarmStatus::Triggered);
    }

    #[test]
    fn reset_from_fired_rearms() {
        let mut alarm = EscalationAlarm::new(1, 5);
        alarm.check(true);

        alarm.reset();

        assert!(!alarm.is_escalated());
        assert_eq!(alarm.check(false), AlarmStatus::Idle);
        assert_eq!(alarm.check(true), AlarmStatus::Triggered);
    }

    #[test]
    fn status_escalation_flags() {
        assert!(AlarmStatus::Triggered.is_escalated());
        assert!(AlarmStatus::Holding.is_escalated());
        assert!(!AlarmStatus::Resolved.is_escalated());
        assert!(!AlarmStatus::Pending.is_escalated());
    }
}
