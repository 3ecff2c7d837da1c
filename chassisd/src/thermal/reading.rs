use super::config::TempThreshold;

/// A temperature sample after sentinel screening.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    Valid(f32),
    /// Driver reported its `invalid` sentinel.
    Invalid,
    /// Driver reported its `error` sentinel.
    Error,
    /// The read itself failed.
    Unavailable,
}

impl Reading {
    /// Sentinels are compared exactly; they are sentinel integers, not
    /// measurements.
    pub fn classify(raw: Option<f32>, threshold: Option<&TempThreshold>) -> Self {
        let Some(value) = raw else {
            return Reading::Unavailable;
        };
        if !value.is_finite() {
            return Reading::Error;
        }
        if let Some(threshold) = threshold {
            if threshold.invalid == Some(value) {
                return Reading::Invalid;
            }
            if threshold.error == Some(value) {
                return Reading::Error;
            }
        }
        Reading::Valid(value)
    }

    pub fn value(self) -> Option<f32> {
        match self {
            Reading::Valid(v) => Some(v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sff() -> TempThreshold {
        TempThreshold {
            warning: 999.0,
            critical: 1000.0,
            ignore_threshold: true,
            invalid: Some(-10000.0),
            error: Some(-9999.0),
        }
    }

    #[test]
    fn recognises_sentinels() {
        assert_eq!(Reading::classify(Some(-10000.0), Some(&sff())), Reading::Invalid);
        assert_eq!(Reading::classify(Some(-9999.0), Some(&sff())), Reading::Error);
        assert_eq!(Reading::classify(Some(45.0), Some(&sff())), Reading::Valid(45.0));
    }

    #[test]
    fn sentinels_only_apply_when_configured() {
        assert_eq!(
            Reading::classify(Some(-9999.0), None),
            Reading::Valid(-9999.0)
        );
    }

    #[test]
    fn missing_and_non_finite_readings() {
        assert_eq!(Reading::classify(None, Some(&sff())), Reading::Unavailable);
        assert_eq!(Reading::classify(Some(f32::NAN), None), Reading::Error);
    }
}
