use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BUFFER_CAPACITY: usize = 5;
/// Upper bound on the debounce window; larger windows only delay confirmation.
pub const MAX_BUFFER_CAPACITY: usize = 64;
pub const DEFAULT_MIN_REPEATS: usize = 3;
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.7;

/// One decode attempt from a single video frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodeSample {
    pub code: String,
    pub confidence: f64,
}

impl DecodeSample {
    pub fn new(code: impl Into<String>, confidence: f64) -> Self {
        Self {
            code: code.into(),
            confidence,
        }
    }
}

/// A code the debounce policy accepted, waiting for the user to confirm it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationCandidate {
    pub code: String,
    pub confidence: f64,
}

/// Debounce thresholds: a code is accepted once it appears at least `min_repeats` times
/// among the last `buffer_capacity` valid samples and the triggering sample's confidence
/// is strictly above `min_confidence`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScanPolicy {
    pub buffer_capacity: usize,
    pub min_repeats: usize,
    pub min_confidence: f64,
}

impl Default for ScanPolicy {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            min_repeats: DEFAULT_MIN_REPEATS,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }
}

impl ScanPolicy {
    pub fn validate(&self) -> Result<()> {
        if self.buffer_capacity == 0 || self.buffer_capacity > MAX_BUFFER_CAPACITY {
            bail!(
                "buffer_capacity must be between 1 and {MAX_BUFFER_CAPACITY}, got {}",
                self.buffer_capacity
            );
        }
        if self.min_repeats == 0 || self.min_repeats > self.buffer_capacity {
            bail!(
                "min_repeats must be between 1 and buffer_capacity ({}), got {}",
                self.buffer_capacity,
                self.min_repeats
            );
        }
        if !(0.0..1.0).contains(&self.min_confidence) {
            bail!(
                "min_confidence must be in [0, 1), got {}",
                self.min_confidence
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScanState {
    Scanning,
    PendingConfirmation(ConfirmationCandidate),
    Closed,
}

impl Default for ScanState {
    fn default() -> Self {
        ScanState::Scanning
    }
}

impl ScanState {
    pub fn phase(&self) -> ScanPhase {
        match self {
            ScanState::Scanning => ScanPhase::Scanning,
            ScanState::PendingConfirmation(_) => ScanPhase::PendingConfirmation,
            ScanState::Closed => ScanPhase::Closed,
        }
    }

    pub fn candidate(&self) -> Option<&ConfirmationCandidate> {
        match self {
            ScanState::PendingConfirmation(candidate) => Some(candidate),
            _ => None,
        }
    }
}

/// Data-free view of [`ScanState`] for snapshots and events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ScanPhase {
    Scanning,
    PendingConfirmation,
    Closed,
}

/// What the engine did with one incoming sample.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleOutcome {
    /// Failed the validity filter; never buffered.
    Rejected,
    /// Buffered; `repeats` is the code's count within the current window.
    Buffered { repeats: usize },
    /// Buffered and accepted as the confirmation candidate.
    Accepted(ConfirmationCandidate),
    /// Arrived while a candidate was pending or the session was closed.
    Ignored,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_three_of_five_above_point_seven() {
        let policy = ScanPolicy::default();
        assert_eq!(policy.buffer_capacity, 5);
        assert_eq!(policy.min_repeats, 3);
        assert_eq!(policy.min_confidence, 0.7);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn rejects_inconsistent_policies() {
        let too_many = ScanPolicy {
            min_repeats: 6,
            ..ScanPolicy::default()
        };
        assert!(too_many.validate().is_err());

        let empty = ScanPolicy {
            buffer_capacity: 0,
            ..ScanPolicy::default()
        };
        assert!(empty.validate().is_err());

        let huge = ScanPolicy {
            buffer_capacity: usize::MAX,
            ..ScanPolicy::default()
        };
        assert!(huge.validate().is_err());

        let widest = ScanPolicy {
            buffer_capacity: MAX_BUFFER_CAPACITY,
            ..ScanPolicy::default()
        };
        assert!(widest.validate().is_ok());

        let certain = ScanPolicy {
            min_confidence: 1.0,
            ..ScanPolicy::default()
        };
        assert!(certain.validate().is_err());
    }

    #[test]
    fn partial_policy_json_fills_defaults() {
        let policy: ScanPolicy = serde_json::from_str(r#"{"minRepeats": 2}"#).unwrap();
        assert_eq!(policy.min_repeats, 2);
        assert_eq!(policy.buffer_capacity, 5);
        assert_eq!(policy.min_confidence, 0.7);
    }
}
