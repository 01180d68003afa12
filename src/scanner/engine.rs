use log::debug;

use super::buffer::DecodeBuffer;
use super::state::{ConfirmationCandidate, DecodeSample, SampleOutcome, ScanPolicy, ScanState};
use super::validation::is_valid_code;

/// Debounced multi-frame voting over a stream of decode samples.
///
/// The engine is synchronous and owns no device; [`super::ScannerController`] feeds it
/// samples in arrival order and drives the capture lifecycle around it.
#[derive(Debug, Clone)]
pub struct ConfirmationEngine {
    policy: ScanPolicy,
    buffer: DecodeBuffer,
    state: ScanState,
}

impl ConfirmationEngine {
    pub fn new(policy: ScanPolicy) -> Self {
        Self {
            buffer: DecodeBuffer::with_capacity(policy.buffer_capacity),
            policy,
            state: ScanState::Scanning,
        }
    }

    pub fn policy(&self) -> &ScanPolicy {
        &self.policy
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }

    pub fn buffer(&self) -> &DecodeBuffer {
        &self.buffer
    }

    pub fn candidate(&self) -> Option<&ConfirmationCandidate> {
        self.state.candidate()
    }

    pub fn observe(&mut self, sample: &DecodeSample) -> SampleOutcome {
        if !matches!(self.state, ScanState::Scanning) {
            return SampleOutcome::Ignored;
        }

        if !is_valid_code(&sample.code) {
            debug!("discarding invalid decode {:?}", sample.code);
            return SampleOutcome::Rejected;
        }

        self.buffer.push(&sample.code);
        let repeats = self.buffer.occurrences(&sample.code);

        if repeats >= self.policy.min_repeats && sample.confidence > self.policy.min_confidence {
            let candidate = ConfirmationCandidate {
                code: sample.code.clone(),
                confidence: sample.confidence,
            };
            self.state = ScanState::PendingConfirmation(candidate.clone());
            return SampleOutcome::Accepted(candidate);
        }

        SampleOutcome::Buffered { repeats }
    }

    /// Back to `Scanning` with buffer and candidate cleared.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.state = ScanState::Scanning;
    }

    /// Takes the pending candidate and closes the session. `None` leaves state untouched.
    pub fn take_confirmed(&mut self) -> Option<ConfirmationCandidate> {
        let candidate = self.state.candidate().cloned()?;
        self.buffer.clear();
        self.state = ScanState::Closed;
        Some(candidate)
    }

    pub fn close(&mut self) {
        self.buffer.clear();
        self.state = ScanState::Closed;
    }
}

impl Default for ConfirmationEngine {
    fn default() -> Self {
        Self::new(ScanPolicy::default())
    }
}
