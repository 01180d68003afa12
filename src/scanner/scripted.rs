use std::{
    collections::HashSet,
    fs,
    path::Path,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::ScanError;

use super::capture::{CaptureConfig, CaptureDevice, CaptureHandle, CaptureSession};
use super::state::DecodeSample;

const DETECTION_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailurePoint {
    /// Camera acquisition fails (permission denied, no device).
    Acquire,
    /// Camera is acquired but the decoder does not start.
    DecoderStart,
}

/// Randomly corrupts a fraction of replayed samples, reproducibly for a given seed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MisreadInjection {
    pub seed: u64,
    pub rate: f64,
}

#[derive(Debug, Default)]
struct DeviceCounters {
    initialized: AtomicUsize,
    stopped: AtomicUsize,
    active: Mutex<HashSet<String>>,
}

/// Capture device that replays a recorded detection script instead of reading a camera.
#[derive(Clone)]
pub struct ScriptedDevice {
    script: Arc<Vec<DecodeSample>>,
    frame_interval: Duration,
    misreads: Option<MisreadInjection>,
    failure: Option<FailurePoint>,
    counters: Arc<DeviceCounters>,
}

impl ScriptedDevice {
    pub fn new(script: Vec<DecodeSample>) -> Self {
        Self {
            script: Arc::new(script),
            frame_interval: Duration::ZERO,
            misreads: None,
            failure: None,
            counters: Arc::new(DeviceCounters::default()),
        }
    }

    /// Loads a JSON array of `{ "code": .., "confidence": .. }` samples.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read sample script {}", path.display()))?;
        let script: Vec<DecodeSample> = serde_json::from_str(&contents)
            .with_context(|| format!("Invalid sample script {}", path.display()))?;
        Ok(Self::new(script))
    }

    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    pub fn with_misreads(mut self, misreads: MisreadInjection) -> Self {
        self.misreads = Some(misreads);
        self
    }

    pub fn failing_at(mut self, failure: FailurePoint) -> Self {
        self.failure = Some(failure);
        self
    }

    pub fn initialize_count(&self) -> usize {
        self.counters.initialized.load(Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> usize {
        self.counters.stopped.load(Ordering::SeqCst)
    }

    /// Sessions initialized and not yet stopped.
    pub fn active_sessions(&self) -> usize {
        self.active_ids().len()
    }

    fn active_ids(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.counters
            .active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl CaptureDevice for ScriptedDevice {
    async fn initialize(&self, config: &CaptureConfig) -> Result<CaptureSession, ScanError> {
        if self.failure == Some(FailurePoint::Acquire) {
            return Err(ScanError::Device(format!(
                "no {:?}-facing camera available for {}",
                config.facing_mode, config.target
            )));
        }

        self.counters.initialized.fetch_add(1, Ordering::SeqCst);

        if self.failure == Some(FailurePoint::DecoderStart) {
            return Err(ScanError::DecodeStart(format!(
                "none of {} requested formats could be enabled",
                config.formats.len()
            )));
        }

        let handle = CaptureHandle {
            id: Uuid::new_v4().to_string(),
        };
        self.active_ids().insert(handle.id.clone());

        let (tx, rx) = mpsc::channel(DETECTION_CHANNEL_CAPACITY);
        let script = Arc::clone(&self.script);
        let frame_interval = self.frame_interval;
        let mut misreads = self
            .misreads
            .map(|m| (StdRng::seed_from_u64(m.seed), m.rate.clamp(0.0, 1.0)));

        tokio::spawn(async move {
            for sample in script.iter() {
                let sample = match misreads.as_mut() {
                    Some((rng, rate)) => {
                        if rng.gen_bool(*rate) {
                            corrupt(rng, sample)
                        } else {
                            sample.clone()
                        }
                    }
                    None => sample.clone(),
                };
                // Receiver is dropped once the session is torn down.
                if tx.send(sample).await.is_err() {
                    break;
                }
                if !frame_interval.is_zero() {
                    tokio::time::sleep(frame_interval).await;
                }
            }
        });

        Ok(CaptureSession {
            handle,
            detections: rx,
        })
    }

    async fn stop(&self, handle: &CaptureHandle) {
        if self.active_ids().remove(&handle.id) {
            self.counters.stopped.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Flips one digit and drops confidence, mimicking a blurred frame.
fn corrupt(rng: &mut StdRng, sample: &DecodeSample) -> DecodeSample {
    let mut digits: Vec<u8> = sample.code.bytes().collect();
    if !digits.is_empty() {
        let position = rng.gen_range(0..digits.len());
        let original = digits[position];
        let mut replacement = b'0' + rng.gen_range(0..10u8);
        if replacement == original {
            replacement = if original == b'9' { b'0' } else { original.wrapping_add(1) };
        }
        digits[position] = replacement;
    }
    DecodeSample {
        code: String::from_utf8_lossy(&digits).into_owned(),
        confidence: rng.gen_range(0.2..0.6),
    }
}
