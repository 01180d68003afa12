use std::sync::{Arc, RwLock, Weak};

use log::{error, info, warn};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::ScanError;

use super::capture::{CaptureConfig, CaptureDevice, CaptureHandle};
use super::engine::ConfirmationEngine;
use super::state::{ConfirmationCandidate, DecodeSample, SampleOutcome, ScanPhase, ScanPolicy};

// Gates per-sample and end-of-stream logging in the pump
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

const EVENT_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ScannerEvent {
    CandidateReady { code: String, confidence: f64 },
    Confirmed { code: String },
    Failed { message: String },
    /// The device stopped producing frames for the live session.
    StreamEnded,
    Closed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannerSnapshot {
    pub phase: ScanPhase,
    pub session_id: Option<String>,
    pub candidate: Option<ConfirmationCandidate>,
    pub buffered: Vec<String>,
    /// Inline error text shown in place of the video surface.
    pub status_message: Option<String>,
}

type ConfirmedCallback = Arc<dyn Fn(&str) + Send + Sync>;

struct ActiveSession {
    id: String,
    /// `None` once the device has been told to stop.
    handle: Option<CaptureHandle>,
    device: Arc<dyn CaptureDevice>,
    cancel_token: CancellationToken,
    pump: JoinHandle<()>,
}

impl Drop for ActiveSession {
    fn drop(&mut self) {
        self.cancel_token.cancel();
        self.pump.abort();

        // Dropped without teardown: the controller itself went away.
        let Some(handle) = self.handle.take() else {
            return;
        };
        let device = Arc::clone(&self.device);
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                info!("Releasing capture session {} on scanner drop", self.id);
                runtime.spawn(async move { device.stop(&handle).await });
            }
            Err(_) => error!(
                "No async runtime to release capture handle {} of session {}",
                handle.id, self.id
            ),
        }
    }
}

struct ScannerInner {
    engine: ConfirmationEngine,
    session: Option<ActiveSession>,
    failure: Option<ScanError>,
}

/// Owns the capture device for one scanner surface and drives the confirmation engine.
///
/// At most one capture session is bound at a time: every (re)initialization stops the
/// previous session before asking the device for a new one.
#[derive(Clone)]
pub struct ScannerController {
    inner: Arc<Mutex<ScannerInner>>,
    device: Arc<dyn CaptureDevice>,
    config: Arc<CaptureConfig>,
    events: broadcast::Sender<ScannerEvent>,
    on_confirmed: Arc<RwLock<Option<ConfirmedCallback>>>,
}

impl ScannerController {
    pub fn new(device: Arc<dyn CaptureDevice>, config: CaptureConfig, policy: ScanPolicy) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Mutex::new(ScannerInner {
                engine: ConfirmationEngine::new(policy),
                session: None,
                failure: None,
            })),
            device,
            config: Arc::new(config),
            events,
            on_confirmed: Arc::new(RwLock::new(None)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ScannerEvent> {
        self.events.subscribe()
    }

    /// Registers the consumer of confirmed codes, replacing any previous one.
    pub fn on_confirmed<F>(&self, callback: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let mut guard = self
            .on_confirmed
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Some(Arc::new(callback));
    }

    pub async fn initialize(&self) -> Result<(), ScanError> {
        let mut inner = self.inner.lock().await;
        self.start_session(&mut inner).await
    }

    /// Clears buffer and candidate and restarts capture. Safe with or without a live session.
    pub async fn retry(&self) -> Result<(), ScanError> {
        let mut inner = self.inner.lock().await;
        info!("Scanner retry requested");
        self.start_session(&mut inner).await
    }

    /// Emits the pending candidate's code and releases the device. No-op without a candidate.
    pub async fn confirm(&self) -> Option<String> {
        let code = {
            let mut inner = self.inner.lock().await;
            inner.engine.candidate()?;
            if let Some(session) = inner.session.take() {
                self.teardown(session).await;
            }
            inner.engine.take_confirmed()?.code
        };

        info!("Scanner confirmed code {}", code);
        let _ = self.events.send(ScannerEvent::Confirmed { code: code.clone() });

        let callback = self
            .on_confirmed
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        if let Some(callback) = callback {
            callback(&code);
        }

        Some(code)
    }

    /// Releases the device unconditionally; never fails, even if nothing was started.
    pub async fn close(&self) {
        let mut inner = self.inner.lock().await;
        if let Some(session) = inner.session.take() {
            self.teardown(session).await;
        }
        inner.engine.close();
        inner.failure = None;
        let _ = self.events.send(ScannerEvent::Closed);
    }

    pub async fn snapshot(&self) -> ScannerSnapshot {
        let inner = self.inner.lock().await;
        ScannerSnapshot {
            phase: inner.engine.state().phase(),
            session_id: inner.session.as_ref().map(|s| s.id.clone()),
            candidate: inner.engine.candidate().cloned(),
            buffered: inner.engine.buffer().to_vec(),
            status_message: inner.failure.as_ref().map(ToString::to_string),
        }
    }

    pub async fn is_active(&self) -> bool {
        self.inner.lock().await.session.is_some()
    }

    async fn start_session(&self, inner: &mut ScannerInner) -> Result<(), ScanError> {
        if let Some(previous) = inner.session.take() {
            self.teardown(previous).await;
        }
        inner.engine.reset();
        inner.failure = None;

        match self.device.initialize(&self.config).await {
            Ok(capture) => {
                let session_id = Uuid::new_v4().to_string();
                let cancel_token = CancellationToken::new();
                let pump = tokio::spawn(sample_pump(
                    Arc::downgrade(&self.inner),
                    capture.detections,
                    cancel_token.clone(),
                    self.events.clone(),
                    session_id.clone(),
                ));

                info!(
                    "Scanner session {} started (capture handle {})",
                    session_id, capture.handle.id
                );
                inner.session = Some(ActiveSession {
                    id: session_id,
                    handle: Some(capture.handle),
                    device: Arc::clone(&self.device),
                    cancel_token,
                    pump,
                });
                Ok(())
            }
            Err(err) => {
                error!("Scanner initialization failed: {err}");
                inner.failure = Some(err.clone());
                let _ = self.events.send(ScannerEvent::Failed {
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    async fn teardown(&self, mut session: ActiveSession) {
        session.cancel_token.cancel();
        session.pump.abort();
        if let Err(err) = (&mut session.pump).await {
            if !err.is_cancelled() {
                warn!("Sample pump for session {} failed: {err}", session.id);
            }
        }
        if let Some(handle) = session.handle.take() {
            self.device.stop(&handle).await;
        }
        info!("Scanner session {} stopped", session.id);
    }
}

async fn sample_pump(
    inner: Weak<Mutex<ScannerInner>>,
    mut detections: mpsc::Receiver<DecodeSample>,
    cancel_token: CancellationToken,
    events: broadcast::Sender<ScannerEvent>,
    session_id: String,
) {
    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => break,
            next = detections.recv() => {
                let Some(sample) = next else {
                    log_info!("Detection stream ended for session {}", session_id);
                    let _ = events.send(ScannerEvent::StreamEnded);
                    break;
                };
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                let mut guard = inner.lock().await;

                // Stale session
                if guard.session.as_ref().map(|s| s.id.as_str()) != Some(session_id.as_str()) {
                    break;
                }

                match guard.engine.observe(&sample) {
                    SampleOutcome::Accepted(candidate) => {
                        info!(
                            "Candidate {} accepted (confidence {:.2}) in session {}",
                            candidate.code, candidate.confidence, session_id
                        );
                        let _ = events.send(ScannerEvent::CandidateReady {
                            code: candidate.code,
                            confidence: candidate.confidence,
                        });
                    }
                    SampleOutcome::Buffered { repeats } => {
                        log_debug!("Buffered {} ({} in window)", sample.code, repeats);
                    }
                    SampleOutcome::Rejected | SampleOutcome::Ignored => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;
    use crate::scanner::scripted::{FailurePoint, ScriptedDevice};
    use crate::scanner::state::DecodeSample;

    const EAN: &str = "4006381333931";

    fn confident_run(code: &str, n: usize) -> Vec<DecodeSample> {
        (0..n).map(|_| DecodeSample::new(code, 0.92)).collect()
    }

    fn controller(device: &ScriptedDevice) -> ScannerController {
        ScannerController::new(
            Arc::new(device.clone()),
            CaptureConfig::default(),
            ScanPolicy::default(),
        )
    }

    async fn next_raw_event(rx: &mut broadcast::Receiver<ScannerEvent>) -> ScannerEvent {
        timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("event within deadline")
            .expect("event channel open")
    }

    /// Next event other than end-of-stream, which races with everything else.
    async fn next_event(rx: &mut broadcast::Receiver<ScannerEvent>) -> ScannerEvent {
        loop {
            match next_raw_event(rx).await {
                ScannerEvent::StreamEnded => continue,
                event => return event,
            }
        }
    }

    #[tokio::test]
    async fn confirms_a_debounced_code_and_releases_device() {
        let mut script = vec![
            DecodeSample::new("12345", 0.99),
            DecodeSample::new("5901234123457", 0.95),
        ];
        script.extend(confident_run(EAN, 3));
        let device = ScriptedDevice::new(script);
        let scanner = controller(&device);

        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        scanner.on_confirmed(move |code| sink.lock().unwrap().push(code.to_string()));

        let mut events = scanner.subscribe();
        scanner.initialize().await.unwrap();

        assert_eq!(
            next_event(&mut events).await,
            ScannerEvent::CandidateReady {
                code: EAN.into(),
                confidence: 0.92
            }
        );
        let snapshot = scanner.snapshot().await;
        assert_eq!(snapshot.phase, ScanPhase::PendingConfirmation);
        assert_eq!(snapshot.buffered.len(), 4);

        assert_eq!(scanner.confirm().await.as_deref(), Some(EAN));
        assert_eq!(
            next_event(&mut events).await,
            ScannerEvent::Confirmed { code: EAN.into() }
        );
        assert_eq!(seen.lock().unwrap().as_slice(), [EAN.to_string()]);
        assert_eq!(device.active_sessions(), 0);
        assert_eq!(scanner.snapshot().await.phase, ScanPhase::Closed);
    }

    #[tokio::test]
    async fn confirm_without_candidate_is_a_no_op() {
        let device = ScriptedDevice::new(Vec::new());
        let scanner = controller(&device);
        scanner.initialize().await.unwrap();

        assert_eq!(scanner.confirm().await, None);
        assert!(scanner.is_active().await);
        assert_eq!(device.stop_count(), 0);
    }

    #[tokio::test]
    async fn close_before_initialize_does_not_fail() {
        let device = ScriptedDevice::new(Vec::new());
        let scanner = controller(&device);
        scanner.close().await;
        scanner.close().await;
        assert_eq!(device.stop_count(), 0);
        assert_eq!(scanner.snapshot().await.phase, ScanPhase::Closed);
    }

    #[tokio::test]
    async fn reinitialize_stops_the_previous_session_first() {
        let device = ScriptedDevice::new(Vec::new());
        let scanner = controller(&device);
        scanner.initialize().await.unwrap();
        scanner.initialize().await.unwrap();
        scanner.retry().await.unwrap();

        assert_eq!(device.initialize_count(), 3);
        assert_eq!(device.stop_count(), 2);
        assert_eq!(device.active_sessions(), 1);

        scanner.close().await;
        assert_eq!(device.active_sessions(), 0);
    }

    #[tokio::test]
    async fn retry_discards_the_pending_candidate() {
        let device = ScriptedDevice::new(confident_run(EAN, 3));
        let scanner = controller(&device);
        let mut events = scanner.subscribe();

        scanner.initialize().await.unwrap();
        assert!(matches!(
            next_event(&mut events).await,
            ScannerEvent::CandidateReady { .. }
        ));

        // The replay restarts, so the code must earn three fresh repeats.
        scanner.retry().await.unwrap();
        assert!(matches!(
            next_event(&mut events).await,
            ScannerEvent::CandidateReady { .. }
        ));
        let snapshot = scanner.snapshot().await;
        assert_eq!(snapshot.buffered, vec![EAN.to_string(); 3]);
    }

    #[tokio::test]
    async fn dropping_the_controller_releases_the_device() {
        let device = ScriptedDevice::new(Vec::new());
        {
            let scanner = controller(&device);
            scanner.initialize().await.unwrap();
            assert_eq!(device.active_sessions(), 1);
        }

        timeout(Duration::from_secs(2), async {
            while device.active_sessions() > 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("device released after drop");
        assert_eq!(device.stop_count(), 1);
    }

    #[tokio::test]
    async fn explicit_close_does_not_stop_twice_on_drop() {
        let device = ScriptedDevice::new(Vec::new());
        {
            let scanner = controller(&device);
            scanner.initialize().await.unwrap();
            scanner.close().await;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(device.stop_count(), 1);
        assert_eq!(device.active_sessions(), 0);
    }

    #[tokio::test]
    async fn exhausted_script_reports_stream_end_without_candidate() {
        let device = ScriptedDevice::new(vec![
            DecodeSample::new(EAN, 0.95),
            DecodeSample::new("96385074", 0.95),
        ]);
        let scanner = controller(&device);
        let mut events = scanner.subscribe();
        scanner.initialize().await.unwrap();

        assert_eq!(next_raw_event(&mut events).await, ScannerEvent::StreamEnded);
        let snapshot = scanner.snapshot().await;
        assert_eq!(snapshot.phase, ScanPhase::Scanning);
        assert_eq!(snapshot.buffered.len(), 2);
        assert!(scanner.is_active().await);
    }

    #[tokio::test]
    async fn device_failure_becomes_status_text_and_stays_retryable() {
        let device = ScriptedDevice::new(Vec::new()).failing_at(FailurePoint::Acquire);
        let scanner = controller(&device);
        let mut events = scanner.subscribe();

        let err = scanner.initialize().await.unwrap_err();
        assert!(matches!(err, ScanError::Device(_)));
        assert!(matches!(
            next_event(&mut events).await,
            ScannerEvent::Failed { .. }
        ));

        let snapshot = scanner.snapshot().await;
        assert!(snapshot
            .status_message
            .as_deref()
            .unwrap()
            .starts_with("Failed to initialize camera"));
        assert!(!scanner.is_active().await);

        assert!(scanner.retry().await.is_err());
        scanner.close().await;
        assert_eq!(scanner.snapshot().await.status_message, None);
    }

    #[tokio::test]
    async fn decoder_failure_is_reported_separately() {
        let device = ScriptedDevice::new(Vec::new()).failing_at(FailurePoint::DecoderStart);
        let scanner = controller(&device);
        let err = scanner.initialize().await.unwrap_err();
        assert!(matches!(err, ScanError::DecodeStart(_)));
        assert!(scanner
            .snapshot()
            .await
            .status_message
            .unwrap()
            .contains("decoder"));
    }
}
