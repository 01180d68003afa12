use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::ScanError;

use super::state::DecodeSample;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Symbology {
    Ean13,
    Ean8,
    Code128,
    Code39,
    UpcA,
    UpcE,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum FacingMode {
    /// Rear camera.
    Environment,
    User,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolutionHint {
    pub width: u32,
    pub height: u32,
}

/// Everything the capture collaborator needs to bind a camera and start decoding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptureConfig {
    /// Identifier of the surface the live feed renders into.
    pub target: String,
    pub facing_mode: FacingMode,
    pub min_resolution: ResolutionHint,
    pub ideal_resolution: ResolutionHint,
    pub formats: Vec<Symbology>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            target: "scanner-viewport".into(),
            facing_mode: FacingMode::Environment,
            min_resolution: ResolutionHint {
                width: 640,
                height: 480,
            },
            ideal_resolution: ResolutionHint {
                width: 1280,
                height: 720,
            },
            formats: vec![
                Symbology::Ean13,
                Symbology::Ean8,
                Symbology::Code128,
                Symbology::Code39,
                Symbology::UpcA,
                Symbology::UpcE,
            ],
        }
    }
}

/// Opaque token for one bound capture session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CaptureHandle {
    pub id: String,
}

/// A started session: the handle to stop it with and the per-frame detection stream.
///
/// The stream ends when the device stops producing frames.
pub struct CaptureSession {
    pub handle: CaptureHandle,
    pub detections: mpsc::Receiver<DecodeSample>,
}

/// Camera plus barcode decoder.
///
/// `initialize` reports [`ScanError::Device`] when the camera cannot be acquired and
/// [`ScanError::DecodeStart`] when the decoder fails after acquisition. `stop` must be
/// safe to call on a handle whose session already ended.
#[async_trait]
pub trait CaptureDevice: Send + Sync {
    async fn initialize(&self, config: &CaptureConfig) -> Result<CaptureSession, ScanError>;

    async fn stop(&self, handle: &CaptureHandle);
}
