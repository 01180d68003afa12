pub mod buffer;
pub mod capture;
pub mod controller;
pub mod engine;
pub mod scripted;
pub mod state;
pub mod validation;

pub use buffer::DecodeBuffer;
pub use capture::{CaptureConfig, CaptureDevice, CaptureHandle, CaptureSession, FacingMode, Symbology};
pub use controller::{ScannerController, ScannerEvent, ScannerSnapshot};
pub use engine::ConfirmationEngine;
pub use scripted::{FailurePoint, MisreadInjection, ScriptedDevice};
pub use state::{ConfirmationCandidate, DecodeSample, SampleOutcome, ScanPhase, ScanPolicy, ScanState};
pub use validation::is_valid_code;
