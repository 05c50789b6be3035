//! sprachrohr-audio – Sendeseitige Audio-Pipeline
//!
//! - Konvertierung i16 <-> normalisierte f32
//! - Lineares Resampling zwischen beliebigen Raten
//! - Framing auf die feste Denoiser-Groesse (480 Samples @ 48 kHz)
//! - Rauschunterdrueckung (RNNoise oder energiebasiert)
//! - `AudioSender`: Capture-Puffer -> Transport
//! - WAV-Export und -Import

pub mod convert;
pub mod dsp;
pub mod error;
pub mod frame;
pub mod resampler;
pub mod sender;
pub mod suppressor;
pub mod wav;

pub use convert::{f32_to_i16, i16_to_f32, sample_to_i16};
pub use dsp::{DenoiseBackend, Denoiser, DenoiserArt, SuppressionLevel};
pub use error::{AudioError, AudioResult};
pub use frame::{AudioFrame, FrameAccumulator, FRAME_SIZE, NATIVE_RATE};
pub use resampler::resample;
pub use sender::{AudioSender, SenderStatistik};
pub use suppressor::{NoiseSuppressor, SuppressorHandle, SuppressorStatistik};
pub use wav::{load_wav, save_wav, WavDaten};
