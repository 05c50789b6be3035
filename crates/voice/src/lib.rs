//! sprachrohr-voice – Empfangsseitige Audio-Pipeline
//!
//! ## Module
//! - [`jitter_buffer`] – Zeitstempel-sortierter Paketpuffer mit Pre-Roll
//! - [`playout`] – Render-Takt mit Stille- bzw. Halte-Politik
//! - [`receiver`] – Dekodierung und Verteilung empfangener Pakete

pub mod jitter_buffer;
pub mod playout;
pub mod receiver;

pub use jitter_buffer::{JitterBuffer, JitterBufferStatistik, Paket};
pub use playout::{FrameArt, PlayoutFrame, PlayoutPolitik, PlayoutScheduler, PlayoutStatistik};
pub use receiver::{AudioCallback, AudioReceiver, ReceiverStatistik};
