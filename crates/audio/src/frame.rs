//! Feste Frames fuer den Denoiser
//!
//! Capture-Geraete liefern beliebig grosse Puffer (typisch 256–512 Samples),
//! der Denoiser braucht exakt 480 Samples bei 48 kHz. Der
//! `FrameAccumulator` sammelt den Strom und gibt nur volle Frames heraus;
//! der Rest (< 1 Frame) bleibt als Carry fuer den naechsten Aufruf liegen.

use std::collections::VecDeque;

/// Native Abtastrate des Denoisers in Hz
pub const NATIVE_RATE: u32 = 48_000;

/// Frame-Groesse des Denoisers (10 ms bei 48 kHz)
pub const FRAME_SIZE: usize = 480;

/// Ein Frame in nativer Rate – die Laenge ist per Typ garantiert
pub type AudioFrame = [f32; FRAME_SIZE];

/// Puffert einen Sample-Strom in feste Frames
#[derive(Debug, Default)]
pub struct FrameAccumulator {
    carry: VecDeque<f32>,
}

impl FrameAccumulator {
    pub fn new() -> Self {
        Self {
            carry: VecDeque::with_capacity(FRAME_SIZE * 4),
        }
    }

    /// Haengt Samples an den Carry an
    pub fn push(&mut self, samples: &[f32]) {
        self.carry.extend(samples.iter().copied());
    }

    /// Entnimmt den aeltesten vollen Frame, falls vorhanden
    pub fn pop_frame(&mut self) -> Option<AudioFrame> {
        if self.carry.len() < FRAME_SIZE {
            return None;
        }
        let mut frame = [0.0f32; FRAME_SIZE];
        for (ziel, s) in frame.iter_mut().zip(self.carry.drain(..FRAME_SIZE)) {
            *ziel = s;
        }
        Some(frame)
    }

    /// Anzahl vollstaendiger Frames, die gerade entnommen werden koennten
    pub fn volle_frames(&self) -> usize {
        self.carry.len() / FRAME_SIZE
    }

    /// Anzahl gepufferter Samples
    pub fn len(&self) -> usize {
        self.carry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.carry.is_empty()
    }

    /// Verwirft den Carry (nicht verarbeitete Samples gehen verloren)
    pub fn clear(&mut self) {
        self.carry.clear();
    }
}
