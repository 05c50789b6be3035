//! RNNoise ueber `nnnoiseless` (reines Rust, keine native Bibliothek)
//!
//! Das Modell erwartet Samples im i16-Wertebereich als f32. Die Pipeline
//! arbeitet normalisiert, deshalb wird pro Frame hin- und zurueckskaliert.

use nnnoiseless::DenoiseState;

use super::Denoiser;
use crate::error::{AudioError, AudioResult};
use crate::frame::{AudioFrame, FRAME_SIZE};

const MODELL_SKALA: f32 = 32768.0;

pub struct RnnoiseDenoiser {
    state: Box<DenoiseState<'static>>,
    eingang: [f32; FRAME_SIZE],
    ausgang: [f32; FRAME_SIZE],
    /// Sprachwahrscheinlichkeit des letzten Frames (0.0–1.0)
    letzte_vad: f32,
}

impl RnnoiseDenoiser {
    pub fn new() -> AudioResult<Self> {
        if DenoiseState::FRAME_SIZE != FRAME_SIZE {
            return Err(AudioError::DenoiserInit(format!(
                "RNNoise erwartet {} Samples pro Frame, Pipeline liefert {FRAME_SIZE}",
                DenoiseState::FRAME_SIZE
            )));
        }
        Ok(Self {
            state: DenoiseState::new(),
            eingang: [0.0; FRAME_SIZE],
            ausgang: [0.0; FRAME_SIZE],
            letzte_vad: 0.0,
        })
    }

    pub fn letzte_vad(&self) -> f32 {
        self.letzte_vad
    }
}

impl Denoiser for RnnoiseDenoiser {
    fn process_frame_in_place(&mut self, frame: &mut AudioFrame) {
        for (ziel, &s) in self.eingang.iter_mut().zip(frame.iter()) {
            *ziel = s * MODELL_SKALA;
        }
        self.letzte_vad = self.state.process_frame(&mut self.ausgang, &self.eingang);
        for (ziel, &s) in frame.iter_mut().zip(self.ausgang.iter()) {
            *ziel = s / MODELL_SKALA;
        }
    }

    fn reset(&mut self) {
        self.state = DenoiseState::new();
        self.letzte_vad = 0.0;
    }

    fn name(&self) -> &'static str {
        "rnnoise"
    }
}
