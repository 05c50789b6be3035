//! Energiebasierte Rauschunterdrueckung
//!
//! Naeherung der spektralen Subtraktion im Zeitbereich: waehrend leiser
//! Frames wird ein Rausch-RMS gelernt, danach jeder Frame mit
//! `max(floor, 1 - alpha * rauschen / signal)` gewichtet. Kein Modell,
//! keine Latenz ueber den Frame hinaus.

use serde::{Deserialize, Serialize};

use super::Denoiser;
use crate::frame::AudioFrame;

/// Staerke der Unterdrueckung
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuppressionLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl SuppressionLevel {
    /// Subtraktionsfaktor
    fn alpha(&self) -> f32 {
        match self {
            Self::Low => 1.5,
            Self::Medium => 2.5,
            Self::High => 4.0,
        }
    }

    /// Untergrenze des Gains (gegen "musical noise")
    fn gain_floor(&self) -> f32 {
        match self {
            Self::Low => 0.2,
            Self::Medium => 0.1,
            Self::High => 0.05,
        }
    }
}

pub struct SpectralDenoiser {
    stufe: SuppressionLevel,
    rausch_rms: f32,
    glaettung: f32,
    stille_schwelle: f32,
}

impl SpectralDenoiser {
    pub fn new(stufe: SuppressionLevel) -> Self {
        Self {
            stufe,
            rausch_rms: 0.0,
            glaettung: 0.95,
            stille_schwelle: 0.02,
        }
    }

    /// Frames mit RMS unter diesem Wert gelten als Rauschen
    pub fn mit_stille_schwelle(mut self, schwelle: f32) -> Self {
        self.stille_schwelle = schwelle;
        self
    }

    pub fn rausch_schaetzung(&self) -> f32 {
        self.rausch_rms
    }

    fn rms(frame: &[f32]) -> f32 {
        let summe: f32 = frame.iter().map(|s| s * s).sum();
        (summe / frame.len() as f32).sqrt()
    }
}

impl Denoiser for SpectralDenoiser {
    fn process_frame_in_place(&mut self, frame: &mut AudioFrame) {
        let rms = Self::rms(frame);

        if rms < self.stille_schwelle {
            self.rausch_rms = self.glaettung * self.rausch_rms + (1.0 - self.glaettung) * rms;
        }
        if self.rausch_rms < 1e-7 {
            return;
        }

        let gain = if rms > 1e-7 {
            (1.0 - self.stufe.alpha() * self.rausch_rms / rms).max(self.stufe.gain_floor())
        } else {
            self.stufe.gain_floor()
        };
        for s in frame.iter_mut() {
            *s *= gain;
        }
    }

    fn reset(&mut self) {
        self.rausch_rms = 0.0;
    }

    fn name(&self) -> &'static str {
        "spektral"
    }
}
