//! Denoiser-Backends
//!
//! Alle Backends verarbeiten genau einen Frame (480 Samples, 48 kHz,
//! normalisiert auf [-1.0, 1.0]) in-place. Eine Instanz wird nur
//! sequenziell benutzt und behaelt ihren Zustand zwischen Frames.

pub mod rnnoise;
pub mod spectral;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AudioError, AudioResult};
use crate::frame::AudioFrame;

pub use rnnoise::RnnoiseDenoiser;
pub use spectral::{SpectralDenoiser, SuppressionLevel};

/// Schmale Schnittstelle zum Rauschunterdruecker
pub trait Denoiser: Send {
    /// Entrauscht einen Frame in-place
    fn process_frame_in_place(&mut self, frame: &mut AudioFrame);

    /// Setzt den internen Modellzustand zurueck
    fn reset(&mut self);

    /// Kurzname fuer Logs
    fn name(&self) -> &'static str;
}

/// Auswahl des Backends in der Konfiguration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DenoiserArt {
    #[default]
    Rnnoise,
    Spektral,
}

impl FromStr for DenoiserArt {
    type Err = AudioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rnnoise" => Ok(Self::Rnnoise),
            "spektral" | "spectral" => Ok(Self::Spektral),
            andere => Err(AudioError::DenoiserInit(format!(
                "Unbekanntes Denoiser-Backend '{andere}'"
            ))),
        }
    }
}

impl fmt::Display for DenoiserArt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rnnoise => write!(f, "rnnoise"),
            Self::Spektral => write!(f, "spektral"),
        }
    }
}

/// Statisch ausgewaehltes Backend
pub enum DenoiseBackend {
    Rnnoise(RnnoiseDenoiser),
    Spektral(SpectralDenoiser),
}

impl DenoiseBackend {
    /// Erstellt das Backend passend zur Konfiguration
    pub fn erstellen(art: DenoiserArt, stufe: SuppressionLevel) -> AudioResult<Self> {
        let backend = match art {
            DenoiserArt::Rnnoise => Self::Rnnoise(RnnoiseDenoiser::new()?),
            DenoiserArt::Spektral => Self::Spektral(SpectralDenoiser::new(stufe)),
        };
        tracing::debug!(backend = backend.name(), stufe = ?stufe, "Denoiser erstellt");
        Ok(backend)
    }
}

impl Denoiser for DenoiseBackend {
    fn process_frame_in_place(&mut self, frame: &mut AudioFrame) {
        match self {
            Self::Rnnoise(d) => d.process_frame_in_place(frame),
            Self::Spektral(d) => d.process_frame_in_place(frame),
        }
    }

    fn reset(&mut self) {
        match self {
            Self::Rnnoise(d) => d.reset(),
            Self::Spektral(d) => d.reset(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Rnnoise(d) => d.name(),
            Self::Spektral(d) => d.name(),
        }
    }
}
