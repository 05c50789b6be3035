//! Fehlertypen fuer die sendeseitige Audio-Pipeline

use sprachrohr_core::SprachrohrError;
use thiserror::Error;

/// Alle moeglichen Fehler der Audio-Pipeline
///
/// DSP-Zustaende wie "noch nicht genug Daten" sind keine Fehler und
/// tauchen hier nicht auf.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Denoiser konnte nicht erstellt werden: {0}")]
    DenoiserInit(String),

    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),

    #[error("Transport geschlossen")]
    TransportGeschlossen,

    #[error("Keine Audiodaten zum Speichern")]
    KeineDaten,

    #[error("Nicht unterstuetztes WAV-Format: {0}")]
    WavFormat(String),

    #[error("WAV-Fehler: {0}")]
    Wav(#[from] hound::Error),

    #[error("Paket-Fehler: {0}")]
    Paket(#[from] sprachrohr_protocol::WireError),

    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unerwarteter Fehler: {0}")]
    Anyhow(#[from] anyhow::Error),
}

pub type AudioResult<T> = Result<T, AudioError>;

impl From<AudioError> for SprachrohrError {
    fn from(e: AudioError) -> Self {
        match e {
            AudioError::DenoiserInit(grund) => SprachrohrError::DenoiserInit(grund),
            AudioError::Konfiguration(grund) => SprachrohrError::Konfiguration(grund),
            AudioError::TransportGeschlossen => {
                SprachrohrError::TransportGetrennt("Sende-Kanal geschlossen".into())
            }
            AudioError::Io(io) => SprachrohrError::Io(io),
            andere => SprachrohrError::Audio(andere.to_string()),
        }
    }
}
