//! Fehlertypen fuer Sprachrohr
//!
//! Zentraler Fehler-Enum fuer alles, was an der Grenze eines Anrufs
//! schiefgehen kann. Die Audio- und Protokoll-Crates definieren eigene
//! Fehler, die hierher konvertiert werden koennen.

use thiserror::Error;

/// Globaler Result-Alias fuer Sprachrohr
pub type Result<T> = std::result::Result<T, SprachrohrError>;

/// Alle moeglichen Fehler im Sprachrohr-System
#[derive(Debug, Error)]
pub enum SprachrohrError {
    // --- Konfiguration ---
    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),

    #[error("Ungueltige Abtastrate: {0} Hz")]
    UngueltigeAbtastrate(u32),

    // --- Transport ---
    #[error("Transport getrennt: {0}")]
    TransportGetrennt(String),

    #[error("Ungueltiges Paket: {0}")]
    UngueltigesPaket(String),

    // --- Audio ---
    #[error("Audiofehler: {0}")]
    Audio(String),

    #[error("Denoiser konnte nicht erstellt werden: {0}")]
    DenoiserInit(String),

    // --- Intern ---
    #[error("Interner Fehler: {0}")]
    Intern(String),

    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl SprachrohrError {
    /// Erstellt einen internen Fehler aus einer beliebigen Nachricht
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    /// Gibt true zurueck wenn der Fehler beim Aufbau einer Ressource auftrat
    /// und der Anruf damit nicht fortgesetzt werden kann
    pub fn ist_fatal(&self) -> bool {
        matches!(
            self,
            Self::DenoiserInit(_) | Self::Konfiguration(_) | Self::UngueltigeAbtastrate(_)
        )
    }
}
