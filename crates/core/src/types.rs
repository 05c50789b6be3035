//! Gemeinsame Typen fuer Sprachrohr
//!
//! Newtype-Pattern fuer Abtastraten und Kennungen, damit Hz-Werte,
//! Anruf-IDs und Senderkennungen zur Compilezeit nicht verwechselt werden.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, SprachrohrError};

/// Abtastrate in Hz (immer > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct SampleRate(u32);

impl SampleRate {
    /// Native Rate des Denoisers (RNNoise)
    pub const HZ_48000: Self = Self(48_000);
    /// Typische Rate von Consumer-Mikrofonen
    pub const HZ_44100: Self = Self(44_100);
    /// Schmalband-Telefonie
    pub const HZ_16000: Self = Self(16_000);

    /// Erstellt eine Abtastrate; 0 Hz ist ungueltig
    pub fn neu(hz: u32) -> Result<Self> {
        if hz == 0 {
            return Err(SprachrohrError::UngueltigeAbtastrate(hz));
        }
        Ok(Self(hz))
    }

    /// Gibt den Wert in Hz zurueck
    pub fn hz(self) -> u32 {
        self.0
    }

    /// Anzahl Samples fuer eine Dauer in Millisekunden (abgerundet)
    pub fn samples_fuer_ms(self, ms: u32) -> usize {
        (self.0 as u64 * ms as u64 / 1000) as usize
    }
}

impl TryFrom<u32> for SampleRate {
    type Error = SprachrohrError;

    fn try_from(hz: u32) -> Result<Self> {
        Self::neu(hz)
    }
}

impl From<SampleRate> for u32 {
    fn from(rate: SampleRate) -> u32 {
        rate.0
    }
}

impl std::fmt::Display for SampleRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} Hz", self.0)
    }
}

/// Eindeutige Anruf-ID (fuer Log-Spans und Berichte)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallId(pub Uuid);

impl CallId {
    /// Erstellt eine neue zufaellige CallId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for CallId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "call:{}", self.0)
    }
}

/// Synchronisation Source – Senderkennung im Paket-Header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ssrc(pub u32);

impl Ssrc {
    /// Leitet eine Senderkennung aus der Anruf-ID und der Richtung ab
    pub fn fuer_anruf(call: CallId, richtung: u8) -> Self {
        let bytes = call.0.as_bytes();
        let basis = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        Self(basis ^ richtung as u32)
    }
}

impl std::fmt::Display for Ssrc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ssrc:{:08x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abtastrate_null_ungueltig() {
        assert!(SampleRate::neu(0).is_err());
        assert_eq!(SampleRate::neu(44_100).unwrap(), SampleRate::HZ_44100);
    }

    #[test]
    fn samples_fuer_ms() {
        assert_eq!(SampleRate::HZ_48000.samples_fuer_ms(10), 480);
        assert_eq!(SampleRate::HZ_44100.samples_fuer_ms(10), 441);
    }

    #[test]
    fn abtastrate_serde_validiert() {
        let rate: SampleRate = serde_json::from_str("16000").unwrap();
        assert_eq!(rate, SampleRate::HZ_16000);
        assert!(serde_json::from_str::<SampleRate>("0").is_err());
        assert_eq!(serde_json::to_string(&rate).unwrap(), "16000");
    }

    #[test]
    fn call_id_eindeutig() {
        let a = CallId::new();
        let b = CallId::new();
        assert_ne!(a, b, "Zwei neue CallIds muessen verschieden sein");
    }

    #[test]
    fn ssrc_richtungen_verschieden() {
        let call = CallId(Uuid::nil());
        assert_ne!(Ssrc::fuer_anruf(call, 0), Ssrc::fuer_anruf(call, 1));
        assert!(Ssrc::fuer_anruf(call, 1).to_string().starts_with("ssrc:"));
    }
}
