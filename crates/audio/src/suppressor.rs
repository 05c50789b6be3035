//! Rauschunterdrueckung fuer beliebige Capture-Puffer
//!
//! Verbindet Konvertierung, Resampling und Framing mit einem
//! zustandsbehafteten [`Denoiser`]:
//!
//! ```text
//! i16 @ in_rate -> f32 -> 48 kHz -> Carry -> 480er Frames -> Denoiser
//!                                                  |
//!          i16 @ out_rate <- f32 <- out_rate <- verarbeitete Frames
//! ```
//!
//! Solange kein voller Frame zusammenkommt, liefert `process` eine leere
//! Ausgabe. Das ist kein Fehler und keine Stille, sondern "noch puffernd".

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use crate::convert::{f32_to_i16, i16_to_f32};
use crate::dsp::{DenoiseBackend, Denoiser, DenoiserArt, SuppressionLevel};
use crate::error::AudioResult;
use crate::frame::{FrameAccumulator, FRAME_SIZE, NATIVE_RATE};
use crate::resampler::resample;

/// Alle N Frames ein Diagnose-Log
const LOG_INTERVALL_FRAMES: u64 = 500;

#[derive(Debug)]
struct Steuerung {
    aktiv: AtomicBool,
    /// Carry beim naechsten `process` verwerfen
    verwerfen: AtomicBool,
}

/// Thread-sicherer Schalter fuer einen [`NoiseSuppressor`]
///
/// Klone zeigen auf denselben Zustand. Aenderungen wirken ab dem naechsten
/// `process`-Aufruf, ein laufender Aufruf wird nicht unterbrochen.
#[derive(Debug, Clone)]
pub struct SuppressorHandle {
    inner: Arc<Steuerung>,
}

impl SuppressorHandle {
    fn neu(aktiv: bool) -> Self {
        Self {
            inner: Arc::new(Steuerung {
                aktiv: AtomicBool::new(aktiv),
                verwerfen: AtomicBool::new(false),
            }),
        }
    }

    /// Schaltet die Unterdrueckung ein oder aus
    ///
    /// Beim Ausschalten wird der Carry verworfen, nicht nachgeliefert.
    pub fn set_enabled(&self, aktiv: bool) {
        let vorher = self.inner.aktiv.swap(aktiv, Ordering::AcqRel);
        if vorher && !aktiv {
            self.inner.verwerfen.store(true, Ordering::Release);
        }
        if vorher != aktiv {
            info!(aktiv, "Rauschunterdrueckung umgeschaltet");
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.aktiv.load(Ordering::Acquire)
    }
}

/// Momentaufnahme fuer Metriken
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SuppressorStatistik {
    pub verarbeitete_frames: u64,
    pub gepufferte_samples: usize,
    pub verworfene_samples: u64,
}

/// Rauschunterdruecker einer Audio-Richtung
///
/// Genau ein Erzeuger ruft `process` auf (`&mut self`), der Schalter ist
/// ueber [`SuppressorHandle`] von ueberall erreichbar.
pub struct NoiseSuppressor<D: Denoiser = DenoiseBackend> {
    denoiser: D,
    carry: FrameAccumulator,
    steuerung: SuppressorHandle,
    verarbeitete_frames: u64,
    verworfene_samples: u64,
}

impl NoiseSuppressor<DenoiseBackend> {
    /// Erstellt den Unterdruecker mit dem konfigurierten Backend
    ///
    /// # Fehler
    /// `DenoiserInit` wenn das Backend nicht erstellt werden kann
    pub fn neu(art: DenoiserArt, stufe: SuppressionLevel) -> AudioResult<Self> {
        Ok(Self::mit_denoiser(DenoiseBackend::erstellen(art, stufe)?))
    }
}

impl<D: Denoiser> NoiseSuppressor<D> {
    /// Erstellt den Unterdruecker um einen bereits gebauten Denoiser
    pub fn mit_denoiser(denoiser: D) -> Self {
        Self {
            denoiser,
            carry: FrameAccumulator::new(),
            steuerung: SuppressorHandle::neu(true),
            verarbeitete_frames: 0,
            verworfene_samples: 0,
        }
    }

    /// Schalter zum Teilen mit anderen Threads
    pub fn handle(&self) -> SuppressorHandle {
        self.steuerung.clone()
    }

    pub fn set_enabled(&self, aktiv: bool) {
        self.steuerung.set_enabled(aktiv);
    }

    pub fn is_enabled(&self) -> bool {
        self.steuerung.is_enabled()
    }

    /// Verarbeitet einen Capture-Puffer
    ///
    /// Leere Ausgabe bei aktiver Unterdrueckung heisst: noch kein voller
    /// Frame beisammen, beim naechsten Aufruf wieder versuchen.
    pub fn process(&mut self, samples: &[i16], input_rate: u32, output_rate: u32) -> Vec<i16> {
        if self.steuerung.inner.verwerfen.swap(false, Ordering::AcqRel) {
            self.carry_verwerfen();
        }

        if samples.is_empty() {
            return Vec::new();
        }

        if !self.is_enabled() {
            return Self::durchreichen(samples, input_rate, output_rate);
        }

        let normalisiert = i16_to_f32(samples);
        let nativ = resample(&normalisiert, input_rate, NATIVE_RATE);
        self.carry.push(&nativ);

        let mut verarbeitet = Vec::with_capacity(self.carry.volle_frames() * FRAME_SIZE);
        while let Some(mut frame) = self.carry.pop_frame() {
            self.denoiser.process_frame_in_place(&mut frame);
            verarbeitet.extend_from_slice(&frame);
            self.verarbeitete_frames += 1;

            if self.verarbeitete_frames % LOG_INTERVALL_FRAMES == 0 {
                debug!(
                    backend = self.denoiser.name(),
                    frames = self.verarbeitete_frames,
                    carry = self.carry.len(),
                    "Rauschunterdrueckung laeuft"
                );
            }
        }

        if verarbeitet.is_empty() {
            return Vec::new();
        }

        let ausgabe = resample(&verarbeitet, NATIVE_RATE, output_rate);
        f32_to_i16(&ausgabe)
    }

    /// Verwirft Carry und Modellzustand, z.B. bei Stream-Neustart
    pub fn reset(&mut self) {
        self.carry_verwerfen();
        self.denoiser.reset();
    }

    pub fn statistik(&self) -> SuppressorStatistik {
        SuppressorStatistik {
            verarbeitete_frames: self.verarbeitete_frames,
            gepufferte_samples: self.carry.len(),
            verworfene_samples: self.verworfene_samples,
        }
    }

    fn carry_verwerfen(&mut self) {
        if !self.carry.is_empty() {
            debug!(samples = self.carry.len(), "Carry verworfen");
            self.verworfene_samples += self.carry.len() as u64;
            self.carry.clear();
        }
    }

    fn durchreichen(samples: &[i16], input_rate: u32, output_rate: u32) -> Vec<i16> {
        if input_rate == output_rate {
            return samples.to_vec();
        }
        let normalisiert = i16_to_f32(samples);
        f32_to_i16(&resample(&normalisiert, input_rate, output_rate))
    }
}
