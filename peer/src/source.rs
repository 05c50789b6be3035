//! Capture-Quellen des Peers
//!
//! Ersetzt das Geraet: liefert Puffer wechselnder Groesse (wie ein echtes
//! Audio-Backend mit 256/512 Frames) bei der Capture-Rate.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sprachrohr_audio::{load_wav, sample_to_i16, AudioResult};
use std::f32::consts::TAU;

/// Sinuston plus gleichverteiltes Rauschen
pub struct SynthetischesMikrofon {
    rate: u32,
    ton_hz: f32,
    rauschpegel: f32,
    phase: f32,
    rng: StdRng,
}

impl SynthetischesMikrofon {
    pub fn neu(rate: u32, ton_hz: f32, rauschpegel: f32, seed: u64) -> Self {
        Self {
            rate,
            ton_hz,
            rauschpegel,
            phase: 0.0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn erzeugen(&mut self, anzahl: usize) -> Vec<i16> {
        let schritt = TAU * self.ton_hz / self.rate as f32;
        (0..anzahl)
            .map(|_| {
                let ton = 0.3 * self.phase.sin();
                self.phase = (self.phase + schritt) % TAU;
                let rauschen = if self.rauschpegel > 0.0 {
                    self.rng.gen_range(-self.rauschpegel..self.rauschpegel)
                } else {
                    0.0
                };
                sample_to_i16(ton + rauschen)
            })
            .collect()
    }
}

/// Liefert eine WAV-Datei pufferweise aus
pub struct WavQuelle {
    samples: Vec<i16>,
    pos: usize,
    rate: u32,
}

impl WavQuelle {
    pub fn laden(pfad: &str) -> AudioResult<Self> {
        let daten = load_wav(pfad)?;
        Ok(Self {
            samples: daten.samples,
            pos: 0,
            rate: daten.sample_rate,
        })
    }

    fn erzeugen(&mut self, anzahl: usize) -> Option<Vec<i16>> {
        if self.pos >= self.samples.len() {
            return None;
        }
        let ende = (self.pos + anzahl).min(self.samples.len());
        let puffer = self.samples[self.pos..ende].to_vec();
        self.pos = ende;
        Some(puffer)
    }
}

enum Art {
    Synthetisch(SynthetischesMikrofon),
    Wav(WavQuelle),
}

/// Capture-Quelle mit reihum wechselnden Puffergroessen
pub struct CaptureQuelle {
    art: Art,
    puffer_groessen: Vec<usize>,
    index: usize,
}

impl CaptureQuelle {
    pub fn synthetisch(mikrofon: SynthetischesMikrofon, puffer_groessen: Vec<usize>) -> Self {
        Self {
            art: Art::Synthetisch(mikrofon),
            puffer_groessen,
            index: 0,
        }
    }

    pub fn wav(quelle: WavQuelle, puffer_groessen: Vec<usize>) -> Self {
        Self {
            art: Art::Wav(quelle),
            puffer_groessen,
            index: 0,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        match &self.art {
            Art::Synthetisch(m) => m.rate,
            Art::Wav(w) => w.rate,
        }
    }

    /// Naechster Puffer; `None` wenn eine WAV-Quelle erschoepft ist
    pub fn naechster_puffer(&mut self) -> Option<Vec<i16>> {
        let groesse = self
            .puffer_groessen
            .get(self.index % self.puffer_groessen.len().max(1))
            .copied()
            .unwrap_or(512);
        self.index += 1;
        match &mut self.art {
            Art::Synthetisch(m) => Some(m.erzeugen(groesse)),
            Art::Wav(w) => w.erzeugen(groesse),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn puffergroessen_wechseln() {
        let mik = SynthetischesMikrofon::neu(44_100, 440.0, 0.01, 1);
        let mut q = CaptureQuelle::synthetisch(mik, vec![256, 512]);
        let laengen: Vec<usize> = (0..4).map(|_| q.naechster_puffer().unwrap().len()).collect();
        assert_eq!(laengen, vec![256, 512, 256, 512]);
        assert_eq!(q.sample_rate(), 44_100);
    }

    #[test]
    fn gleicher_seed_gleiche_samples() {
        let mut a = SynthetischesMikrofon::neu(48_000, 300.0, 0.1, 7);
        let mut b = SynthetischesMikrofon::neu(48_000, 300.0, 0.1, 7);
        assert_eq!(a.erzeugen(100), b.erzeugen(100));
    }

    #[test]
    fn ohne_rauschen_reiner_ton() {
        let mut m = SynthetischesMikrofon::neu(48_000, 1000.0, 0.0, 0);
        let s = m.erzeugen(48);
        assert_eq!(s[0], 0);
        // Maximum bei 0.3 Vollaussteuerung
        assert!(s.iter().all(|&x| x.abs() <= (0.3 * 32767.0) as i16 + 1));
        assert!(s.iter().any(|&x| x > 9000));
    }

    #[test]
    fn wav_quelle_endet() {
        let pfad = std::env::temp_dir().join(format!("sprachrohr-quelle-{}.wav", std::process::id()));
        sprachrohr_audio::save_wav(&pfad, &[1; 600], 16_000).unwrap();
        let w = WavQuelle::laden(pfad.to_str().unwrap()).unwrap();
        std::fs::remove_file(&pfad).ok();

        let mut q = CaptureQuelle::wav(w, vec![256]);
        assert_eq!(q.sample_rate(), 16_000);
        assert_eq!(q.naechster_puffer().unwrap().len(), 256);
        assert_eq!(q.naechster_puffer().unwrap().len(), 256);
        assert_eq!(q.naechster_puffer().unwrap().len(), 88);
        assert!(q.naechster_puffer().is_none());
    }
}
