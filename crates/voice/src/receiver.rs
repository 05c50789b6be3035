//! Empfangsseite: Transport -> Jitter Buffer bzw. direkt zum Render
//!
//! Dekodiert eingehende Transportpakete. Bei aktivem Jitter Buffer landen
//! sie dort und der [`PlayoutScheduler`](crate::PlayoutScheduler) holt sie
//! im Render-Takt ab; sonst gehen die Samples sofort an den Callback.
//! Fehlerhafte Pakete werden gezaehlt und geloggt, nie weitergereicht.

use bytes::Bytes;
use crossbeam_channel::Receiver;
use sprachrohr_core::Ssrc;
use sprachrohr_protocol::AudioPacket;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

use crate::jitter_buffer::JitterBuffer;

/// Render-Callback: `(samples, sample_rate)`
pub type AudioCallback = Box<dyn FnMut(&[i16], u32) + Send>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiverStatistik {
    pub pakete: u64,
    pub samples: u64,
    pub fehlerhaft: u64,
    pub leer: u64,
    /// Wechsel auf eine neue Senderkennung
    pub stream_neustarts: u64,
    /// Pakete der vorherigen Quelle nach einem Wechsel
    pub veraltet: u64,
}

pub struct AudioReceiver {
    jitter: Arc<JitterBuffer>,
    sample_rate: u32,
    on_audio: Option<AudioCallback>,
    empfangen: Vec<i16>,
    aufzeichnen: bool,
    quelle: Option<Ssrc>,
    vorherige_quelle: Option<Ssrc>,
    statistik: ReceiverStatistik,
}

impl AudioReceiver {
    pub fn neu(jitter: Arc<JitterBuffer>, sample_rate: u32) -> Self {
        Self {
            jitter,
            sample_rate,
            on_audio: None,
            empfangen: Vec::new(),
            aufzeichnen: true,
            quelle: None,
            vorherige_quelle: None,
            statistik: ReceiverStatistik::default(),
        }
    }

    /// Callback fuer den direkten Pfad (Jitter Buffer deaktiviert)
    pub fn set_on_audio(&mut self, cb: impl FnMut(&[i16], u32) + Send + 'static) {
        self.on_audio = Some(Box::new(cb));
    }

    /// Empfangene Samples fuer den WAV-Export sammeln (Standard: an)
    pub fn set_aufzeichnen(&mut self, an: bool) {
        self.aufzeichnen = an;
    }

    /// Verarbeitet ein rohes Transportpaket
    pub fn on_paket(&mut self, daten: &[u8]) {
        let paket = match AudioPacket::decode(daten) {
            Ok(p) => p,
            Err(e) => {
                self.statistik.fehlerhaft += 1;
                warn!(fehler = %e, bytes = daten.len(), "Fehlerhaftes Audio-Paket verworfen");
                return;
            }
        };

        if paket.samples.is_empty() {
            self.statistik.leer += 1;
            return;
        }

        let ssrc = Ssrc(paket.ssrc);
        match self.quelle {
            Some(aktuell) if aktuell == ssrc => {
                // Verspaetetes oder doppeltes Startpaket desselben Streams
                if paket.ist_stream_start() {
                    trace!(%ssrc, zeitstempel = paket.timestamp, "Startpaket nachgereicht");
                }
            }
            Some(_) if self.vorherige_quelle == Some(ssrc) => {
                self.statistik.veraltet += 1;
                debug!(%ssrc, "Nachzuegler der vorherigen Quelle verworfen");
                return;
            }
            Some(aktuell) => {
                self.statistik.stream_neustarts += 1;
                info!(alt = %aktuell, neu = %ssrc, "Neuer Stream, Jitter Buffer wird zurueckgesetzt");
                self.jitter.reset();
                self.vorherige_quelle = Some(aktuell);
                self.quelle = Some(ssrc);
            }
            None => {
                debug!(%ssrc, "Audio-Quelle erkannt");
                self.quelle = Some(ssrc);
            }
        }

        self.statistik.pakete += 1;
        self.statistik.samples += paket.samples.len() as u64;
        if self.aufzeichnen {
            self.empfangen.extend_from_slice(&paket.samples);
        }

        if self.jitter.is_enabled() {
            self.jitter.insert(paket.timestamp, paket.samples);
        } else if let Some(cb) = self.on_audio.as_mut() {
            cb(&paket.samples, self.sample_rate);
        }
    }

    /// Liest Pakete bis der Sender den Kanal schliesst
    pub fn empfangen_bis_getrennt(&mut self, rx: &Receiver<Bytes>) {
        for daten in rx.iter() {
            self.on_paket(&daten);
        }
        debug!(pakete = self.statistik.pakete, "Transport getrennt, Empfang beendet");
    }

    /// Alle bisher empfangenen Samples
    pub fn received_data(&self) -> &[i16] {
        &self.empfangen
    }

    pub fn clear_received_data(&mut self) {
        self.empfangen.clear();
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn quelle(&self) -> Option<Ssrc> {
        self.quelle
    }

    pub fn jitter_buffer(&self) -> &Arc<JitterBuffer> {
        &self.jitter
    }

    pub fn statistik(&self) -> ReceiverStatistik {
        self.statistik
    }
}
