//! Sendeseite: Capture-Puffer -> Rauschunterdrueckung -> Transport
//!
//! Der Capture-Thread ruft [`AudioSender::on_capture`] synchron pro Puffer
//! auf. Ergebnisse der Rauschunterdrueckung werden mit einem laufenden
//! Zeitstempel (Samples der Senderate) gerahmt und als `Bytes` an den
//! Transport-Kanal gereicht.

use bytes::Bytes;
use crossbeam_channel::Sender;
use sprachrohr_core::Ssrc;
use sprachrohr_protocol::{AudioPacket, PacketFlags, MAX_SAMPLES};
use tracing::{debug, info, trace};

use crate::dsp::{DenoiseBackend, Denoiser};
use crate::error::{AudioError, AudioResult};
use crate::suppressor::{NoiseSuppressor, SuppressorHandle};

/// Log-Intervall in Paketen
const LOG_INTERVALL_PAKETE: u64 = 1000;

/// Zaehler der Sendeseite
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SenderStatistik {
    pub capture_puffer: u64,
    pub gesendete_pakete: u64,
    pub gesendete_samples: u64,
    /// Puffer, die komplett im Carry gelandet sind
    pub gepufferte_aufrufe: u64,
}

pub struct AudioSender<D: Denoiser = DenoiseBackend> {
    suppressor: NoiseSuppressor<D>,
    transport: Sender<Bytes>,
    ssrc: Ssrc,
    sende_rate: u32,
    zeitstempel: u32,
    stream_gestartet: bool,
    aufnahme: Option<Vec<i16>>,
    statistik: SenderStatistik,
}

impl<D: Denoiser> AudioSender<D> {
    pub fn neu(
        suppressor: NoiseSuppressor<D>,
        transport: Sender<Bytes>,
        ssrc: Ssrc,
        sende_rate: u32,
    ) -> Self {
        info!(%ssrc, sende_rate, "AudioSender erstellt");
        Self {
            suppressor,
            transport,
            ssrc,
            sende_rate,
            zeitstempel: 0,
            stream_gestartet: false,
            aufnahme: None,
            statistik: SenderStatistik::default(),
        }
    }

    /// Haelt zusaetzlich die rohen Capture-Samples fest (fuer WAV-Export)
    pub fn mit_aufnahme(mut self) -> Self {
        self.aufnahme = Some(Vec::new());
        self
    }

    /// Schalter der Rauschunterdrueckung
    pub fn suppressor_handle(&self) -> SuppressorHandle {
        self.suppressor.handle()
    }

    /// Verarbeitet einen Capture-Puffer
    ///
    /// Leere Puffer und Aufrufe, deren Samples noch im Carry liegen,
    /// senden nichts.
    ///
    /// # Fehler
    /// `TransportGeschlossen` wenn der Empfaenger des Kanals weg ist
    pub fn on_capture(&mut self, samples: &[i16], capture_rate: u32) -> AudioResult<()> {
        if samples.is_empty() {
            return Ok(());
        }
        self.statistik.capture_puffer += 1;

        if let Some(aufnahme) = self.aufnahme.as_mut() {
            aufnahme.extend_from_slice(samples);
        }

        let verarbeitet = self
            .suppressor
            .process(samples, capture_rate, self.sende_rate);
        if verarbeitet.is_empty() {
            self.statistik.gepufferte_aufrufe += 1;
            trace!(samples = samples.len(), "Puffer im Carry, nichts zu senden");
            return Ok(());
        }

        for teil in verarbeitet.chunks(MAX_SAMPLES) {
            self.senden(teil)?;
        }
        Ok(())
    }

    fn senden(&mut self, samples: &[i16]) -> AudioResult<()> {
        let mut paket = AudioPacket::neu(self.zeitstempel, self.ssrc.0, samples.to_vec());
        if !self.stream_gestartet {
            paket = paket.mit_flag(PacketFlags::STREAM_START);
            self.stream_gestartet = true;
            debug!(ssrc = %self.ssrc, "Erstes Paket des Streams");
        }

        let bytes = paket.encode()?;
        self.transport
            .send(bytes)
            .map_err(|_| AudioError::TransportGeschlossen)?;

        self.zeitstempel = self.zeitstempel.wrapping_add(samples.len() as u32);
        self.statistik.gesendete_pakete += 1;
        self.statistik.gesendete_samples += samples.len() as u64;

        if self.statistik.gesendete_pakete % LOG_INTERVALL_PAKETE == 0 {
            debug!(
                pakete = self.statistik.gesendete_pakete,
                samples = self.statistik.gesendete_samples,
                zeitstempel = self.zeitstempel,
                "Sendestatus"
            );
        }
        Ok(())
    }

    /// Rohe Capture-Samples seit Start (leer ohne `mit_aufnahme`)
    pub fn aufnahme(&self) -> &[i16] {
        self.aufnahme.as_deref().unwrap_or(&[])
    }

    pub fn naechster_zeitstempel(&self) -> u32 {
        self.zeitstempel
    }

    pub fn sende_rate(&self) -> u32 {
        self.sende_rate
    }

    pub fn statistik(&self) -> SenderStatistik {
        self.statistik
    }

    pub fn suppressor(&self) -> &NoiseSuppressor<D> {
        &self.suppressor
    }
}
