//! Prometheus-Metriken der Audio-Pipeline
//!
//! Registrierte Metriken:
//! - `sprachrohr_pakete_gesendet_total` – Counter: An den Transport gereichte Pakete
//! - `sprachrohr_pakete_empfangen_total` – Counter: Dekodierte Pakete
//! - `sprachrohr_pakete_fehlerhaft_total` – Counter: Nicht dekodierbare Pakete
//! - `sprachrohr_link_pakete_total` – Counter (ereignis): verloren/umsortiert/zugestellt
//! - `sprachrohr_link_verzoegerung_sekunden` – Histogram: Simulierte Laufzeit
//! - `sprachrohr_denoiser_frames_total` – Counter: Entrauschte 480er Frames
//! - `sprachrohr_playout_ticks_total` – Counter (art): paket/wiederholung/stille
//! - `sprachrohr_jitter_fuellstand` – Gauge: Gepufferte Pakete
//! - `sprachrohr_jitter_ereignisse_total` – Counter (ereignis): resync/ueberlauf/verspaetet

use anyhow::Result;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

/// Alle Metriken eines Anrufs
#[derive(Clone)]
pub struct PipelineMetriken {
    pub registry: Arc<Registry>,

    pub pakete_gesendet: IntCounter,
    pub pakete_empfangen: IntCounter,
    pub pakete_fehlerhaft: IntCounter,
    pub link_pakete: IntCounterVec,
    pub link_verzoegerung: Histogram,
    pub denoiser_frames: IntCounter,
    pub playout_ticks: IntCounterVec,
    pub jitter_fuellstand: IntGauge,
    pub jitter_ereignisse: IntCounterVec,
}

impl PipelineMetriken {
    /// Erstellt und registriert alle Metriken in einer neuen Registry
    pub fn neu() -> Result<Self> {
        let registry = Registry::new();

        let pakete_gesendet = IntCounter::with_opts(Opts::new(
            "sprachrohr_pakete_gesendet_total",
            "An den Transport gereichte Audio-Pakete",
        ))?;
        registry.register(Box::new(pakete_gesendet.clone()))?;

        let pakete_empfangen = IntCounter::with_opts(Opts::new(
            "sprachrohr_pakete_empfangen_total",
            "Erfolgreich dekodierte Audio-Pakete",
        ))?;
        registry.register(Box::new(pakete_empfangen.clone()))?;

        let pakete_fehlerhaft = IntCounter::with_opts(Opts::new(
            "sprachrohr_pakete_fehlerhaft_total",
            "Verworfene, nicht dekodierbare Pakete",
        ))?;
        registry.register(Box::new(pakete_fehlerhaft.clone()))?;

        let link_pakete = IntCounterVec::new(
            Opts::new("sprachrohr_link_pakete_total", "Pakete auf der Strecke nach Ereignis"),
            &["ereignis"],
        )?;
        registry.register(Box::new(link_pakete.clone()))?;

        let link_verzoegerung = Histogram::with_opts(
            HistogramOpts::new(
                "sprachrohr_link_verzoegerung_sekunden",
                "Simulierte Laufzeit pro Paket in Sekunden",
            )
            .buckets(vec![0.0, 0.005, 0.01, 0.02, 0.04, 0.08, 0.16]),
        )?;
        registry.register(Box::new(link_verzoegerung.clone()))?;

        let denoiser_frames = IntCounter::with_opts(Opts::new(
            "sprachrohr_denoiser_frames_total",
            "Entrauschte Frames (480 Samples @ 48 kHz)",
        ))?;
        registry.register(Box::new(denoiser_frames.clone()))?;

        let playout_ticks = IntCounterVec::new(
            Opts::new("sprachrohr_playout_ticks_total", "Render-Ticks nach Frame-Herkunft"),
            &["art"],
        )?;
        registry.register(Box::new(playout_ticks.clone()))?;

        let jitter_fuellstand = IntGauge::with_opts(Opts::new(
            "sprachrohr_jitter_fuellstand",
            "Aktuell gepufferte Pakete im Jitter Buffer",
        ))?;
        registry.register(Box::new(jitter_fuellstand.clone()))?;

        let jitter_ereignisse = IntCounterVec::new(
            Opts::new("sprachrohr_jitter_ereignisse_total", "Sonderfaelle im Jitter Buffer"),
            &["ereignis"],
        )?;
        registry.register(Box::new(jitter_ereignisse.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            pakete_gesendet,
            pakete_empfangen,
            pakete_fehlerhaft,
            link_pakete,
            link_verzoegerung,
            denoiser_frames,
            playout_ticks,
            jitter_fuellstand,
            jitter_ereignisse,
        })
    }

    /// Exportiert alle Metriken im Prometheus-Textformat
    pub fn exportieren(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
