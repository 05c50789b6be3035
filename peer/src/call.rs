//! Ein simulierter Anruf zwischen zwei Endpunkten
//!
//! Vier Threads, verbunden ueber `crossbeam-channel`:
//!
//! ```text
//! capture --Bytes--> strecke --Bytes--> empfang --> JitterBuffer <-- render
//! ```
//!
//! Der Capture-Thread laeuft in Echtzeit (schlaeft pro Puffer dessen Dauer)
//! und schliesst am Ende seinen Kanal. Das Schliessen pflanzt sich ueber
//! Strecke und Empfang fort; der Render-Thread spielt danach noch aus, was
//! im Jitter Buffer liegt.

use anyhow::{anyhow, Context, Result};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use crossbeam_channel::unbounded;
use parking_lot::Mutex;
use serde::Serialize;
use sprachrohr_audio::{save_wav, AudioSender, NoiseSuppressor};
use sprachrohr_core::{CallId, Ssrc};
use sprachrohr_observability::PipelineMetriken;
use sprachrohr_voice::{AudioReceiver, FrameArt, JitterBuffer, PlayoutScheduler};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::PeerConfig;
use crate::link::{strecke_betreiben, Strecke, StreckenStatistik};
use crate::source::{CaptureQuelle, SynthetischesMikrofon, WavQuelle};

/// Zeit, die der Render-Thread nach Anrufende hoechstens nachlaeuft
const NACHLAUF: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Default, Serialize)]
pub struct SendeBericht {
    pub capture_puffer: u64,
    pub capture_samples: u64,
    pub pakete: u64,
    pub samples: u64,
    pub denoiser: String,
    pub rauschunterdrueckung: bool,
    pub denoiser_frames: u64,
    pub verworfene_samples: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StreckenBericht {
    pub eingang: u64,
    pub verloren: u64,
    pub umsortiert: u64,
    pub zugestellt: u64,
}

impl From<StreckenStatistik> for StreckenBericht {
    fn from(s: StreckenStatistik) -> Self {
        Self {
            eingang: s.eingang,
            verloren: s.verloren,
            umsortiert: s.umsortiert,
            zugestellt: s.zugestellt,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EmpfangsBericht {
    pub pakete: u64,
    pub samples: u64,
    pub fehlerhaft: u64,
    pub stream_neustarts: u64,
    pub jitter_resync: u64,
    pub jitter_uebergelaufen: u64,
    pub jitter_verspaetet: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct WiedergabeBericht {
    pub ticks: u64,
    pub pakete: u64,
    pub wiederholungen: u64,
    pub stille: u64,
    pub laengste_luecke: u32,
    pub luecken_rate: f64,
    pub samples: u64,
}

/// Ergebnis eines Anrufs, wird optional als JSON geschrieben
#[derive(Debug, Clone, Serialize)]
pub struct AnrufBericht {
    pub anruf: String,
    pub ssrc: String,
    pub beginn: DateTime<Utc>,
    pub ende: DateTime<Utc>,
    pub sende_rate: u32,
    pub capture_rate: u32,
    pub senden: SendeBericht,
    pub strecke: StreckenBericht,
    pub empfang: EmpfangsBericht,
    pub wiedergabe: WiedergabeBericht,
    /// Prometheus-Textformat
    pub metriken: String,
}

struct CaptureErgebnis {
    bericht: SendeBericht,
    rate: u32,
    aufnahme: Vec<i16>,
}

struct EmpfangsErgebnis {
    bericht: EmpfangsBericht,
    empfangen: Vec<i16>,
}

pub struct Anruf {
    id: CallId,
    config: PeerConfig,
    metriken: PipelineMetriken,
}

impl Anruf {
    pub fn neu(config: PeerConfig) -> Result<Self> {
        let metriken = PipelineMetriken::neu().context("Metriken konnten nicht erstellt werden")?;
        Ok(Self {
            id: CallId::new(),
            config,
            metriken,
        })
    }

    pub fn id(&self) -> CallId {
        self.id
    }

    pub fn metriken(&self) -> &PipelineMetriken {
        &self.metriken
    }

    /// Fuehrt den Anruf durch und schreibt die konfigurierten Ausgaben
    pub fn durchfuehren(&self) -> Result<AnrufBericht> {
        let beginn = Utc::now();
        let ssrc = Ssrc::fuer_anruf(self.id, 0);
        info!(anruf = %self.id, %ssrc, dauer_ms = self.config.anruf.dauer_ms, "Anruf beginnt");

        let quelle = self.quelle_oeffnen()?;
        let jitter = Arc::new(JitterBuffer::neu(
            self.config.jitter.min_pakete,
            self.config.jitter.max_pakete,
        ));
        jitter.set_enabled(self.config.jitter.aktiviert);

        let (tx_sende, rx_sende) = unbounded::<Bytes>();
        let (tx_empfang, rx_empfang) = unbounded::<Bytes>();
        let empfang_beendet = Arc::new(AtomicBool::new(false));
        let direkt = Arc::new(Mutex::new(Vec::new()));

        let capture = self.capture_starten(quelle, tx_sende, ssrc)?;

        let strecke = {
            let strecke = Strecke::neu(&self.config.netz);
            let metriken = self.metriken.clone();
            thread::Builder::new()
                .name("strecke".into())
                .spawn(move || strecke_betreiben(rx_sende, tx_empfang, strecke, metriken))
                .context("Strecken-Thread konnte nicht gestartet werden")?
        };

        let empfang = {
            let mut receiver = AudioReceiver::neu(jitter.clone(), self.config.audio.sende_rate);
            let direkt = direkt.clone();
            receiver.set_on_audio(move |samples, _rate| direkt.lock().extend_from_slice(samples));
            let beendet = empfang_beendet.clone();
            let metriken = self.metriken.clone();
            thread::Builder::new()
                .name("empfang".into())
                .spawn(move || {
                    receiver.empfangen_bis_getrennt(&rx_empfang);
                    beendet.store(true, Ordering::Release);

                    let r = receiver.statistik();
                    metriken.pakete_empfangen.inc_by(r.pakete);
                    metriken.pakete_fehlerhaft.inc_by(r.fehlerhaft);
                    EmpfangsErgebnis {
                        bericht: EmpfangsBericht {
                            pakete: r.pakete,
                            samples: r.samples,
                            fehlerhaft: r.fehlerhaft,
                            stream_neustarts: r.stream_neustarts,
                            ..Default::default()
                        },
                        empfangen: receiver.received_data().to_vec(),
                    }
                })
                .context("Empfangs-Thread konnte nicht gestartet werden")?
        };

        let render = if self.config.jitter.aktiviert {
            Some(self.render_starten(jitter.clone(), empfang_beendet.clone())?)
        } else {
            None
        };

        let capture = beitreten(capture, "capture")??;
        let strecke = beitreten(strecke, "strecke")?;
        let mut empfang = beitreten(empfang, "empfang")?;
        let (wiedergabe_bericht, wiedergabe) = match render {
            Some(r) => beitreten(r, "render")?,
            None => {
                let samples = std::mem::take(&mut *direkt.lock());
                let bericht = WiedergabeBericht {
                    samples: samples.len() as u64,
                    ..Default::default()
                };
                (bericht, samples)
            }
        };

        // Erst nach dem Render-Thread: Resyncs passieren beim Abholen
        let j = jitter.statistik();
        empfang.bericht.jitter_resync = j.resync;
        empfang.bericht.jitter_uebergelaufen = j.uebergelaufen;
        empfang.bericht.jitter_verspaetet = j.verspaetet_verworfen;
        self.metriken
            .jitter_ereignisse
            .with_label_values(&["resync"])
            .inc_by(j.resync);
        self.metriken
            .jitter_ereignisse
            .with_label_values(&["ueberlauf"])
            .inc_by(j.uebergelaufen);
        self.metriken
            .jitter_ereignisse
            .with_label_values(&["verspaetet"])
            .inc_by(j.verspaetet_verworfen);

        self.wav_schreiben(
            self.config.anruf.aufnahme_wav.as_deref(),
            &capture.aufnahme,
            capture.rate,
        )?;
        self.wav_schreiben(
            self.config.anruf.empfang_wav.as_deref(),
            &empfang.empfangen,
            self.config.audio.sende_rate,
        )?;
        self.wav_schreiben(
            self.config.anruf.wiedergabe_wav.as_deref(),
            &wiedergabe,
            self.config.audio.sende_rate,
        )?;

        let metriken = self.metriken.exportieren()?;
        debug!("Metriken zum Anrufende:\n{metriken}");

        let bericht = AnrufBericht {
            anruf: self.id.to_string(),
            ssrc: ssrc.to_string(),
            beginn,
            ende: Utc::now(),
            sende_rate: self.config.audio.sende_rate,
            capture_rate: capture.rate,
            senden: capture.bericht,
            strecke: strecke.into(),
            empfang: empfang.bericht,
            wiedergabe: wiedergabe_bericht,
            metriken,
        };

        if let Some(pfad) = self.config.anruf.bericht_json.as_deref() {
            let json = serde_json::to_string_pretty(&bericht)?;
            std::fs::write(pfad, json)
                .with_context(|| format!("Bericht '{pfad}' nicht schreibbar"))?;
            info!(pfad, "Anrufbericht geschrieben");
        }

        info!(
            anruf = %self.id,
            gesendet = bericht.senden.pakete,
            verloren = bericht.strecke.verloren,
            empfangen = bericht.empfang.pakete,
            luecken_rate = bericht.wiedergabe.luecken_rate,
            "Anruf beendet"
        );
        Ok(bericht)
    }

    fn quelle_oeffnen(&self) -> Result<CaptureQuelle> {
        let groessen = self.config.audio.puffer_groessen.clone();
        match self.config.anruf.eingabe_wav.as_deref() {
            Some(pfad) => {
                let wav = WavQuelle::laden(pfad)
                    .with_context(|| format!("Eingabe '{pfad}' nicht lesbar"))?;
                Ok(CaptureQuelle::wav(wav, groessen))
            }
            None => {
                let a = &self.config.audio;
                let mikrofon = SynthetischesMikrofon::neu(
                    a.capture_rate,
                    a.ton_hz,
                    a.rauschpegel,
                    self.config.netz.seed,
                );
                Ok(CaptureQuelle::synthetisch(mikrofon, groessen))
            }
        }
    }

    fn capture_starten(
        &self,
        mut quelle: CaptureQuelle,
        transport: crossbeam_channel::Sender<Bytes>,
        ssrc: Ssrc,
    ) -> Result<JoinHandle<Result<CaptureErgebnis>>> {
        let audio = self.config.audio.clone();
        let dauer = Duration::from_millis(self.config.anruf.dauer_ms);
        let aufnehmen = self.config.anruf.aufnahme_wav.is_some();
        let metriken = self.metriken.clone();

        let handle = thread::Builder::new()
            .name("capture".into())
            .spawn(move || -> Result<CaptureErgebnis> {
                let suppressor = NoiseSuppressor::neu(audio.backend, audio.stufe)?;
                suppressor.set_enabled(audio.rauschunterdrueckung);
                let mut sender = AudioSender::neu(suppressor, transport, ssrc, audio.sende_rate);
                if aufnehmen {
                    sender = sender.mit_aufnahme();
                }

                let rate = quelle.sample_rate();
                let start = Instant::now();
                let mut capture_samples: u64 = 0;

                while start.elapsed() < dauer {
                    let Some(puffer) = quelle.naechster_puffer() else {
                        debug!("Capture-Quelle erschoepft");
                        break;
                    };
                    capture_samples += puffer.len() as u64;

                    // Geraetetakt: Puffer ist erst nach seiner Dauer voll
                    let soll = start + Duration::from_secs_f64(capture_samples as f64 / rate as f64);
                    let rest = soll.saturating_duration_since(Instant::now());
                    if !rest.is_zero() {
                        thread::sleep(rest);
                    }

                    let vorher = sender.statistik().gesendete_pakete;
                    let frames_vorher = sender.suppressor().statistik().verarbeitete_frames;
                    sender.on_capture(&puffer, rate)?;
                    metriken
                        .pakete_gesendet
                        .inc_by(sender.statistik().gesendete_pakete - vorher);
                    metriken.denoiser_frames.inc_by(
                        sender.suppressor().statistik().verarbeitete_frames - frames_vorher,
                    );
                }

                let s = sender.statistik();
                let ns = sender.suppressor().statistik();
                Ok(CaptureErgebnis {
                    bericht: SendeBericht {
                        capture_puffer: s.capture_puffer,
                        capture_samples,
                        pakete: s.gesendete_pakete,
                        samples: s.gesendete_samples,
                        denoiser: audio.backend.to_string(),
                        rauschunterdrueckung: audio.rauschunterdrueckung,
                        denoiser_frames: ns.verarbeitete_frames,
                        verworfene_samples: ns.verworfene_samples,
                    },
                    rate,
                    aufnahme: sender.aufnahme().to_vec(),
                })
            })
            .context("Capture-Thread konnte nicht gestartet werden")?;
        Ok(handle)
    }

    fn render_starten(
        &self,
        jitter: Arc<JitterBuffer>,
        empfang_beendet: Arc<AtomicBool>,
    ) -> Result<JoinHandle<(WiedergabeBericht, Vec<i16>)>> {
        let mut scheduler = PlayoutScheduler::neu(jitter.clone(), self.config.jitter.politik);
        let tick = Duration::from_millis(self.config.jitter.render_tick_ms);
        let angefragt = self.config.samples_pro_tick();
        let grenze = Duration::from_millis(self.config.anruf.dauer_ms) + NACHLAUF;
        let metriken = self.metriken.clone();

        let handle = thread::Builder::new()
            .name("render".into())
            .spawn(move || {
                let start = Instant::now();
                let mut naechster = start;
                let mut ticks: u64 = 0;
                let mut wiedergabe = Vec::new();

                loop {
                    naechster += tick;
                    let rest = naechster.saturating_duration_since(Instant::now());
                    if !rest.is_zero() {
                        thread::sleep(rest);
                    }

                    // Vor dem Pull lesen: danach kann nichts mehr nachkommen
                    let fertig = empfang_beendet.load(Ordering::Acquire);
                    let frame = scheduler.pull(angefragt);
                    ticks += 1;

                    let art = match frame.art {
                        FrameArt::Paket { .. } => "paket",
                        FrameArt::Wiederholung { .. } => "wiederholung",
                        FrameArt::Stille => "stille",
                    };
                    metriken.playout_ticks.with_label_values(&[art]).inc();
                    metriken.jitter_fuellstand.set(jitter.fuellstand() as i64);

                    let paket = frame.ist_paket();
                    wiedergabe.extend_from_slice(&frame.samples);

                    if fertig && !paket {
                        break;
                    }
                    if start.elapsed() > grenze {
                        warn!(ticks, "Render-Nachlauf ueberschritten, Wiedergabe abgebrochen");
                        break;
                    }
                }

                let s = scheduler.statistik();
                let bericht = WiedergabeBericht {
                    ticks,
                    pakete: s.pakete,
                    wiederholungen: s.wiederholungen,
                    stille: s.stille,
                    laengste_luecke: s.laengste_luecke,
                    luecken_rate: s.luecken_rate(),
                    samples: wiedergabe.len() as u64,
                };
                (bericht, wiedergabe)
            })
            .context("Render-Thread konnte nicht gestartet werden")?;
        Ok(handle)
    }

    fn wav_schreiben(&self, pfad: Option<&str>, samples: &[i16], rate: u32) -> Result<()> {
        let Some(pfad) = pfad else {
            return Ok(());
        };
        if samples.is_empty() {
            warn!(pfad, "Keine Samples, WAV wird nicht geschrieben");
            return Ok(());
        }
        save_wav(pfad, samples, rate).with_context(|| format!("WAV '{pfad}' nicht schreibbar"))?;
        info!(pfad, samples = samples.len(), rate, "WAV geschrieben");
        Ok(())
    }
}

fn beitreten<T>(handle: JoinHandle<T>, name: &str) -> Result<T> {
    handle
        .join()
        .map_err(|_| anyhow!("Thread '{name}' ist abgestuerzt"))
}
