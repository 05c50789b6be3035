//! Peer-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! Standardwerte, ohne Datei laeuft ein 5-Sekunden-Anruf mit
//! synthetischem Mikrofon.

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use sprachrohr_audio::{DenoiserArt, SuppressionLevel};
use sprachrohr_core::SampleRate;
use sprachrohr_observability::logging::{log_format_gueltig, log_level_gueltig};
use sprachrohr_voice::PlayoutPolitik;

/// Woher eine geladene Konfiguration stammt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigHerkunft {
    Datei,
    /// Datei fehlte, Standardwerte
    Standard,
}

/// Vollstaendige Peer-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerConfig {
    pub audio: AudioEinstellungen,
    pub jitter: JitterEinstellungen,
    pub netz: NetzEinstellungen,
    pub anruf: AnrufEinstellungen,
    pub logging: LoggingEinstellungen,
}

/// Capture- und Sende-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioEinstellungen {
    /// Abtastrate des (simulierten) Mikrofons
    pub capture_rate: u32,
    /// Abtastrate auf dem Transport
    pub sende_rate: u32,
    /// Puffergroessen des Geraets, werden reihum verwendet
    pub puffer_groessen: Vec<usize>,
    pub rauschunterdrueckung: bool,
    pub backend: DenoiserArt,
    /// Nur fuer das spektrale Backend
    pub stufe: SuppressionLevel,
    /// Testton des synthetischen Mikrofons in Hz
    pub ton_hz: f32,
    /// Rauschamplitude des synthetischen Mikrofons (0.0–1.0)
    pub rauschpegel: f32,
}

impl Default for AudioEinstellungen {
    fn default() -> Self {
        Self {
            capture_rate: 44_100,
            sende_rate: 48_000,
            puffer_groessen: vec![256, 512],
            rauschunterdrueckung: true,
            backend: DenoiserArt::Rnnoise,
            stufe: SuppressionLevel::Medium,
            ton_hz: 440.0,
            rauschpegel: 0.05,
        }
    }
}

/// Jitter Buffer und Wiedergabe
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JitterEinstellungen {
    pub aktiviert: bool,
    pub min_pakete: usize,
    pub max_pakete: usize,
    pub politik: PlayoutPolitik,
    /// Abstand der Render-Ticks
    pub render_tick_ms: u64,
}

impl Default for JitterEinstellungen {
    fn default() -> Self {
        Self {
            aktiviert: true,
            min_pakete: 3,
            max_pakete: 10,
            politik: PlayoutPolitik::Halten,
            render_tick_ms: 10,
        }
    }
}

/// Simulierte Strecke zwischen den Endpunkten
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzEinstellungen {
    /// Anteil verlorener Pakete (0.0–1.0)
    pub verlust_rate: f64,
    /// Anteil umsortierter Pakete (0.0–1.0)
    pub umsortier_rate: f64,
    /// Maximale zusaetzliche Laufzeit pro Paket
    pub max_verzoegerung_ms: u64,
    /// Startwert des Zufallsgenerators (reproduzierbare Laeufe)
    pub seed: u64,
}

impl Default for NetzEinstellungen {
    fn default() -> Self {
        Self {
            verlust_rate: 0.02,
            umsortier_rate: 0.05,
            max_verzoegerung_ms: 20,
            seed: 42,
        }
    }
}

/// Ablauf und Ausgaben eines Anrufs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnrufEinstellungen {
    pub dauer_ms: u64,
    /// WAV statt synthetischem Mikrofon
    pub eingabe_wav: Option<String>,
    /// Rohe Capture-Samples
    pub aufnahme_wav: Option<String>,
    /// Empfangene Samples in Ankunftsreihenfolge
    pub empfang_wav: Option<String>,
    /// Abgespielte Samples inklusive Stille und Wiederholungen
    pub wiedergabe_wav: Option<String>,
    /// JSON-Bericht mit Zaehlern und Metriken
    pub bericht_json: Option<String>,
}

impl Default for AnrufEinstellungen {
    fn default() -> Self {
        Self {
            dauer_ms: 5_000,
            eingabe_wav: None,
            aufnahme_wav: None,
            empfang_wav: None,
            wiedergabe_wav: Some("wiedergabe.wav".into()),
            bericht_json: None,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl PeerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert;
    /// die Herkunft wird mitgeliefert, damit der Aufrufer nach dem
    /// Logging-Setup darueber berichten kann.
    pub fn laden(pfad: &str) -> anyhow::Result<(Self, ConfigHerkunft)> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .with_context(|| format!("Konfigurationsfehler in '{pfad}'"))?;
                Ok((config, ConfigHerkunft::Datei))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok((Self::default(), ConfigHerkunft::Standard))
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Prueft Wertebereiche, die Serde nicht abdeckt
    pub fn validieren(&self) -> anyhow::Result<()> {
        SampleRate::neu(self.audio.capture_rate).context("audio.capture_rate")?;
        SampleRate::neu(self.audio.sende_rate).context("audio.sende_rate")?;
        if self.audio.puffer_groessen.is_empty() || self.audio.puffer_groessen.contains(&0) {
            bail!("audio.puffer_groessen darf weder leer sein noch 0 enthalten");
        }
        if !(0.0..=1.0).contains(&self.audio.rauschpegel) {
            bail!("audio.rauschpegel muss zwischen 0.0 und 1.0 liegen");
        }

        if self.jitter.max_pakete == 0 {
            bail!("jitter.max_pakete muss groesser 0 sein");
        }
        if self.jitter.min_pakete > self.jitter.max_pakete {
            bail!(
                "jitter.min_pakete ({}) groesser als jitter.max_pakete ({})",
                self.jitter.min_pakete,
                self.jitter.max_pakete
            );
        }
        if self.jitter.render_tick_ms == 0 {
            bail!("jitter.render_tick_ms muss groesser 0 sein");
        }

        for (name, rate) in [
            ("netz.verlust_rate", self.netz.verlust_rate),
            ("netz.umsortier_rate", self.netz.umsortier_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                bail!("{name} muss zwischen 0.0 und 1.0 liegen, ist {rate}");
            }
        }

        if !log_level_gueltig(&self.logging.level) {
            bail!("logging.level '{}' unbekannt", self.logging.level);
        }
        if !log_format_gueltig(&self.logging.format) {
            bail!("logging.format '{}' unbekannt", self.logging.format);
        }
        Ok(())
    }

    /// Samples pro Render-Tick bei Senderate
    pub fn samples_pro_tick(&self) -> usize {
        (self.audio.sende_rate as u64 * self.jitter.render_tick_ms / 1000) as usize
    }
}
