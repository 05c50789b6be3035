//! WAV-Persistenz (PCM, mono, 16 Bit)
//!
//! Schreibt die aufgenommenen bzw. abgespielten Samples eines Anrufs als
//! kanonische RIFF/WAVE-Datei. Lesen dient als Capture-Quelle fuer Tests
//! und den Peer.

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use tracing::{debug, info};

use crate::error::{AudioError, AudioResult};

/// Gelesene WAV-Datei
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WavDaten {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

fn mono_spec(sample_rate: u32) -> WavSpec {
    WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

/// Speichert Samples als mono 16-Bit PCM
///
/// # Fehler
/// - `Konfiguration` wenn keine Abtastrate gesetzt ist (0)
/// - `KeineDaten` bei leerem Puffer, es wird keine Datei angelegt
pub fn save_wav(pfad: impl AsRef<Path>, samples: &[i16], sample_rate: u32) -> AudioResult<()> {
    let pfad = pfad.as_ref();
    if sample_rate == 0 {
        return Err(AudioError::Konfiguration(
            "Abtastrate fuer WAV-Export nicht gesetzt".into(),
        ));
    }
    if samples.is_empty() {
        return Err(AudioError::KeineDaten);
    }

    let mut writer = WavWriter::create(pfad, mono_spec(sample_rate))?;
    for &s in samples {
        writer.write_sample(s)?;
    }
    writer.finalize()?;

    info!(
        pfad = %pfad.display(),
        samples = samples.len(),
        sample_rate,
        dauer_ms = samples.len() as u64 * 1000 / sample_rate as u64,
        "WAV gespeichert"
    );
    Ok(())
}

/// Liest eine 16-Bit PCM Datei; mehrkanalige Dateien werden gemittelt
///
/// # Fehler
/// `WavFormat` bei anderem Sample-Format als 16 Bit Integer
pub fn load_wav(pfad: impl AsRef<Path>) -> AudioResult<WavDaten> {
    let pfad = pfad.as_ref();
    let reader = WavReader::open(pfad)?;
    let spec = reader.spec();

    if spec.sample_format != SampleFormat::Int || spec.bits_per_sample != 16 {
        return Err(AudioError::WavFormat(format!(
            "{:?} mit {} Bit, erwartet 16-Bit Integer",
            spec.sample_format, spec.bits_per_sample
        )));
    }
    if spec.channels == 0 {
        return Err(AudioError::WavFormat("Datei ohne Kanaele".into()));
    }

    let roh = reader.into_samples::<i16>().collect::<Result<Vec<_>, _>>()?;
    let kanaele = spec.channels as usize;
    let samples = if kanaele == 1 {
        roh
    } else {
        debug!(kanaele, "Mische WAV auf mono");
        roh.chunks_exact(kanaele)
            .map(|f| (f.iter().map(|&s| s as i32).sum::<i32>() / kanaele as i32) as i16)
            .collect()
    };

    debug!(pfad = %pfad.display(), samples = samples.len(), sample_rate = spec.sample_rate, "WAV geladen");
    Ok(WavDaten {
        samples,
        sample_rate: spec.sample_rate,
    })
}
