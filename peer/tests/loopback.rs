//! Integration-Tests: kompletter Anruf von WAV-Eingabe bis Wiedergabe

use sprachrohr_audio::{load_wav, save_wav, DenoiserArt};
use sprachrohr_peer::{Anruf, PeerConfig};
use sprachrohr_voice::PlayoutPolitik;
use std::path::PathBuf;

fn temp_pfad(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("sprachrohr-{}-{name}", std::process::id()))
}

/// 0.3 s Sinus bei 16 kHz
fn eingabe_schreiben(name: &str) -> PathBuf {
    let samples: Vec<i16> = (0..4_800)
        .map(|i| ((i as f32 * 0.05).sin() * 8_000.0) as i16)
        .collect();
    let pfad = temp_pfad(name);
    save_wav(&pfad, &samples, 16_000).unwrap();
    pfad
}

fn pfad_str(p: &PathBuf) -> Option<String> {
    Some(p.to_string_lossy().into_owned())
}

#[test]
fn anruf_mit_wav_eingabe_schreibt_alle_ausgaben() {
    let eingabe = eingabe_schreiben("eingabe.wav");
    let aufnahme = temp_pfad("aufnahme.wav");
    let empfang = temp_pfad("empfang.wav");
    let wiedergabe = temp_pfad("wiedergabe.wav");
    let bericht_pfad = temp_pfad("bericht.json");

    let mut cfg = PeerConfig::default();
    cfg.anruf.eingabe_wav = pfad_str(&eingabe);
    cfg.anruf.aufnahme_wav = pfad_str(&aufnahme);
    cfg.anruf.empfang_wav = pfad_str(&empfang);
    cfg.anruf.wiedergabe_wav = pfad_str(&wiedergabe);
    cfg.anruf.bericht_json = pfad_str(&bericht_pfad);
    cfg.netz.verlust_rate = 0.0;
    cfg.netz.umsortier_rate = 0.0;
    cfg.validieren().unwrap();

    let bericht = Anruf::neu(cfg).unwrap().durchfuehren().unwrap();

    // Quelle erschoepft: alle 4800 Samples wurden erfasst
    assert_eq!(bericht.capture_rate, 16_000);
    assert_eq!(bericht.senden.capture_samples, 4_800);
    assert!(bericht.senden.pakete > 0);
    assert!(bericht.senden.denoiser_frames > 0);
    // 16 kHz -> 48 kHz, hoechstens ein unvollstaendiger Frame bleibt im Carry
    assert!(bericht.senden.samples <= 14_400);
    assert!(bericht.senden.samples >= 14_400 - 480);
    assert_eq!(bericht.empfang.pakete, bericht.senden.pakete);

    let a = load_wav(&aufnahme).unwrap();
    assert_eq!(a.sample_rate, 16_000);
    assert_eq!(a.samples.len(), 4_800);

    let e = load_wav(&empfang).unwrap();
    assert_eq!(e.sample_rate, 48_000);
    assert_eq!(e.samples.len() as u64, bericht.empfang.samples);

    let w = load_wav(&wiedergabe).unwrap();
    assert_eq!(w.sample_rate, 48_000);
    assert_eq!(w.samples.len() as u64, bericht.wiedergabe.samples);

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&bericht_pfad).unwrap()).unwrap();
    assert_eq!(json["senden"]["pakete"], bericht.senden.pakete);
    assert_eq!(json["senden"]["denoiser"], "rnnoise");
    assert!(json["metriken"]
        .as_str()
        .unwrap()
        .contains("sprachrohr_pakete_gesendet_total"));

    for p in [eingabe, aufnahme, empfang, wiedergabe, bericht_pfad] {
        std::fs::remove_file(p).ok();
    }
}

#[test]
fn verlustbehaftete_strecke_mit_spektralem_backend() {
    let eingabe = eingabe_schreiben("verlust.wav");

    let mut cfg = PeerConfig::default();
    cfg.anruf.eingabe_wav = pfad_str(&eingabe);
    cfg.anruf.wiedergabe_wav = None;
    cfg.audio.backend = DenoiserArt::Spektral;
    cfg.jitter.politik = PlayoutPolitik::Stille;
    cfg.netz.verlust_rate = 0.3;
    cfg.netz.umsortier_rate = 0.0;
    cfg.netz.seed = 7;

    let bericht = Anruf::neu(cfg).unwrap().durchfuehren().unwrap();
    std::fs::remove_file(&eingabe).ok();

    assert!(bericht.strecke.verloren > 0);
    assert_eq!(
        bericht.empfang.pakete + bericht.strecke.verloren,
        bericht.senden.pakete
    );
    assert_eq!(bericht.senden.denoiser, "spektral");
    assert!(bericht.wiedergabe.pakete <= bericht.empfang.pakete);
    // Mit Politik Stille gibt es keine Wiederholungen
    assert_eq!(bericht.wiedergabe.wiederholungen, 0);
}
