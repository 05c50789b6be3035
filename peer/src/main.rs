//! Sprachrohr Peer – Einstiegspunkt
//!
//! Laedt die Konfiguration, initialisiert das Logging und fuehrt einen
//! simulierten Anruf durch.

use anyhow::Result;
use sprachrohr_observability::logging_initialisieren;
use sprachrohr_peer::{Anruf, ConfigHerkunft, PeerConfig};

fn main() -> Result<()> {
    // Konfigurationsdatei-Pfad aus Umgebungsvariable oder Standard
    let config_pfad =
        std::env::var("SPRACHROHR_CONFIG").unwrap_or_else(|_| "sprachrohr.toml".into());

    let (config, herkunft) = PeerConfig::laden(&config_pfad)?;
    config.validieren()?;

    logging_initialisieren(&config.logging.level, &config.logging.format)?;

    if herkunft == ConfigHerkunft::Standard {
        tracing::warn!(
            pfad = %config_pfad,
            "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
        );
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_pfad,
        "Sprachrohr Peer wird initialisiert"
    );

    let anruf = Anruf::neu(config)?;
    let bericht = anruf.durchfuehren()?;

    println!(
        "{}: {} Pakete gesendet, {} verloren, {} wiedergegeben, Lueckenrate {:.1}%",
        bericht.anruf,
        bericht.senden.pakete,
        bericht.strecke.verloren,
        bericht.wiedergabe.pakete,
        bericht.wiedergabe.luecken_rate * 100.0
    );
    Ok(())
}
