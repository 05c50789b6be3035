//! Structured Logging Setup via tracing-subscriber
//!
//! Umgebungsvariablen haben Vorrang vor der Konfigurationsdatei:
//! - `SR_LOG_LEVEL`: Filter-Direktive (z.B. `debug` oder `sprachrohr_voice=trace`)
//! - `SR_LOG_FORMAT`: `text` oder `json`

use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, EnvFilter};

pub const ENV_LOG_LEVEL: &str = "SR_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "SR_LOG_FORMAT";

/// Initialisiert das Logging-System einmal pro Prozess.
///
/// # Fehler
/// Wenn bereits ein globaler Subscriber gesetzt ist
pub fn logging_initialisieren(level: &str, format: &str) -> Result<()> {
    let filter = EnvFilter::try_from_env(ENV_LOG_LEVEL)
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let format = std::env::var(ENV_LOG_FORMAT).unwrap_or_else(|_| format.to_string());

    let ergebnis = match format.as_str() {
        "json" => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_names(true)
            .with_current_span(true)
            .try_init(),
        _ => fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_names(true)
            .try_init(),
    };
    ergebnis.map_err(|e| anyhow!("Logging bereits initialisiert: {e}"))?;
    tracing::debug!(format = %format, "Logging initialisiert");
    Ok(())
}

/// Validiert ob ein Log-Level-String gueltig ist.
pub fn log_level_gueltig(level: &str) -> bool {
    matches!(level, "trace" | "debug" | "info" | "warn" | "error")
}

/// Validiert ob ein Log-Format-String gueltig ist.
pub fn log_format_gueltig(format: &str) -> bool {
    matches!(format, "text" | "json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_werte() {
        for l in ["trace", "debug", "info", "warn", "error"] {
            assert!(log_level_gueltig(l));
        }
        assert!(!log_level_gueltig("verbose"));
        assert!(!log_level_gueltig("INFO"));
        assert!(!log_level_gueltig(""));
    }

    #[test]
    fn log_format_werte() {
        assert!(log_format_gueltig("text"));
        assert!(log_format_gueltig("json"));
        assert!(!log_format_gueltig("xml"));
        assert!(!log_format_gueltig("JSON"));
    }

    #[test]
    fn zweite_initialisierung_ist_fehler() {
        // Erster Aufruf kann je nach Testreihenfolge schon belegt sein,
        // der zweite schlaegt in jedem Fall fehl
        let _ = logging_initialisieren("warn", "text");
        assert!(logging_initialisieren("warn", "text").is_err());
    }
}
