//! Lineare Abtastraten-Konvertierung
//!
//! Zustandslos pro Aufruf. Fuer Sprache (Schmalband bis 48 kHz) reicht
//! lineare Interpolation; ein Anti-Aliasing-Filter ist bewusst nicht
//! vorgesehen.

use std::borrow::Cow;

/// Konvertiert normalisierte Samples von `input_rate` nach `output_rate`.
///
/// - Gleiche Raten: Eingabe wird unveraendert (geliehen) zurueckgegeben.
/// - Ausgabelaenge: `round(len * output_rate / input_rate)`.
/// - Ausgabe-Sample `i` liegt bei Quellposition `i / ratio` und wird linear
///   zwischen den beiden umgebenden Samples interpoliert. Positionen am oder
///   hinter dem letzten Index liefern das letzte Eingabe-Sample.
/// - Leere Eingabe ergibt leere Ausgabe, nie einen Fehler.
pub fn resample(input: &[f32], input_rate: u32, output_rate: u32) -> Cow<'_, [f32]> {
    if input_rate == output_rate {
        return Cow::Borrowed(input);
    }
    if input.is_empty() || input_rate == 0 {
        return Cow::Owned(Vec::new());
    }

    let ratio = output_rate as f64 / input_rate as f64;
    let ausgabe_laenge = (input.len() as f64 * ratio).round() as usize;
    let letzter = input.len() - 1;

    let mut output = Vec::with_capacity(ausgabe_laenge);
    for i in 0..ausgabe_laenge {
        let quelle = i as f64 / ratio;
        let idx0 = quelle as usize;
        if idx0 >= letzter {
            output.push(input[letzter]);
            continue;
        }
        let idx1 = idx0 + 1;
        let t = (quelle - idx0 as f64) as f32;
        output.push(input[idx0] * (1.0 - t) + input[idx1] * t);
    }

    Cow::Owned(output)
}

/// Erwartete Ausgabelaenge fuer `resample` ohne die Konvertierung auszufuehren
pub fn ausgabe_laenge(input_len: usize, input_rate: u32, output_rate: u32) -> usize {
    if input_rate == output_rate {
        return input_len;
    }
    if input_rate == 0 {
        return 0;
    }
    (input_len as f64 * output_rate as f64 / input_rate as f64).round() as usize
}
