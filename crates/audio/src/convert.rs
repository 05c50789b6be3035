//! Konvertierung zwischen i16-PCM und normalisierten f32-Samples
//!
//! Eingang: `s / 32768` (ergibt exakt [-1.0, 1.0)).
//! Ausgang: erst auf [-1.0, 1.0] klemmen, dann mit 32767 skalieren,
//! damit Werte ausserhalb des Bereichs nicht ueberlaufen.

const EINGANG_SKALA: f32 = 1.0 / 32768.0;
const AUSGANG_SKALA: f32 = 32767.0;

/// i16-PCM -> normalisierte Floats
pub fn i16_to_f32(input: &[i16]) -> Vec<f32> {
    input.iter().map(|&s| s as f32 * EINGANG_SKALA).collect()
}

/// Normalisierte Floats -> i16-PCM (mit Clamping)
pub fn f32_to_i16(input: &[f32]) -> Vec<i16> {
    input.iter().map(|&s| sample_to_i16(s)).collect()
}

/// Einzelnes Sample quantisieren
#[inline]
pub fn sample_to_i16(s: f32) -> i16 {
    (s.clamp(-1.0, 1.0) * AUSGANG_SKALA) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grenzen_eingang() {
        let f = i16_to_f32(&[i16::MIN, 0, i16::MAX]);
        assert_eq!(f[0], -1.0);
        assert_eq!(f[1], 0.0);
        assert!(f[2] < 1.0 && f[2] > 0.999);
    }

    #[test]
    fn uebersteuerung_wird_geklemmt() {
        // Ohne Clamping wuerde 1.5 * 32767 ueberlaufen
        let out = f32_to_i16(&[1.5, -3.0, f32::INFINITY]);
        assert_eq!(out, vec![i16::MAX, -i16::MAX, i16::MAX]);
    }

    #[test]
    fn nan_wird_null() {
        // `as` saettigt NaN auf 0
        assert_eq!(sample_to_i16(f32::NAN), 0);
    }

    #[test]
    fn rundreise_bleibt_nahe() {
        let input: Vec<i16> = vec![-20000, -1, 0, 1, 12345, 32000];
        let zurueck = f32_to_i16(&i16_to_f32(&input));
        for (a, b) in input.iter().zip(zurueck.iter()) {
            assert!((*a as i32 - *b as i32).abs() <= 1, "{a} -> {b}");
        }
    }
}
