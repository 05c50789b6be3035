//! Verlustbehaftete Strecke zwischen zwei Endpunkten
//!
//! Sitzt zwischen zwei `crossbeam-channel`s und simuliert ein
//! paketvermitteltes Netz ohne Reihenfolge- oder Zustellgarantie:
//! Verlust, Umsortierung und zufaellige Laufzeit. Mit festem Seed sind
//! die Entscheidungen reproduzierbar.

use bytes::Bytes;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sprachrohr_observability::PipelineMetriken;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use crate::config::NetzEinstellungen;

/// Was mit einem eingehenden Paket passiert ist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ereignis {
    Verloren,
    /// Wird erst nach dem naechsten Paket zugestellt
    Zurueckgehalten,
    Zugestellt,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreckenStatistik {
    pub eingang: u64,
    pub verloren: u64,
    pub umsortiert: u64,
    pub zugestellt: u64,
}

/// Entscheidungslogik ohne Zeitbezug
pub struct Strecke {
    rng: StdRng,
    verlust_rate: f64,
    umsortier_rate: f64,
    max_verzoegerung: Duration,
    zurueckgehalten: Option<Bytes>,
    statistik: StreckenStatistik,
}

impl Strecke {
    pub fn neu(einstellungen: &NetzEinstellungen) -> Self {
        Self {
            rng: StdRng::seed_from_u64(einstellungen.seed),
            verlust_rate: einstellungen.verlust_rate,
            umsortier_rate: einstellungen.umsortier_rate,
            max_verzoegerung: Duration::from_millis(einstellungen.max_verzoegerung_ms),
            zurueckgehalten: None,
            statistik: StreckenStatistik::default(),
        }
    }

    fn verzoegerung(&mut self) -> Duration {
        if self.max_verzoegerung.is_zero() {
            return Duration::ZERO;
        }
        self.max_verzoegerung.mul_f64(self.rng.gen::<f64>())
    }

    /// Entscheidet ueber ein Paket; liefert die jetzt zuzustellenden Pakete
    /// samt Laufzeit in Zustellreihenfolge
    pub fn weiterleiten(&mut self, paket: Bytes) -> (Ereignis, Vec<(Bytes, Duration)>) {
        self.statistik.eingang += 1;

        if self.rng.gen::<f64>() < self.verlust_rate {
            self.statistik.verloren += 1;
            return (Ereignis::Verloren, Vec::new());
        }

        if self.zurueckgehalten.is_none() && self.rng.gen::<f64>() < self.umsortier_rate {
            self.zurueckgehalten = Some(paket);
            self.statistik.umsortiert += 1;
            return (Ereignis::Zurueckgehalten, Vec::new());
        }

        let mut zustellen = Vec::with_capacity(2);
        let v = self.verzoegerung();
        zustellen.push((paket, v));
        if let Some(alt) = self.zurueckgehalten.take() {
            let v = self.verzoegerung();
            zustellen.push((alt, v));
        }
        self.statistik.zugestellt += zustellen.len() as u64;
        (Ereignis::Zugestellt, zustellen)
    }

    /// Gibt ein noch zurueckgehaltenes Paket am Ende frei
    pub fn leeren(&mut self) -> Option<Bytes> {
        let paket = self.zurueckgehalten.take()?;
        self.statistik.zugestellt += 1;
        Some(paket)
    }

    pub fn statistik(&self) -> StreckenStatistik {
        self.statistik
    }
}

struct Unterwegs {
    faellig: Instant,
    nr: u64,
    paket: Bytes,
}

impl PartialEq for Unterwegs {
    fn eq(&self, other: &Self) -> bool {
        self.faellig == other.faellig && self.nr == other.nr
    }
}

impl Eq for Unterwegs {}

impl PartialOrd for Unterwegs {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Unterwegs {
    // Umgekehrt: BinaryHeap liefert so das frueheste Paket zuerst
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .faellig
            .cmp(&self.faellig)
            .then_with(|| other.nr.cmp(&self.nr))
    }
}

const LEERLAUF: Duration = Duration::from_millis(50);

/// Betreibt die Strecke bis der Sender den Eingang schliesst
///
/// Noch unterwegs befindliche Pakete werden danach termingerecht
/// zugestellt, anschliessend wird der Ausgang geschlossen.
pub fn strecke_betreiben(
    eingang: Receiver<Bytes>,
    ausgang: Sender<Bytes>,
    mut strecke: Strecke,
    metriken: PipelineMetriken,
) -> StreckenStatistik {
    let mut unterwegs: BinaryHeap<Unterwegs> = BinaryHeap::new();
    let mut nr: u64 = 0;

    loop {
        if !zustellen_faellige(&mut unterwegs, &ausgang) {
            return strecke.statistik();
        }

        let warten = unterwegs
            .peek()
            .map(|u| u.faellig.saturating_duration_since(Instant::now()))
            .unwrap_or(LEERLAUF);

        match eingang.recv_timeout(warten) {
            Ok(paket) => {
                let (ereignis, pakete) = strecke.weiterleiten(paket);
                match ereignis {
                    Ereignis::Verloren => {
                        metriken.link_pakete.with_label_values(&["verloren"]).inc();
                        trace!("Strecke: Paket verloren");
                    }
                    Ereignis::Zurueckgehalten => {
                        metriken.link_pakete.with_label_values(&["umsortiert"]).inc();
                    }
                    Ereignis::Zugestellt => {}
                }
                let jetzt = Instant::now();
                for (paket, verzoegerung) in pakete {
                    metriken.link_verzoegerung.observe(verzoegerung.as_secs_f64());
                    metriken.link_pakete.with_label_values(&["zugestellt"]).inc();
                    unterwegs.push(Unterwegs {
                        faellig: jetzt + verzoegerung,
                        nr,
                        paket,
                    });
                    nr += 1;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    if let Some(paket) = strecke.leeren() {
        metriken.link_pakete.with_label_values(&["zugestellt"]).inc();
        unterwegs.push(Unterwegs {
            faellig: Instant::now(),
            nr,
            paket,
        });
    }
    while let Some(naechstes) = unterwegs.peek() {
        let rest = naechstes.faellig.saturating_duration_since(Instant::now());
        if !rest.is_zero() {
            std::thread::sleep(rest);
        }
        if !zustellen_faellige(&mut unterwegs, &ausgang) {
            break;
        }
    }

    let statistik = strecke.statistik();
    debug!(
        eingang = statistik.eingang,
        verloren = statistik.verloren,
        umsortiert = statistik.umsortiert,
        "Strecke geschlossen"
    );
    statistik
}

/// Stellt alle faelligen Pakete zu; `false` wenn der Empfaenger weg ist
fn zustellen_faellige(unterwegs: &mut BinaryHeap<Unterwegs>, ausgang: &Sender<Bytes>) -> bool {
    let jetzt = Instant::now();
    while unterwegs.peek().is_some_and(|u| u.faellig <= jetzt) {
        if let Some(u) = unterwegs.pop() {
            if ausgang.send(u.paket).is_err() {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn netz(verlust: f64, umsortier: f64) -> NetzEinstellungen {
        NetzEinstellungen {
            verlust_rate: verlust,
            umsortier_rate: umsortier,
            max_verzoegerung_ms: 0,
            seed: 1234,
        }
    }

    fn paket(n: u8) -> Bytes {
        Bytes::from(vec![n])
    }

    #[test]
    fn ideale_strecke_stellt_alles_zu() {
        let mut s = Strecke::neu(&netz(0.0, 0.0));
        for n in 0..50u8 {
            let (e, raus) = s.weiterleiten(paket(n));
            assert_eq!(e, Ereignis::Zugestellt);
            assert_eq!(raus.len(), 1);
            assert_eq!(raus[0].0, paket(n));
            assert_eq!(raus[0].1, Duration::ZERO);
        }
        assert_eq!(s.statistik().zugestellt, 50);
    }

    #[test]
    fn totale_strecke_verliert_alles() {
        let mut s = Strecke::neu(&netz(1.0, 0.0));
        for n in 0..20u8 {
            assert_eq!(s.weiterleiten(paket(n)).0, Ereignis::Verloren);
        }
        assert_eq!(s.statistik().verloren, 20);
    }

    #[test]
    fn umsortierung_tauscht_nachbarn() {
        let mut s = Strecke::neu(&netz(0.0, 1.0));
        let (e, raus) = s.weiterleiten(paket(1));
        assert_eq!(e, Ereignis::Zurueckgehalten);
        assert!(raus.is_empty());
        // Es wird hoechstens ein Paket gleichzeitig zurueckgehalten
        let (_, raus) = s.weiterleiten(paket(2));
        let reihenfolge: Vec<Bytes> = raus.into_iter().map(|(p, _)| p).collect();
        assert_eq!(reihenfolge, vec![paket(2), paket(1)]);
    }

    #[test]
    fn gleicher_seed_gleiche_entscheidungen() {
        let mut a = Strecke::neu(&netz(0.3, 0.2));
        let mut b = Strecke::neu(&netz(0.3, 0.2));
        for n in 0..100u8 {
            assert_eq!(a.weiterleiten(paket(n)).0, b.weiterleiten(paket(n)).0);
        }
        assert_eq!(a.statistik(), b.statistik());
    }

    #[test]
    fn verlustrate_ungefaehr_eingehalten() {
        let mut s = Strecke::neu(&netz(0.1, 0.0));
        for n in 0..10_000u32 {
            s.weiterleiten(Bytes::from(n.to_be_bytes().to_vec()));
        }
        let verloren = s.statistik().verloren;
        assert!((700..1300).contains(&verloren), "verloren: {verloren}");
    }

    #[test]
    fn betrieb_ueber_kanaele() {
        let (tx_ein, rx_ein) = crossbeam_channel::unbounded();
        let (tx_aus, rx_aus) = crossbeam_channel::unbounded();
        let metriken = PipelineMetriken::neu().unwrap();
        let strecke = Strecke::neu(&NetzEinstellungen {
            verlust_rate: 0.0,
            umsortier_rate: 0.0,
            max_verzoegerung_ms: 5,
            seed: 9,
        });
        let t = std::thread::spawn(move || strecke_betreiben(rx_ein, tx_aus, strecke, metriken));
        for n in 0..10u8 {
            tx_ein.send(paket(n)).unwrap();
        }
        drop(tx_ein);
        let statistik = t.join().unwrap();
        let empfangen: Vec<Bytes> = rx_aus.iter().collect();
        assert_eq!(empfangen.len(), 10);
        assert_eq!(statistik.zugestellt, 10);
    }

    #[test]
    fn zurueckgehaltenes_paket_am_ende_zugestellt() {
        let (tx_ein, rx_ein) = crossbeam_channel::unbounded();
        let (tx_aus, rx_aus) = crossbeam_channel::unbounded();
        let strecke = Strecke::neu(&netz(0.0, 1.0));
        let metriken = PipelineMetriken::neu().unwrap();
        let t = std::thread::spawn(move || strecke_betreiben(rx_ein, tx_aus, strecke, metriken));
        tx_ein.send(paket(7)).unwrap();
        drop(tx_ein);
        t.join().unwrap();
        assert_eq!(rx_aus.iter().collect::<Vec<_>>(), vec![paket(7)]);
    }
}
