//! Wiedergabe-Takt: Jitter Buffer -> Render
//!
//! Der Render-Thread ruft pro Tick [`PlayoutScheduler::pull`] auf. Ist ein
//! Paket faellig, wird es ausgegeben; sonst entscheidet die Politik:
//!
//! 1. **Stille**: Nullen in angefragter Laenge
//! 2. **Halten**: letzter Frame wird mit abnehmender Lautstaerke wiederholt,
//!    nach `MAX_WIEDERHOLUNGEN` folgt Stille
//!
//! `pull` blockiert nie.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, trace};

use crate::jitter_buffer::JitterBuffer;

/// Maximale Wiederholungen vor dem Uebergang zu Stille
pub const MAX_WIEDERHOLUNGEN: u32 = 3;

/// Lautstaerke-Faktor pro Wiederholung
pub const FADE_FAKTOR: f32 = 0.75;

/// Verhalten bei fehlendem Paket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayoutPolitik {
    #[default]
    Stille,
    Halten,
}

/// Herkunft eines ausgegebenen Frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameArt {
    /// Echtes Paket aus dem Jitter Buffer
    Paket { zeitstempel: u32 },
    /// Wiederholung des letzten Pakets (1-basiert)
    Wiederholung { nummer: u32 },
    Stille,
}

/// Ein Frame fuer den Render-Pfad
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayoutFrame {
    pub samples: Vec<i16>,
    pub art: FrameArt,
}

impl PlayoutFrame {
    fn stille(laenge: usize) -> Self {
        Self {
            samples: vec![0; laenge],
            art: FrameArt::Stille,
        }
    }

    pub fn ist_paket(&self) -> bool {
        matches!(self.art, FrameArt::Paket { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayoutStatistik {
    pub pakete: u64,
    pub wiederholungen: u64,
    pub stille: u64,
    /// Laengste Serie von Ticks ohne Paket
    pub laengste_luecke: u32,
}

impl PlayoutStatistik {
    /// Anteil der Ticks ohne echtes Paket (0.0–1.0)
    pub fn luecken_rate(&self) -> f64 {
        let gesamt = self.pakete + self.wiederholungen + self.stille;
        if gesamt == 0 {
            0.0
        } else {
            (self.wiederholungen + self.stille) as f64 / gesamt as f64
        }
    }
}

pub struct PlayoutScheduler {
    puffer: Arc<JitterBuffer>,
    politik: PlayoutPolitik,
    letzter_frame: Option<Vec<i16>>,
    wiederholungen: u32,
    fade: f32,
    aktuelle_luecke: u32,
    statistik: PlayoutStatistik,
}

impl PlayoutScheduler {
    pub fn neu(puffer: Arc<JitterBuffer>, politik: PlayoutPolitik) -> Self {
        Self {
            puffer,
            politik,
            letzter_frame: None,
            wiederholungen: 0,
            fade: 1.0,
            aktuelle_luecke: 0,
            statistik: PlayoutStatistik::default(),
        }
    }

    /// Liefert den Frame fuer diesen Render-Tick
    pub fn pull(&mut self, angefragt: usize) -> PlayoutFrame {
        if let Some(paket) = self.puffer.try_get_next_paket() {
            if self.aktuelle_luecke > 0 {
                debug!(ticks = self.aktuelle_luecke, "Wiedergabe nach Luecke fortgesetzt");
            }
            self.aktuelle_luecke = 0;
            self.wiederholungen = 0;
            self.fade = 1.0;
            self.statistik.pakete += 1;
            if self.politik == PlayoutPolitik::Halten {
                self.letzter_frame = Some(paket.samples.clone());
            }
            return PlayoutFrame {
                samples: paket.samples,
                art: FrameArt::Paket {
                    zeitstempel: paket.zeitstempel,
                },
            };
        }

        self.aktuelle_luecke += 1;
        self.statistik.laengste_luecke = self.statistik.laengste_luecke.max(self.aktuelle_luecke);

        match self.politik {
            PlayoutPolitik::Stille => self.stille(angefragt),
            PlayoutPolitik::Halten => self.halten(angefragt),
        }
    }

    fn halten(&mut self, angefragt: usize) -> PlayoutFrame {
        let Some(letzter) = self.letzter_frame.as_ref() else {
            return self.stille(angefragt);
        };
        if self.wiederholungen >= MAX_WIEDERHOLUNGEN {
            return self.stille(angefragt);
        }

        self.wiederholungen += 1;
        self.fade *= FADE_FAKTOR;
        let fade = self.fade;
        let samples = letzter
            .iter()
            .map(|&s| (s as f32 * fade) as i16)
            .collect();
        self.statistik.wiederholungen += 1;
        trace!(nummer = self.wiederholungen, fade, "Letzter Frame wiederholt");

        PlayoutFrame {
            samples,
            art: FrameArt::Wiederholung {
                nummer: self.wiederholungen,
            },
        }
    }

    fn stille(&mut self, angefragt: usize) -> PlayoutFrame {
        self.statistik.stille += 1;
        PlayoutFrame::stille(angefragt)
    }

    pub fn politik(&self) -> PlayoutPolitik {
        self.politik
    }

    pub fn set_politik(&mut self, politik: PlayoutPolitik) {
        self.politik = politik;
        if politik == PlayoutPolitik::Stille {
            self.letzter_frame = None;
        }
    }

    pub fn statistik(&self) -> PlayoutStatistik {
        self.statistik.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler(politik: PlayoutPolitik) -> (PlayoutScheduler, Arc<JitterBuffer>) {
        let jb = Arc::new(JitterBuffer::neu(1, 10));
        (PlayoutScheduler::neu(jb.clone(), politik), jb)
    }

    #[test]
    fn leerer_buffer_liefert_stille() {
        let (mut s, _) = scheduler(PlayoutPolitik::Stille);
        let f = s.pull(160);
        assert_eq!(f.art, FrameArt::Stille);
        assert_eq!(f.samples, vec![0; 160]);
    }

    #[test]
    fn paket_wird_ausgegeben() {
        let (mut s, jb) = scheduler(PlayoutPolitik::Stille);
        jb.insert(480, vec![7; 160]);
        let f = s.pull(160);
        assert_eq!(f.art, FrameArt::Paket { zeitstempel: 480 });
        assert_eq!(f.samples, vec![7; 160]);
        assert_eq!(s.statistik().pakete, 1);
    }

    #[test]
    fn halten_mit_fade_dann_stille() {
        let (mut s, jb) = scheduler(PlayoutPolitik::Halten);
        jb.insert(0, vec![1000; 4]);
        assert!(s.pull(4).ist_paket());

        let w1 = s.pull(4);
        assert_eq!(w1.art, FrameArt::Wiederholung { nummer: 1 });
        assert_eq!(w1.samples, vec![750; 4]);
        let w2 = s.pull(4);
        assert_eq!(w2.samples, vec![562; 4]);
        let w3 = s.pull(4);
        assert_eq!(w3.art, FrameArt::Wiederholung { nummer: 3 });
        assert_eq!(w3.samples, vec![421; 4]);

        let f = s.pull(4);
        assert_eq!(f.art, FrameArt::Stille);
        let st = s.statistik();
        assert_eq!(st.wiederholungen, 3);
        assert_eq!(st.stille, 1);
        assert_eq!(st.laengste_luecke, 4);
    }

    #[test]
    fn neues_paket_setzt_fade_zurueck() {
        let (mut s, jb) = scheduler(PlayoutPolitik::Halten);
        jb.insert(0, vec![1000; 4]);
        s.pull(4);
        s.pull(4);
        jb.insert(4, vec![2000; 4]);
        assert!(s.pull(4).ist_paket());
        let w = s.pull(4);
        assert_eq!(w.art, FrameArt::Wiederholung { nummer: 1 });
        assert_eq!(w.samples, vec![1500; 4]);
    }

    #[test]
    fn halten_ohne_vorgaenger_ist_stille() {
        let (mut s, _) = scheduler(PlayoutPolitik::Halten);
        assert_eq!(s.pull(10).art, FrameArt::Stille);
    }

    #[test]
    fn luecken_rate() {
        let (mut s, jb) = scheduler(PlayoutPolitik::Stille);
        jb.insert(0, vec![1; 10]);
        s.pull(10);
        s.pull(10);
        s.pull(10);
        s.pull(10);
        assert!((s.statistik().luecken_rate() - 0.75).abs() < 1e-9);
    }
}
