//! Audio-Paket-Framing
//!
//! Der Transport liefert nur opake Binaerpakete ohne Reihenfolge- oder
//! Zustellgarantie. Der Zeitstempel fuer den Jitter Buffer reist deshalb im
//! eigenen Header mit. Ein Paket entspricht genau einem Frame, den der
//! Sender an den Transport uebergeben hat.
//!
//! ## Paketformat (Header = 12 Bytes, big-endian)
//!
//! ```text
//! Offset  Len  Beschreibung
//! ------  ---  -----------
//!  0       1   Version
//!  1       1   Flags
//!  2       2   Anzahl Samples (N)
//!  4       4   Zeitstempel (Sample-Einheiten der Senderate)
//!  8       4   SSRC – Senderkennung
//! 12     2*N   PCM, i16 little-endian
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Aktuelle Protokollversion
pub const PROTOKOLL_VERSION: u8 = 1;

/// Maximale Samples pro Paket (40 ms bei 48 kHz)
pub const MAX_SAMPLES: usize = 1920;

/// Bit-Masken fuer das Flags-Feld
pub struct PacketFlags;

impl PacketFlags {
    /// Erstes Paket eines Streams
    pub const STREAM_START: u8 = 0x01;
}

/// Fehler beim Dekodieren eines Transportpakets
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    #[error("Paket zu kurz: {0} Bytes (Header braucht {hdr})", hdr = AudioPacketHeader::SIZE)]
    ZuKurz(usize),

    #[error("Ungueltige Protokollversion: {0} (erwartet {v})", v = PROTOKOLL_VERSION)]
    Version(u8),

    #[error("Laenge passt nicht: Header meldet {erwartet} Samples, Nutzdaten haben {erhalten} Bytes")]
    Laenge { erwartet: usize, erhalten: usize },

    #[error("Zu viele Samples: {0} (Maximum {max})", max = MAX_SAMPLES)]
    ZuGross(usize),
}

/// 12-Byte Header eines Audio-Pakets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioPacketHeader {
    pub version: u8,
    pub flags: u8,
    pub sample_count: u16,
    pub timestamp: u32,
    pub ssrc: u32,
}

impl AudioPacketHeader {
    /// Header-Groesse in Bytes
    pub const SIZE: usize = 12;

    fn schreiben(&self, buf: &mut BytesMut) {
        buf.put_u8(self.version);
        buf.put_u8(self.flags);
        buf.put_u16(self.sample_count);
        buf.put_u32(self.timestamp);
        buf.put_u32(self.ssrc);
    }

    fn lesen(buf: &mut &[u8]) -> Result<Self, WireError> {
        if buf.len() < Self::SIZE {
            return Err(WireError::ZuKurz(buf.len()));
        }
        let version = buf.get_u8();
        if version != PROTOKOLL_VERSION {
            return Err(WireError::Version(version));
        }
        Ok(Self {
            version,
            flags: buf.get_u8(),
            sample_count: buf.get_u16(),
            timestamp: buf.get_u32(),
            ssrc: buf.get_u32(),
        })
    }

    /// Prueft ob ein bestimmtes Flag gesetzt ist
    pub fn hat_flag(&self, flag: u8) -> bool {
        self.flags & flag != 0
    }
}

/// Ein Audio-Paket: Zeitstempel plus PCM-Samples
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioPacket {
    pub timestamp: u32,
    pub ssrc: u32,
    pub flags: u8,
    pub samples: Vec<i16>,
}

impl AudioPacket {
    /// Erstellt ein Audio-Paket ohne Flags
    pub fn neu(timestamp: u32, ssrc: u32, samples: Vec<i16>) -> Self {
        Self {
            timestamp,
            ssrc,
            flags: 0,
            samples,
        }
    }

    /// Setzt ein Flag (Builder-Stil)
    pub fn mit_flag(mut self, flag: u8) -> Self {
        self.flags |= flag;
        self
    }

    /// Prueft ob das Paket einen neuen Stream eroeffnet
    pub fn ist_stream_start(&self) -> bool {
        self.flags & PacketFlags::STREAM_START != 0
    }

    /// Serialisiert Header und PCM in einen Transport-Puffer
    ///
    /// # Fehler
    /// `ZuGross` wenn mehr als `MAX_SAMPLES` Samples im Paket stecken
    pub fn encode(&self) -> Result<Bytes, WireError> {
        if self.samples.len() > MAX_SAMPLES {
            return Err(WireError::ZuGross(self.samples.len()));
        }
        let mut buf = BytesMut::with_capacity(AudioPacketHeader::SIZE + self.samples.len() * 2);
        AudioPacketHeader {
            version: PROTOKOLL_VERSION,
            flags: self.flags,
            sample_count: self.samples.len() as u16,
            timestamp: self.timestamp,
            ssrc: self.ssrc,
        }
        .schreiben(&mut buf);
        for &s in &self.samples {
            buf.put_i16_le(s);
        }
        Ok(buf.freeze())
    }

    /// Deserialisiert und validiert ein Transportpaket
    pub fn decode(mut buf: &[u8]) -> Result<Self, WireError> {
        let header = AudioPacketHeader::lesen(&mut buf)?;
        let anzahl = header.sample_count as usize;
        if anzahl > MAX_SAMPLES {
            return Err(WireError::ZuGross(anzahl));
        }
        if buf.len() != anzahl * 2 {
            return Err(WireError::Laenge {
                erwartet: anzahl,
                erhalten: buf.len(),
            });
        }
        let mut samples = Vec::with_capacity(anzahl);
        while buf.has_remaining() {
            samples.push(buf.get_i16_le());
        }
        Ok(Self {
            timestamp: header.timestamp,
            ssrc: header.ssrc,
            flags: header.flags,
            samples,
        })
    }

    /// Gesamtgroesse auf dem Transport in Bytes
    pub fn groesse(&self) -> usize {
        AudioPacketHeader::SIZE + self.samples.len() * 2
    }
}
