//! sprachrohr-protocol – Transport-Framing
//!
//! Definiert, wie ein Audio-Paket (Zeitstempel + PCM) auf dem
//! unzuverlaessigen Transport aussieht.

pub mod audio;

pub use audio::{AudioPacket, AudioPacketHeader, PacketFlags, WireError, MAX_SAMPLES};
