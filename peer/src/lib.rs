//! Sprachrohr Peer
//!
//! Simuliert einen Anruf: Capture -> Rauschunterdrueckung -> Transport ueber
//! eine verlustbehaftete Strecke -> Jitter Buffer -> Wiedergabe.

pub mod call;
pub mod config;
pub mod link;
pub mod source;

pub use call::{Anruf, AnrufBericht};
pub use config::{ConfigHerkunft, PeerConfig};
