//! Host-facing mixing sessions.

pub mod live;
pub mod offline;

pub use live::LiveAudioMixer;
pub use offline::{AudioMixer, MixRequest, TickMix};
