//! Mixer session configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::MixError;
use crate::format::SampleFormat;

/// Tick cadence used when a config does not name one.
pub const DEFAULT_CHUNK_DURATION_MS: u64 = 100;

/// Settings shared by every stream of a mixing session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixerConfig {
    /// Sample format every stream must deliver.
    pub format: SampleFormat,
    /// Cadence of live mixing ticks, in milliseconds.
    #[serde(default = "default_chunk_duration_ms", alias = "chunk_ms")]
    pub chunk_duration_ms: u64,
    /// Scale whole waves into range instead of clamping overflowing samples.
    #[serde(default, alias = "clip_protection")]
    pub prevent_clipping: bool,
}

fn default_chunk_duration_ms() -> u64 {
    DEFAULT_CHUNK_DURATION_MS
}

impl MixerConfig {
    pub fn new(format: SampleFormat) -> Self {
        Self {
            format,
            chunk_duration_ms: DEFAULT_CHUNK_DURATION_MS,
            prevent_clipping: false,
        }
    }

    /// Tick cadence as a duration, never zero.
    pub fn chunk_duration(&self) -> Duration {
        Duration::from_millis(self.chunk_duration_ms.max(1))
    }

    /// Convert a host-supplied start offset to a lead-in duration.
    ///
    /// Offsets count from the moment the stream is added; an offset before
    /// that moment cannot be honored.
    pub fn offset_from_millis(offset_ms: i64) -> Result<Duration, MixError> {
        if offset_ms < 0 {
            return Err(MixError::InvalidOffset { offset_ms });
        }
        Ok(Duration::from_millis(offset_ms as u64))
    }
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self::new(SampleFormat::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_defaults_from_minimal_json() {
        let config: MixerConfig = serde_json::from_str(
            r#"{"format": {"encoding": "s16le", "channels": 1, "rate": 1000}}"#,
        )
        .expect("parse");
        assert_eq!(config.chunk_duration_ms, 100);
        assert!(!config.prevent_clipping);
        assert_eq!(config.format.sample_rate(), 1000);
    }

    #[test]
    fn honors_field_aliases() {
        let config: MixerConfig = serde_json::from_str(
            r#"{
                "format": {"encoding": "u8", "channels": 2, "sample_rate": 8000},
                "chunk_ms": 40,
                "clip_protection": true
            }"#,
        )
        .expect("parse");
        assert_eq!(config.chunk_duration_ms, 40);
        assert!(config.prevent_clipping);
    }

    #[test]
    fn round_trips_through_json() {
        let mut config = MixerConfig::default();
        config.chunk_duration_ms = 25;
        config.prevent_clipping = true;
        let text = serde_json::to_string(&config).expect("serialize");
        let back: MixerConfig = serde_json::from_str(&text).expect("parse");
        assert_eq!(back, config);
    }

    #[test]
    fn rejects_offsets_before_the_stream_start() {
        assert_eq!(
            MixerConfig::offset_from_millis(-1),
            Err(MixError::InvalidOffset { offset_ms: -1 })
        );
        assert_eq!(
            MixerConfig::offset_from_millis(0),
            Ok(Duration::ZERO)
        );
        assert_eq!(
            MixerConfig::offset_from_millis(250),
            Ok(Duration::from_millis(250))
        );
    }

    #[test]
    fn zero_chunk_duration_falls_back_to_one_millisecond() {
        let mut config = MixerConfig::default();
        config.chunk_duration_ms = 0;
        assert_eq!(config.chunk_duration(), Duration::from_millis(1));
    }
}
