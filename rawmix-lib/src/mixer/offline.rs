//! Batch mixing session driven by clock ticks or explicit demand.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use crate::adder::Adder;
use crate::align::{Aligner, TickChunk};
use crate::clock::Clock;
use crate::config::MixerConfig;
use crate::error::MixError;
use crate::format::SampleFormat;
use crate::queue::StreamKey;

/// Output of one demand-driven request.
#[derive(Debug, Clone, Default)]
pub struct MixRequest {
    /// Mixed audio, at most the requested length in whole frames.
    pub payload: Vec<u8>,
    /// Bytes each still-running stream was short of serving the request.
    pub still_needed: Vec<(StreamKey, usize)>,
}

/// Output of one timer-driven tick.
#[derive(Debug, Clone, Default)]
pub struct TickMix {
    /// Mixed audio for the elapsed time.
    pub payload: Vec<u8>,
    /// Whole-sample shortfall of the best-supplied stream this tick.
    pub missing_samples: usize,
}

/// Batch mixing session over an explicit stream set.
///
/// Streams are registered, fed, and ended by the host; mixed output is drawn
/// either by demand ([`AudioMixer::request`]) or on a clock
/// ([`AudioMixer::tick`]). Both drivers share one carry queue, so audio the
/// clip-preventing adder holds back reaches the output once its wave
/// completes, and partial frames stay queued until completed. The adder is
/// flushed when the last stream drains.
#[derive(Debug)]
pub struct AudioMixer {
    aligner: Aligner,
    adder: Adder,
    carry: VecDeque<u8>,
    saw_streams: bool,
}

impl AudioMixer {
    pub fn new(config: &MixerConfig) -> Self {
        Self {
            aligner: Aligner::new(config.format),
            adder: Adder::new(config.format, config.prevent_clipping),
            carry: VecDeque::new(),
            saw_streams: false,
        }
    }

    /// Create a session whose ticks follow the given clock.
    pub fn with_clock(config: &MixerConfig, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self {
            aligner: Aligner::with_clock(config.format, clock),
            adder: Adder::new(config.format, config.prevent_clipping),
            carry: VecDeque::new(),
            saw_streams: false,
        }
    }

    pub fn format(&self) -> &SampleFormat {
        self.aligner.format()
    }

    /// Number of registered streams.
    pub fn stream_count(&self) -> usize {
        self.aligner.stream_count()
    }

    /// Check a stream's announced format against the session format.
    pub fn declare_format(&self, announced: &SampleFormat) -> Result<(), MixError> {
        let session = self.aligner.format();
        if announced != session {
            return Err(MixError::FormatMismatch {
                expected: session.to_string(),
                actual: announced.to_string(),
            });
        }
        Ok(())
    }

    /// Register a stream whose audio begins `offset` after registration.
    pub fn add_stream(&mut self, offset: Duration) -> StreamKey {
        self.saw_streams = true;
        self.aligner.add_stream(offset)
    }

    /// Unregister a stream, discarding its backlog.
    pub fn remove_stream(&mut self, key: StreamKey) -> bool {
        self.aligner.remove_stream(key)
    }

    /// Append a frame-aligned payload to a stream.
    pub fn push(&mut self, key: StreamKey, payload: &[u8]) -> Result<(), MixError> {
        self.aligner.push(key, payload)
    }

    /// Mark that no further payloads will arrive for a stream.
    pub fn mark_ended(&mut self, key: StreamKey) -> Result<(), MixError> {
        self.aligner.mark_ended(key)
    }

    /// Bytes currently buffered for a stream.
    pub fn buffered(&self, key: StreamKey) -> Result<usize, MixError> {
        self.aligner.buffered(key)
    }

    /// Mix and emit up to `want_bytes` of audio, floored to whole frames.
    ///
    /// Serves from carried-over output first, then from what every
    /// still-running stream can supply. No stream is charged for the
    /// shortfall; `still_needed` reports how far each one is from covering
    /// the request.
    pub fn request(&mut self, want_bytes: usize) -> Result<MixRequest, MixError> {
        let format = *self.aligner.format();
        let want = format.align_down(want_bytes);
        let mut still_needed = Vec::new();
        if self.carry.len() < want {
            let demand = self.aligner.demand_chunk(want - self.carry.len());
            still_needed = demand.still_needed;
            if !demand.segments.is_empty() {
                let refs: Vec<&[u8]> = demand
                    .segments
                    .iter()
                    .map(|(_, segment)| segment.as_slice())
                    .collect();
                let mixed = self.adder.mix(&refs)?;
                self.carry.extend(mixed);
            }
            self.flush_if_drained()?;
        }
        let take = want.min(format.align_down(self.carry.len()));
        let payload: Vec<u8> = self.carry.drain(..take).collect();
        Ok(MixRequest {
            payload,
            still_needed,
        })
    }

    /// Mix the audio budget owed since the previous tick, per the injected
    /// clock.
    pub fn tick(&mut self) -> Result<TickMix, MixError> {
        let chunk = self.aligner.tick();
        self.mix_tick(chunk)
    }

    /// Mix the audio budget owed for the time elapsed up to `now`.
    ///
    /// Streams that cannot cover the budget are emitted short and charged,
    /// so their late bytes are dropped; `missing_samples` reports how far
    /// even the best-supplied stream fell short.
    pub fn tick_at(&mut self, now: Duration) -> Result<TickMix, MixError> {
        let chunk = self.aligner.tick_at(now);
        self.mix_tick(chunk)
    }

    fn mix_tick(&mut self, chunk: TickChunk) -> Result<TickMix, MixError> {
        if !chunk.segments.is_empty() {
            let refs: Vec<&[u8]> = chunk
                .segments
                .iter()
                .map(|(_, segment)| segment.as_slice())
                .collect();
            let mixed = self.adder.mix(&refs)?;
            self.carry.extend(mixed);
        }
        self.flush_if_drained()?;

        // Dangling samples of an unfinished frame wait in the carry, so the
        // payload is always whole frames.
        let take = self.aligner.format().align_down(self.carry.len());
        let payload: Vec<u8> = self.carry.drain(..take).collect();
        Ok(TickMix {
            payload,
            missing_samples: chunk.missing_samples,
        })
    }

    fn flush_if_drained(&mut self) -> Result<(), MixError> {
        if self.saw_streams && self.aligner.stream_count() == 0 {
            let tail = self.adder.flush()?;
            self.carry.extend(tail);
        }
        Ok(())
    }

    /// True once every stream has ended and drained and all output went out.
    pub fn is_finished(&self) -> bool {
        self.saw_streams
            && self.aligner.stream_count() == 0
            && self.carry.is_empty()
            && self.adder.pending_samples() == 0
    }
}
