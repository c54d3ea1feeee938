//! Live mixing session with a fixed output cadence.

use std::time::Duration;

use log::warn;

use crate::adder::Adder;
use crate::config::MixerConfig;
use crate::error::MixError;
use crate::format::SampleFormat;
use crate::queue::{LiveQueue, StreamKey};

/// Live mixing session emitting one fixed-duration chunk per tick.
///
/// The host ticks at its own cadence and always owes the output a full
/// chunk, so missing audio is synthesized as silence and late audio is
/// dropped. Streams attach and detach freely between ticks. In
/// clip-preventing mode the adder may defer part of a chunk until its wave
/// completes; [`LiveAudioMixer::finish`] flushes the remainder and ends the
/// session.
#[derive(Debug)]
pub struct LiveAudioMixer {
    queue: LiveQueue,
    adder: Adder,
    chunk_duration: Duration,
    finished: bool,
}

impl LiveAudioMixer {
    pub fn new(config: &MixerConfig) -> Self {
        Self {
            queue: LiveQueue::new(config.format),
            adder: Adder::new(config.format, config.prevent_clipping),
            chunk_duration: config.chunk_duration(),
            finished: false,
        }
    }

    pub fn format(&self) -> &SampleFormat {
        self.queue.format()
    }

    pub fn chunk_duration(&self) -> Duration {
        self.chunk_duration
    }

    /// Number of attached streams.
    pub fn queue_count(&self) -> usize {
        self.queue.queue_count()
    }

    /// Mix time emitted so far.
    pub fn position(&self) -> Duration {
        self.queue.position()
    }

    /// Attach a stream whose audio begins `offset` after the attach point.
    pub fn add_queue(&mut self, offset: Duration) -> StreamKey {
        self.queue.add_queue(offset)
    }

    /// Detach a stream, discarding its backlog.
    pub fn remove_queue(&mut self, key: StreamKey) -> bool {
        self.queue.remove_queue(key)
    }

    /// Append a frame-aligned payload to a stream.
    pub fn push(&mut self, key: StreamKey, payload: &[u8]) -> Result<(), MixError> {
        self.queue.push(key, payload)
    }

    /// Mark that no further payloads will arrive for a stream.
    pub fn mark_ended(&mut self, key: StreamKey) -> Result<(), MixError> {
        self.queue.mark_ended(key)
    }

    /// Bytes currently buffered for a stream.
    pub fn buffered(&self, key: StreamKey) -> Result<usize, MixError> {
        self.queue.buffered(key)
    }

    /// Mix one chunk of output, synthesizing silence where audio is missing.
    pub fn tick(&mut self) -> Result<Vec<u8>, MixError> {
        if self.finished {
            warn!("tick on a finished live session emits nothing");
            return Ok(Vec::new());
        }
        let segments = self.queue.get_audio(self.chunk_duration);
        if segments.is_empty() {
            // Silence still flows through the adder, so an open wave keeps
            // its place in time instead of being flushed after it.
            let silence = self.queue.format().silence(self.chunk_duration);
            return self.adder.mix(&[&silence]);
        }
        let refs: Vec<&[u8]> = segments
            .iter()
            .map(|(_, segment)| segment.as_slice())
            .collect();
        self.adder.mix(&refs)
    }

    /// Flush whatever the adder still holds and end the session.
    ///
    /// Unplayed stream backlog is abandoned; only completed mix output
    /// comes back. Further ticks emit nothing.
    pub fn finish(&mut self) -> Result<Vec<u8>, MixError> {
        if self.finished {
            warn!("live session already finished");
            return Ok(Vec::new());
        }
        self.finished = true;
        self.adder.flush()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}
