//! Tick-driven alignment of registered PCM streams into common chunks.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::MixError;
use crate::format::SampleFormat;
use crate::queue::{StreamArena, StreamKey, StreamQueue};

/// One tick's worth of aligned stream segments.
#[derive(Debug, Clone, Default)]
pub struct TickChunk {
    /// Byte length every stream was asked for this tick.
    pub chunk_bytes: usize,
    /// Extracted segment per stream, in registration slot order. Segments
    /// may be shorter than `chunk_bytes` when a stream ran dry.
    pub segments: Vec<(StreamKey, Vec<u8>)>,
    /// Whole-sample shortfall of the longest segment; zero when no streams
    /// are registered.
    pub missing_samples: usize,
}

/// One demand's worth of uniform stream segments.
#[derive(Debug, Clone, Default)]
pub struct DemandChunk {
    /// Byte length of every returned segment.
    pub emit_bytes: usize,
    /// Extracted segment per stream, in registration slot order. Ended
    /// streams are padded with silence to `emit_bytes`.
    pub segments: Vec<(StreamKey, Vec<u8>)>,
    /// Bytes each still-running stream was short of serving the full
    /// request, measured before extraction.
    pub still_needed: Vec<(StreamKey, usize)>,
}

/// Clock-driven chunker that keeps registered streams in lockstep.
///
/// The tick entry converts elapsed wall time into a per-stream byte budget
/// and favors recency: a stream that cannot fill its budget is emitted short
/// and charged the shortfall, so bytes arriving late for already-emitted
/// time are dropped. The demand entry serves explicit byte requests from the
/// common availability instead and never charges anyone.
pub struct Aligner {
    format: SampleFormat,
    streams: StreamArena<StreamQueue>,
    previous_tick: Duration,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl std::fmt::Debug for Aligner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aligner")
            .field("format", &self.format)
            .field("streams", &self.streams)
            .field("previous_tick", &self.previous_tick)
            .finish()
    }
}

impl Aligner {
    pub fn new(format: SampleFormat) -> Self {
        Self::with_clock(format, Arc::new(SystemClock::new()))
    }

    /// Create an aligner driven by the given clock.
    pub fn with_clock(format: SampleFormat, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        let previous_tick = clock.now();
        Self {
            format,
            streams: StreamArena::new(),
            previous_tick,
            clock,
        }
    }

    pub fn format(&self) -> &SampleFormat {
        &self.format
    }

    /// Number of registered streams.
    pub fn stream_count(&self) -> usize {
        self.streams.len()
    }

    /// Register a stream whose audio begins `offset` after registration.
    pub fn add_stream(&mut self, offset: Duration) -> StreamKey {
        let mut queue = StreamQueue::new();
        let lead_in = self.format.silence(offset);
        queue.push(&lead_in);
        let key = self.streams.insert(queue);
        debug!(
            "stream {:?} registered with {} bytes of lead-in silence",
            key,
            lead_in.len()
        );
        key
    }

    /// Unregister a stream, discarding any unconsumed backlog.
    pub fn remove_stream(&mut self, key: StreamKey) -> bool {
        match self.streams.remove(key) {
            Some(queue) => {
                debug!(
                    "stream {:?} removed with {} bytes unconsumed",
                    key,
                    queue.len()
                );
                true
            }
            None => false,
        }
    }

    /// Append a frame-aligned payload to the stream behind `key`.
    pub fn push(&mut self, key: StreamKey, payload: &[u8]) -> Result<(), MixError> {
        self.format.check_frame_aligned(payload.len())?;
        let queue = self.streams.get_mut(key).ok_or(MixError::UnknownStream)?;
        if queue.is_ended() {
            warn!(
                "dropping {} bytes pushed after end of stream {:?}",
                payload.len(),
                key
            );
            return Ok(());
        }
        queue.push(payload);
        Ok(())
    }

    /// Mark that no further payloads will arrive for `key`.
    pub fn mark_ended(&mut self, key: StreamKey) -> Result<(), MixError> {
        let queue = self.streams.get_mut(key).ok_or(MixError::UnknownStream)?;
        queue.mark_ended();
        Ok(())
    }

    pub fn is_ended(&self, key: StreamKey) -> Result<bool, MixError> {
        let queue = self.streams.get(key).ok_or(MixError::UnknownStream)?;
        Ok(queue.is_ended())
    }

    /// Bytes currently buffered for `key`.
    pub fn buffered(&self, key: StreamKey) -> Result<usize, MixError> {
        let queue = self.streams.get(key).ok_or(MixError::UnknownStream)?;
        Ok(queue.len())
    }

    /// Chunk every stream against the injected clock.
    pub fn tick(&mut self) -> TickChunk {
        let now = self.clock.now();
        self.tick_at(now)
    }

    /// Chunk every stream for the time elapsed up to `now`.
    ///
    /// The per-stream budget is the whole milliseconds since the previous
    /// tick converted to whole frames. Sub-millisecond remainders carry over
    /// to the next tick; a `now` before the previous tick is ignored.
    pub fn tick_at(&mut self, now: Duration) -> TickChunk {
        if now < self.previous_tick {
            warn!(
                "tick time moved backwards ({:?} < {:?}), emitting nothing",
                now, self.previous_tick
            );
            return TickChunk::default();
        }
        let elapsed_ms = (now - self.previous_tick).as_millis();
        let frames = elapsed_ms * u128::from(self.format.sample_rate()) / 1000;
        let chunk_bytes = frames as usize * self.format.frame_size();
        self.previous_tick += Duration::from_millis(elapsed_ms as u64);
        self.extract_chunk(chunk_bytes)
    }

    fn extract_chunk(&mut self, chunk_bytes: usize) -> TickChunk {
        self.prune_finished();
        if chunk_bytes == 0 || self.streams.is_empty() {
            return TickChunk {
                chunk_bytes,
                segments: Vec::new(),
                missing_samples: 0,
            };
        }

        let mut segments = Vec::with_capacity(self.streams.len());
        let mut longest = 0;
        for (key, queue) in self.streams.iter_mut() {
            let segment = queue.take_up_to(chunk_bytes);
            if segment.len() < chunk_bytes && !queue.is_ended() {
                queue.add_to_drop(chunk_bytes - segment.len());
            }
            longest = longest.max(segment.len());
            segments.push((key, segment));
        }
        self.prune_finished();

        let missing_samples = (chunk_bytes - longest) / usize::from(self.format.sample_width());
        TickChunk {
            chunk_bytes,
            segments,
            missing_samples,
        }
    }

    /// Serve up to `want_bytes` per stream from the common availability.
    ///
    /// The request is floored to whole frames. The emitted length is the
    /// least aligned backlog among still-running streams (the longest
    /// remaining tail once every stream has ended); ended streams are padded
    /// with silence to that length. No stream is charged for a shortfall.
    pub fn demand_chunk(&mut self, want_bytes: usize) -> DemandChunk {
        self.prune_finished();
        let want = self.format.align_down(want_bytes);

        let mut live_min: Option<usize> = None;
        let mut ended_max = 0;
        let mut still_needed = Vec::new();
        for (key, queue) in self.streams.iter() {
            if queue.is_ended() {
                ended_max = ended_max.max(queue.len());
            } else {
                let available = queue.len();
                live_min = Some(live_min.map_or(available, |least: usize| least.min(available)));
                if available < want {
                    still_needed.push((key, want - available));
                }
            }
        }
        let emit = live_min.unwrap_or(ended_max).min(want);

        let mut segments = Vec::new();
        if emit > 0 {
            segments.reserve(self.streams.len());
            for (key, queue) in self.streams.iter_mut() {
                let mut segment = queue.take_up_to(emit);
                if segment.len() < emit {
                    segment.resize(emit, 0);
                }
                segments.push((key, segment));
            }
        }
        self.prune_finished();

        DemandChunk {
            emit_bytes: emit,
            segments,
            still_needed,
        }
    }

    fn prune_finished(&mut self) {
        self.streams.retain(|key, queue| {
            if queue.is_finished() {
                debug!("stream {:?} finished and left the mix", key);
                return false;
            }
            true
        });
    }
}
