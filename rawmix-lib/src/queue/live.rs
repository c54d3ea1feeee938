//! Dynamic stream set that always serves full-duration audio.

use std::time::Duration;

use log::{debug, warn};

use crate::error::MixError;
use crate::format::SampleFormat;
use crate::queue::arena::{StreamArena, StreamKey};
use crate::queue::stream::StreamQueue;

/// Stream set for live mixing with an advancing output cursor.
///
/// Streams may be attached and detached at any point. Every call to
/// [`LiveQueue::get_audio`] yields exactly the requested span for every
/// attached stream, synthesizing silence where real bytes are missing. Time
/// emitted as silence for a still-running stream is charged to that stream,
/// so bytes arriving late for it are discarded instead of replayed behind the
/// cursor.
#[derive(Debug)]
pub struct LiveQueue {
    format: SampleFormat,
    streams: StreamArena<StreamQueue>,
    cursor_frames: u64,
}

impl LiveQueue {
    pub fn new(format: SampleFormat) -> Self {
        Self {
            format,
            streams: StreamArena::new(),
            cursor_frames: 0,
        }
    }

    pub fn format(&self) -> &SampleFormat {
        &self.format
    }

    /// Number of attached streams.
    pub fn queue_count(&self) -> usize {
        self.streams.len()
    }

    /// Mix time consumed so far.
    pub fn position(&self) -> Duration {
        self.format
            .duration_of(self.cursor_frames as usize * self.format.frame_size())
    }

    /// Attach a stream whose audio begins `offset` after the attach point.
    pub fn add_queue(&mut self, offset: Duration) -> StreamKey {
        let mut queue = StreamQueue::new();
        let lead_in = self.format.silence(offset);
        queue.push(&lead_in);
        let key = self.streams.insert(queue);
        debug!(
            "live queue {:?} attached with {} bytes of lead-in silence",
            key,
            lead_in.len()
        );
        key
    }

    /// Detach a stream, discarding any unplayed backlog.
    pub fn remove_queue(&mut self, key: StreamKey) -> bool {
        match self.streams.remove(key) {
            Some(queue) => {
                debug!(
                    "live queue {:?} detached with {} bytes unplayed",
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

    /// Take exactly `duration` of audio from every attached stream.
    ///
    /// Real bytes come first, then silence for any shortfall. A shortfall on
    /// a stream that has not ended is charged to that stream, so its late
    /// bytes are dropped on the next push. Ended streams pad without charge
    /// and detach once drained.
    pub fn get_audio(&mut self, duration: Duration) -> Vec<(StreamKey, Vec<u8>)> {
        let frames = self.format.frames_in(duration);
        let want = frames as usize * self.format.frame_size();
        let mut out = Vec::with_capacity(self.streams.len());
        for (key, queue) in self.streams.iter_mut() {
            let mut segment = queue.take_up_to(want);
            let shortfall = want - segment.len();
            if shortfall > 0 {
                segment.resize(want, 0);
                if !queue.is_ended() {
                    queue.add_to_drop(shortfall);
                }
            }
            out.push((key, segment));
        }
        self.streams.retain(|_, queue| !queue.is_finished());
        self.cursor_frames += frames;
        out
    }
}
