//! Interleaving of per-channel sample planes into multi-channel frames.

use log::warn;

use crate::error::MixError;
use crate::format::SampleFormat;
use crate::queue::{StreamArena, StreamKey, StreamQueue};

/// Interleave equal-length channel planes sample by sample.
///
/// Plane order is channel order in the output. Every plane must hold the
/// same whole number of samples of `sample_width` bytes.
pub fn interleave_segments(planes: &[&[u8]], sample_width: usize) -> Result<Vec<u8>, MixError> {
    if sample_width == 0 {
        return Err(MixError::UnsupportedFormat(
            "sample width cannot be zero".to_string(),
        ));
    }
    let Some(first) = planes.first() else {
        return Ok(Vec::new());
    };
    let mut shortest = first.len();
    let mut longest = first.len();
    for plane in planes {
        if plane.len() % sample_width != 0 {
            return Err(MixError::MisalignedPayload {
                len: plane.len(),
                unit: sample_width,
            });
        }
        shortest = shortest.min(plane.len());
        longest = longest.max(plane.len());
    }
    if shortest != longest {
        return Err(MixError::InsufficientData {
            requested: longest,
            available: shortest,
        });
    }

    let mut out = Vec::with_capacity(first.len() * planes.len());
    for sample in 0..first.len() / sample_width {
        let at = sample * sample_width;
        for plane in planes {
            out.extend_from_slice(&plane[at..at + sample_width]);
        }
    }
    Ok(out)
}

/// Split interleaved frames back into one plane per channel.
pub fn deinterleave(
    data: &[u8],
    channels: usize,
    sample_width: usize,
) -> Result<Vec<Vec<u8>>, MixError> {
    if channels == 0 {
        return Err(MixError::UnsupportedFormat(
            "channel count cannot be zero".to_string(),
        ));
    }
    if sample_width == 0 {
        return Err(MixError::UnsupportedFormat(
            "sample width cannot be zero".to_string(),
        ));
    }
    let stride = channels * sample_width;
    if data.len() % stride != 0 {
        return Err(MixError::MisalignedPayload {
            len: data.len(),
            unit: stride,
        });
    }

    let mut planes = vec![Vec::with_capacity(data.len() / channels); channels];
    for frame in data.chunks_exact(stride) {
        for (channel, sample) in frame.chunks_exact(sample_width).enumerate() {
            planes[channel].extend_from_slice(sample);
        }
    }
    Ok(planes)
}

/// Incremental interleaver fed one mono plane per output channel.
///
/// Channels are registered up to the session format's channel count and
/// emitted in registration order unless reordered. A pull emits whole
/// frames covering the samples every still-running channel can serve, so
/// output pauses while the slowest channel is empty and resumes when it
/// catches up. Ended channels are padded with silence.
#[derive(Debug)]
pub struct Interleaver {
    format: SampleFormat,
    channels: StreamArena<StreamQueue>,
    order: Vec<StreamKey>,
}

impl Interleaver {
    pub fn new(format: SampleFormat) -> Self {
        Self {
            format,
            channels: StreamArena::new(),
            order: Vec::new(),
        }
    }

    pub fn format(&self) -> &SampleFormat {
        &self.format
    }

    /// Registered channels, in output order.
    pub fn channel_order(&self) -> &[StreamKey] {
        &self.order
    }

    /// Register the next output channel.
    pub fn add_channel(&mut self) -> Result<StreamKey, MixError> {
        if self.order.len() == usize::from(self.format.channels()) {
            return Err(MixError::UnsupportedFormat(format!(
                "all {} channels are already registered",
                self.format.channels()
            )));
        }
        let key = self.channels.insert(StreamQueue::new());
        self.order.push(key);
        Ok(key)
    }

    /// Append a sample-aligned mono payload to one channel.
    pub fn push(&mut self, key: StreamKey, payload: &[u8]) -> Result<(), MixError> {
        let width = usize::from(self.format.sample_width());
        if payload.len() % width != 0 {
            return Err(MixError::MisalignedPayload {
                len: payload.len(),
                unit: width,
            });
        }
        let queue = self.channels.get_mut(key).ok_or(MixError::UnknownStream)?;
        if queue.is_ended() {
            warn!(
                "dropping {} bytes pushed after end of channel {:?}",
                payload.len(),
                key
            );
            return Ok(());
        }
        queue.push(payload);
        Ok(())
    }

    /// Mark that no further payloads will arrive for one channel.
    pub fn mark_ended(&mut self, key: StreamKey) -> Result<(), MixError> {
        let queue = self.channels.get_mut(key).ok_or(MixError::UnknownStream)?;
        queue.mark_ended();
        Ok(())
    }

    /// Bytes currently buffered for one channel.
    pub fn buffered(&self, key: StreamKey) -> Result<usize, MixError> {
        let queue = self.channels.get(key).ok_or(MixError::UnknownStream)?;
        Ok(queue.len())
    }

    /// Replace the output order with a permutation of the registered keys.
    pub fn set_channel_order(&mut self, order: &[StreamKey]) -> Result<(), MixError> {
        if order.len() != self.order.len() {
            return Err(MixError::UnsupportedFormat(format!(
                "channel order names {} channels, {} are registered",
                order.len(),
                self.order.len()
            )));
        }
        for (position, key) in order.iter().enumerate() {
            if !self.channels.contains(*key) {
                return Err(MixError::UnknownStream);
            }
            if order[..position].contains(key) {
                return Err(MixError::UnsupportedFormat(format!(
                    "channel {:?} appears twice in the channel order",
                    key
                )));
            }
        }
        self.order.clear();
        self.order.extend_from_slice(order);
        Ok(())
    }

    /// Emit interleaved frames covering what every channel can serve.
    ///
    /// `demand` caps the bytes taken per channel; it is floored to whole
    /// samples. Returns an empty payload while any still-running channel
    /// has nothing buffered.
    pub fn pull(&mut self, demand: Option<usize>) -> Result<Vec<u8>, MixError> {
        if self.order.len() != usize::from(self.format.channels()) {
            return Err(MixError::FormatMismatch {
                expected: self.format.to_string(),
                actual: format!("{} registered channels", self.order.len()),
            });
        }
        let width = usize::from(self.format.sample_width());
        let want = demand.map(|bytes| bytes - bytes % width);

        let mut live_min: Option<usize> = None;
        let mut ended_max = 0;
        for (_, queue) in self.channels.iter() {
            if queue.is_ended() {
                ended_max = ended_max.max(queue.len());
            } else {
                let available = queue.len();
                live_min = Some(live_min.map_or(available, |least: usize| least.min(available)));
            }
        }
        let mut emit = live_min.unwrap_or(ended_max);
        if let Some(want) = want {
            emit = emit.min(want);
        }
        if emit == 0 {
            return Ok(Vec::new());
        }

        let mut planes = Vec::with_capacity(self.order.len());
        for key in &self.order {
            let queue = self.channels.get_mut(*key).ok_or(MixError::UnknownStream)?;
            let mut plane = queue.take_up_to(emit);
            if plane.len() < emit {
                plane.resize(emit, 0);
            }
            planes.push(plane);
        }
        let refs: Vec<&[u8]> = planes.iter().map(|plane| plane.as_slice()).collect();
        interleave_segments(&refs, width)
    }

    /// True once every registered channel has ended and been drained.
    pub fn is_finished(&self) -> bool {
        !self.order.is_empty()
            && self
                .channels
                .iter()
                .all(|(_, queue)| queue.is_finished())
    }
}
