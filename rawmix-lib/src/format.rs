//! PCM sample format descriptor and byte-level sample codecs.

use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::MixError;

/// Byte order of multi-byte samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Le,
    Be,
}

/// Descriptor for an integer PCM byte stream.
///
/// A sample occupies `sample_width` bytes (1 to 4) in the given byte order; a
/// frame is one sample per channel. All streams of a session share one
/// descriptor, fixed for the session's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleFormat {
    sample_width: u8,
    signed: bool,
    byte_order: ByteOrder,
    channels: u16,
    sample_rate: u32,
}

/// Wire shape of a serialized [`SampleFormat`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FormatSpec {
    encoding: String,
    channels: u16,
    #[serde(alias = "sample_rate")]
    rate: u32,
}

impl SampleFormat {
    /// Create a validated format descriptor.
    pub fn new(
        sample_width: u8,
        signed: bool,
        byte_order: ByteOrder,
        channels: u16,
        sample_rate: u32,
    ) -> Result<Self, MixError> {
        if !(1..=4).contains(&sample_width) {
            return Err(MixError::UnsupportedFormat(format!(
                "sample width must be 1 to 4 bytes, got {}",
                sample_width
            )));
        }
        if channels == 0 {
            return Err(MixError::UnsupportedFormat(
                "channel count cannot be zero".to_string(),
            ));
        }
        if sample_rate == 0 {
            return Err(MixError::UnsupportedFormat(
                "sample_rate cannot be zero".to_string(),
            ));
        }
        Ok(Self {
            sample_width,
            signed,
            byte_order,
            channels,
            sample_rate,
        })
    }

    /// Create a descriptor from an encoding token such as `s16le` or `u8`.
    pub fn from_encoding(token: &str, channels: u16, sample_rate: u32) -> Result<Self, MixError> {
        let (sample_width, signed, byte_order) = parse_encoding(token)?;
        Self::new(sample_width, signed, byte_order, channels, sample_rate)
    }

    pub fn sample_width(&self) -> u8 {
        self.sample_width
    }

    pub fn signed(&self) -> bool {
        self.signed
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Bytes per frame (one sample for every channel).
    pub fn frame_size(&self) -> usize {
        usize::from(self.sample_width) * usize::from(self.channels)
    }

    /// Smallest representable sample value.
    pub fn sample_min(&self) -> i64 {
        if self.signed {
            -(1_i64 << (u32::from(self.sample_width) * 8 - 1))
        } else {
            0
        }
    }

    /// Largest representable sample value.
    pub fn sample_max(&self) -> i64 {
        if self.signed {
            (1_i64 << (u32::from(self.sample_width) * 8 - 1)) - 1
        } else {
            (1_i64 << (u32::from(self.sample_width) * 8)) - 1
        }
    }

    /// Decode exactly one sample.
    ///
    /// The slice must be exactly one sample wide; negative values are
    /// sign-extended from the format's width.
    pub fn decode_sample(&self, bytes: &[u8]) -> Result<i64, MixError> {
        let width = usize::from(self.sample_width);
        if bytes.len() != width {
            return Err(MixError::InsufficientData {
                requested: width,
                available: bytes.len(),
            });
        }

        let mut magnitude = 0_u64;
        match self.byte_order {
            ByteOrder::Le => {
                for (i, byte) in bytes.iter().enumerate() {
                    magnitude |= u64::from(*byte) << (8 * i);
                }
            }
            ByteOrder::Be => {
                for byte in bytes {
                    magnitude = (magnitude << 8) | u64::from(*byte);
                }
            }
        }

        if self.signed {
            let shift = 64 - 8 * u32::from(self.sample_width);
            Ok(((magnitude << shift) as i64) >> shift)
        } else {
            Ok(magnitude as i64)
        }
    }

    /// Append one encoded sample, clamping `value` to the representable range.
    pub fn encode_sample_into(&self, value: i64, out: &mut Vec<u8>) {
        let clamped = value.clamp(self.sample_min(), self.sample_max());
        let magnitude = clamped as u64;
        let width = usize::from(self.sample_width);
        match self.byte_order {
            ByteOrder::Le => {
                for i in 0..width {
                    out.push((magnitude >> (8 * i)) as u8);
                }
            }
            ByteOrder::Be => {
                for i in (0..width).rev() {
                    out.push((magnitude >> (8 * i)) as u8);
                }
            }
        }
    }

    /// Encode one sample, clamping `value` to the representable range.
    pub fn encode_sample(&self, value: i64) -> Vec<u8> {
        let mut out = Vec::with_capacity(usize::from(self.sample_width));
        self.encode_sample_into(value, &mut out);
        out
    }

    /// Whole frames that fit in `duration`, truncating any partial frame.
    pub fn frames_in(&self, duration: Duration) -> u64 {
        (duration.as_nanos() * u128::from(self.sample_rate) / 1_000_000_000) as u64
    }

    /// Frame-aligned byte count covering `duration`.
    pub fn bytes_for(&self, duration: Duration) -> usize {
        self.frames_in(duration) as usize * self.frame_size()
    }

    /// Playing time of `byte_count` bytes, truncated to whole frames.
    pub fn duration_of(&self, byte_count: usize) -> Duration {
        let frames = (byte_count / self.frame_size()) as u128;
        Duration::from_nanos((frames * 1_000_000_000 / u128::from(self.sample_rate)) as u64)
    }

    /// Round `len` down to a whole number of frames.
    pub fn align_down(&self, len: usize) -> usize {
        len - len % self.frame_size()
    }

    /// Fail unless `len` is a whole number of frames.
    pub fn check_frame_aligned(&self, len: usize) -> Result<(), MixError> {
        let unit = self.frame_size();
        if len % unit != 0 {
            return Err(MixError::MisalignedPayload { len, unit });
        }
        Ok(())
    }

    /// Silence covering `duration`, truncated to whole frames.
    pub fn silence(&self, duration: Duration) -> Vec<u8> {
        self.silence_frames(self.frames_in(duration) as usize)
    }

    /// `frame_count` frames of encoded zero samples.
    pub fn silence_frames(&self, frame_count: usize) -> Vec<u8> {
        let mut frame = Vec::with_capacity(self.frame_size());
        for _ in 0..self.channels {
            self.encode_sample_into(0, &mut frame);
        }
        frame.repeat(frame_count)
    }

    /// Encoding token for this descriptor, such as `s16le` or `u8`.
    pub fn encoding_token(&self) -> String {
        let sign = if self.signed { 's' } else { 'u' };
        let bits = u32::from(self.sample_width) * 8;
        if self.sample_width == 1 {
            format!("{}{}", sign, bits)
        } else {
            let order = match self.byte_order {
                ByteOrder::Le => "le",
                ByteOrder::Be => "be",
            };
            format!("{}{}{}", sign, bits, order)
        }
    }
}

impl Default for SampleFormat {
    fn default() -> Self {
        Self {
            sample_width: 2,
            signed: true,
            byte_order: ByteOrder::Le,
            channels: 1,
            sample_rate: 48_000,
        }
    }
}

impl Display for SampleFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}ch/{}Hz",
            self.encoding_token(),
            self.channels,
            self.sample_rate
        )
    }
}

impl FromStr for SampleFormat {
    type Err = MixError;

    /// Parse a full descriptor string such as `s16le/2ch/48000Hz`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('/');
        let (Some(encoding), Some(channels), Some(rate), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(MixError::UnsupportedFormat(format!(
                "expected encoding/channels/rate, got {:?}",
                s
            )));
        };

        let channels_txt = channels.trim().to_ascii_lowercase();
        let channels_txt = channels_txt.strip_suffix("ch").unwrap_or(&channels_txt);
        let channels = channels_txt.parse::<u16>().map_err(|_| {
            MixError::UnsupportedFormat(format!("invalid channel count: {:?}", channels))
        })?;

        let rate_txt = rate.trim().to_ascii_lowercase();
        let rate_txt = rate_txt.strip_suffix("hz").unwrap_or(&rate_txt);
        let rate = rate_txt
            .parse::<u32>()
            .map_err(|_| MixError::UnsupportedFormat(format!("invalid sample rate: {:?}", rate)))?;

        Self::from_encoding(encoding.trim(), channels, rate)
    }
}

impl Serialize for SampleFormat {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        FormatSpec {
            encoding: self.encoding_token(),
            channels: self.channels,
            rate: self.sample_rate,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SampleFormat {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let spec = FormatSpec::deserialize(deserializer)?;
        Self::from_encoding(&spec.encoding, spec.channels, spec.rate)
            .map_err(serde::de::Error::custom)
    }
}

fn parse_encoding(token: &str) -> Result<(u8, bool, ByteOrder), MixError> {
    let unknown = || MixError::UnsupportedFormat(format!("unknown encoding token: {:?}", token));
    let lower = token.to_ascii_lowercase();

    let rest = lower.as_str();
    let (signed, rest) = match rest.as_bytes().first() {
        Some(b's') => (true, &rest[1..]),
        Some(b'u') => (false, &rest[1..]),
        _ => return Err(unknown()),
    };

    let (bits_txt, order) = if let Some(stripped) = rest.strip_suffix("le") {
        (stripped, Some(ByteOrder::Le))
    } else if let Some(stripped) = rest.strip_suffix("be") {
        (stripped, Some(ByteOrder::Be))
    } else {
        (rest, None)
    };

    let bits = bits_txt.parse::<u32>().map_err(|_| unknown())?;
    if bits == 0 || bits % 8 != 0 {
        return Err(unknown());
    }

    match (bits / 8, order) {
        // Single bytes carry no ordering, so the token takes no suffix.
        (1, None) => Ok((1, signed, ByteOrder::Le)),
        (width @ 2..=4, Some(order)) => Ok((width as u8, signed, order)),
        _ => Err(unknown()),
    }
}
