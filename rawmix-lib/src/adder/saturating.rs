//! Clamping adder: summed samples are pinned to the format's range.

use crate::adder::sum_chunks;
use crate::error::MixError;
use crate::format::SampleFormat;

/// Stateless mixer that clamps each summed sample to the format bounds.
#[derive(Debug, Clone)]
pub struct SaturatingAdder {
    format: SampleFormat,
}

impl SaturatingAdder {
    pub fn new(format: SampleFormat) -> Self {
        Self { format }
    }

    /// Sum the chunks and clamp every sample into range.
    pub fn mix(&mut self, chunks: &[&[u8]]) -> Result<Vec<u8>, MixError> {
        let sums = sum_chunks(&self.format, chunks)?;
        let mut out = Vec::with_capacity(sums.len() * usize::from(self.format.sample_width()));
        for sum in sums {
            self.format.encode_sample_into(sum, &mut out);
        }
        Ok(out)
    }

    /// Nothing is ever buffered, so a flush is empty.
    pub fn flush(&mut self) -> Result<Vec<u8>, MixError> {
        Ok(Vec::new())
    }
}
