//! Sample-summing mixers over decoded PCM chunks.

pub mod saturating;
pub mod wave;

pub use saturating::SaturatingAdder;
pub use wave::WaveScalingAdder;

use crate::error::MixError;
use crate::format::SampleFormat;

/// Configured mixing strategy for summed PCM chunks.
#[derive(Debug, Clone)]
pub enum Adder {
    Saturating(SaturatingAdder),
    WaveScaling(WaveScalingAdder),
}

impl Adder {
    /// Select a strategy: clamping by default, whole-wave rescaling when clip
    /// prevention is requested.
    pub fn new(format: SampleFormat, prevent_clipping: bool) -> Self {
        if prevent_clipping {
            Adder::WaveScaling(WaveScalingAdder::new(format))
        } else {
            Adder::Saturating(SaturatingAdder::new(format))
        }
    }

    /// Sum the chunks sample-by-sample and encode the result.
    pub fn mix(&mut self, chunks: &[&[u8]]) -> Result<Vec<u8>, MixError> {
        match self {
            Adder::Saturating(adder) => adder.mix(chunks),
            Adder::WaveScaling(adder) => adder.mix(chunks),
        }
    }

    /// Emit whatever the strategy still buffers; called once at end of mix.
    pub fn flush(&mut self) -> Result<Vec<u8>, MixError> {
        match self {
            Adder::Saturating(adder) => adder.flush(),
            Adder::WaveScaling(adder) => adder.flush(),
        }
    }

    /// Samples withheld from output so far.
    pub fn pending_samples(&self) -> usize {
        match self {
            Adder::Saturating(_) => 0,
            Adder::WaveScaling(adder) => adder.pending_samples(),
        }
    }
}

/// Decode every chunk and sum the values position-by-position.
///
/// Chunks may have ragged lengths; positions past a chunk's end contribute
/// zero, which is how a stream that ended early keeps flowing through the
/// mix. Each chunk must still hold a whole number of samples.
pub(crate) fn sum_chunks(format: &SampleFormat, chunks: &[&[u8]]) -> Result<Vec<i64>, MixError> {
    let width = usize::from(format.sample_width());
    let mut longest = 0;
    for chunk in chunks {
        if chunk.len() % width != 0 {
            return Err(MixError::MisalignedPayload {
                len: chunk.len(),
                unit: width,
            });
        }
        longest = longest.max(chunk.len());
    }

    let mut sums = vec![0_i64; longest / width];
    for chunk in chunks {
        for (i, sample) in chunk.chunks_exact(width).enumerate() {
            sums[i] += format.decode_sample(sample)?;
        }
    }
    Ok(sums)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mono(token: &str) -> SampleFormat {
        SampleFormat::from_encoding(token, 1, 1000).expect("format")
    }

    #[test]
    fn prevent_clipping_selects_the_wave_strategy() {
        assert!(matches!(
            Adder::new(mono("s16le"), false),
            Adder::Saturating(_)
        ));
        assert!(matches!(
            Adder::new(mono("s16le"), true),
            Adder::WaveScaling(_)
        ));
    }

    #[test]
    fn sum_chunks_treats_short_chunks_as_silence() {
        let format = mono("u8");
        let sums = sum_chunks(&format, &[&[1, 2, 3], &[5]]).expect("sum");
        assert_eq!(sums, vec![6, 2, 3]);
    }

    #[test]
    fn sum_chunks_rejects_partial_samples() {
        let format = mono("s16le");
        assert_eq!(
            sum_chunks(&format, &[&[1, 2, 3]]),
            Err(MixError::MisalignedPayload { len: 3, unit: 2 })
        );
    }

    #[test]
    fn dispatch_reaches_both_strategies() {
        let mut clamping = Adder::new(mono("u8"), false);
        assert_eq!(clamping.mix(&[&[200], &[100]]).unwrap(), vec![255]);
        assert_eq!(clamping.pending_samples(), 0);

        let mut scaling = Adder::new(mono("u8"), true);
        assert!(scaling.mix(&[&[200], &[100]]).unwrap().is_empty());
        assert_eq!(scaling.pending_samples(), 1);
        assert_eq!(scaling.flush().unwrap(), vec![255]);
    }
}
