//! Clip-preventing adder that rescales whole waves.

use crate::adder::sum_chunks;
use crate::error::MixError;
use crate::format::SampleFormat;

/// Mixer that spreads overflow across a whole wave instead of clipping it.
///
/// A wave is a maximal run of same-signed sums; zero extends whichever run is
/// open. When a completed wave's extreme value overflows the format, every
/// value in the wave is rescaled by `bound / extreme` in exact integer
/// arithmetic (truncating toward zero), so the extreme lands exactly on the
/// bound and the rest keep their relative place. The run still open stays
/// buffered until a sign change or a flush closes it.
///
/// Unsigned formats decode to non-negative values, so their sums form a
/// single wave that only a flush closes.
#[derive(Debug, Clone)]
pub struct WaveScalingAdder {
    format: SampleFormat,
    positive: bool,
    pending: Vec<i64>,
}

impl WaveScalingAdder {
    pub fn new(format: SampleFormat) -> Self {
        Self {
            format,
            positive: true,
            pending: Vec::new(),
        }
    }

    /// Samples buffered toward the wave still in progress.
    pub fn pending_samples(&self) -> usize {
        self.pending.len()
    }

    /// Sum the chunks and emit every wave the new samples complete.
    pub fn mix(&mut self, chunks: &[&[u8]]) -> Result<Vec<u8>, MixError> {
        let sums = sum_chunks(&self.format, chunks)?;
        let mut out = Vec::new();
        self.consume(&sums, false, &mut out);
        Ok(out)
    }

    /// Close and emit the wave in progress.
    pub fn flush(&mut self) -> Result<Vec<u8>, MixError> {
        let mut out = Vec::new();
        self.consume(&[], true, &mut out);
        Ok(out)
    }

    fn consume(&mut self, sums: &[i64], flush: bool, out: &mut Vec<u8>) {
        let mut rest = sums;
        loop {
            let positive = self.positive;
            let split = rest
                .iter()
                .position(|value| if positive { *value < 0 } else { *value > 0 })
                .unwrap_or(rest.len());
            self.pending.extend_from_slice(&rest[..split]);
            if split == rest.len() {
                break;
            }
            self.emit_wave(out);
            self.positive = !self.positive;
            rest = &rest[split..];
        }
        if flush {
            self.emit_wave(out);
        }
    }

    fn emit_wave(&mut self, out: &mut Vec<u8>) {
        if self.pending.is_empty() {
            return;
        }
        let mut low = i64::MAX;
        let mut high = i64::MIN;
        for value in &self.pending {
            low = low.min(*value);
            high = high.max(*value);
        }

        // A wave is same-signed, so at most one bound can overflow.
        let fmt_min = self.format.sample_min();
        let fmt_max = self.format.sample_max();
        if low < fmt_min {
            for value in &self.pending {
                let scaled = (i128::from(*value) * i128::from(fmt_min) / i128::from(low)) as i64;
                self.format.encode_sample_into(scaled, out);
            }
        } else if high > fmt_max {
            for value in &self.pending {
                let scaled = (i128::from(*value) * i128::from(fmt_max) / i128::from(high)) as i64;
                self.format.encode_sample_into(scaled, out);
            }
        } else {
            for value in &self.pending {
                self.format.encode_sample_into(*value, out);
            }
        }
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mono(token: &str) -> SampleFormat {
        SampleFormat::from_encoding(token, 1, 1000).expect("format")
    }

    fn chunk(format: &SampleFormat, values: &[i64]) -> Vec<u8> {
        let mut out = Vec::new();
        for value in values {
            format.encode_sample_into(*value, &mut out);
        }
        out
    }

    fn decode_all(format: &SampleFormat, bytes: &[u8]) -> Vec<i64> {
        bytes
            .chunks_exact(usize::from(format.sample_width()))
            .map(|sample| format.decode_sample(sample).expect("decode"))
            .collect()
    }

    #[test]
    fn buffers_same_sign_run_until_flush() {
        let format = mono("s8");
        let mut adder = WaveScalingAdder::new(format);
        let input = chunk(&format, &[10, 20]);
        assert!(adder.mix(&[&input]).unwrap().is_empty());
        assert_eq!(adder.pending_samples(), 2);
        assert_eq!(adder.flush().unwrap(), chunk(&format, &[10, 20]));
        assert_eq!(adder.pending_samples(), 0);
    }

    #[test]
    fn sign_change_emits_the_completed_wave() {
        let format = mono("s8");
        let mut adder = WaveScalingAdder::new(format);
        let input = chunk(&format, &[10, 20, -5]);
        assert_eq!(adder.mix(&[&input]).unwrap(), chunk(&format, &[10, 20]));
        assert_eq!(adder.pending_samples(), 1);
        assert_eq!(adder.flush().unwrap(), chunk(&format, &[-5]));
    }

    #[test]
    fn alternating_signs_emit_sample_by_sample() {
        let format = mono("s8");
        let mut adder = WaveScalingAdder::new(format);
        let input = chunk(&format, &[1, -1, 2, -2]);
        assert_eq!(adder.mix(&[&input]).unwrap(), chunk(&format, &[1, -1, 2]));
        assert_eq!(adder.flush().unwrap(), chunk(&format, &[-2]));
    }

    #[test]
    fn scales_positive_wave_exactly_to_format_max() {
        let format = mono("s8");
        let mut adder = WaveScalingAdder::new(format);
        let a = chunk(&format, &[100, 27]);
        let b = chunk(&format, &[100, 100]);
        // Sums are [200, 127]; 200 maps exactly to 127, 127 maps to 80.
        assert!(adder.mix(&[&a, &b]).unwrap().is_empty());
        assert_eq!(adder.flush().unwrap(), chunk(&format, &[127, 80]));
    }

    #[test]
    fn scales_negative_wave_exactly_to_format_min() {
        let format = mono("s8");
        let mut adder = WaveScalingAdder::new(format);
        let a = chunk(&format, &[-100, -50]);
        let b = chunk(&format, &[-100, -50]);
        // Sums are [-200, -100]; -200 maps exactly to -128, -100 maps to -64.
        assert!(adder.mix(&[&a, &b]).unwrap().is_empty());
        assert_eq!(adder.flush().unwrap(), chunk(&format, &[-128, -64]));
    }

    #[test]
    fn scaling_truncates_toward_zero() {
        let format = mono("s8");
        let mut adder = WaveScalingAdder::new(format);
        let a = chunk(&format, &[3, 100]);
        let b = chunk(&format, &[0, 100]);
        adder.mix(&[&a, &b]).unwrap();
        // 3 * 127 / 200 is 1.905, which truncates to 1.
        assert_eq!(adder.flush().unwrap(), chunk(&format, &[1, 127]));
    }

    #[test]
    fn zero_extends_whichever_run_is_open() {
        let format = mono("s8");
        let mut adder = WaveScalingAdder::new(format);
        let input = chunk(&format, &[5, 0, -5]);
        assert_eq!(adder.mix(&[&input]).unwrap(), chunk(&format, &[5, 0]));

        let mut adder = WaveScalingAdder::new(format);
        let input = chunk(&format, &[-5, 0, 5]);
        assert_eq!(adder.mix(&[&input]).unwrap(), chunk(&format, &[-5, 0]));
        assert_eq!(adder.pending_samples(), 1);
    }

    #[test]
    fn unsigned_sums_form_one_wave_scaled_against_max() {
        let format = mono("u8");
        let mut adder = WaveScalingAdder::new(format);
        assert!(adder.mix(&[&[200, 100], &[100, 50]]).unwrap().is_empty());
        // Sums are [300, 150]; 300 maps exactly to 255, 150 maps to 127.
        assert_eq!(adder.flush().unwrap(), vec![255, 127]);
    }

    #[test]
    fn scaling_preserves_relative_order() {
        let format = mono("s16le");
        let mut adder = WaveScalingAdder::new(format);
        let a = chunk(&format, &[1, 25_000, 32_000, 9_000]);
        let b = chunk(&format, &[0, 25_000, 32_000, 9_000]);
        adder.mix(&[&a, &b]).unwrap();
        let scaled = decode_all(&format, &adder.flush().unwrap());
        assert_eq!(scaled[2], 32_767);
        assert!(scaled[0] <= scaled[3]);
        assert!(scaled[3] <= scaled[1]);
        assert!(scaled[1] <= scaled[2]);
        // Nothing grows past its unscaled magnitude.
        for (scaled, original) in scaled.iter().zip([1_i64, 50_000, 64_000, 18_000]) {
            assert!(scaled.abs() <= original.abs());
        }
    }

    #[test]
    fn long_alternating_batches_mix_in_one_call() {
        let format = mono("s8");
        let mut adder = WaveScalingAdder::new(format);
        let values: Vec<i64> = (0..200_000).map(|i| if i % 2 == 0 { 1 } else { -1 }).collect();
        let input = chunk(&format, &values);

        // Every sign change closes a one-sample wave; only the last stays open.
        let out = adder.mix(&[&input]).unwrap();
        assert_eq!(out, &input[..input.len() - 1]);
        assert_eq!(adder.pending_samples(), 1);
        assert_eq!(adder.flush().unwrap(), chunk(&format, &[-1]));
    }

    #[test]
    fn reusable_after_flush() {
        let format = mono("s8");
        let mut adder = WaveScalingAdder::new(format);
        let input = chunk(&format, &[5]);
        adder.mix(&[&input]).unwrap();
        assert_eq!(adder.flush().unwrap(), chunk(&format, &[5]));

        let input = chunk(&format, &[-3]);
        adder.mix(&[&input]).unwrap();
        assert_eq!(adder.flush().unwrap(), chunk(&format, &[-3]));
    }
}
