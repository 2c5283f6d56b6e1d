use std::io::Cursor;

use super::decode::SampleBuffer;
use super::error::{AudioError, Result};

/// Size of the canonical WAV header in bytes.
pub const WAV_HEADER_LEN: usize = 44;

/// A sealed, immutable WAV byte sequence: 44-byte header followed by 16-bit
/// signed little-endian mono PCM. This is the one byte-exact compatibility
/// surface of the pipeline; downstream consumers parse the header directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WavContainer(Vec<u8>);

impl WavContainer {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Encodes float sample buffers into canonical mono 16-bit PCM WAV containers.
///
/// Pure and side-effect free: the same input always produces byte-identical
/// output. Either the whole container is produced or an error is returned;
/// there is no partially-written state.
pub struct PcmEncoder {
    sample_rate: u32,
}

impl PcmEncoder {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }

    /// Encode at the buffer's own sample rate.
    pub fn encode(samples: &SampleBuffer) -> Result<WavContainer> {
        Self::new(samples.sample_rate).encode_samples(&samples.samples)
    }

    pub fn encode_samples(&self, samples: &[f32]) -> Result<WavContainer> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::with_capacity(WAV_HEADER_LEN + samples.len() * 2));
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)
                .map_err(|e| AudioError::EncodeFailed(e.to_string()))?;
            for &sample in samples {
                writer
                    .write_sample(sample_to_i16(sample))
                    .map_err(|e| AudioError::EncodeFailed(e.to_string()))?;
            }
            writer
                .finalize()
                .map_err(|e| AudioError::EncodeFailed(e.to_string()))?;
        }

        Ok(WavContainer(cursor.into_inner()))
    }
}

/// Convert one float sample to signed 16-bit PCM.
///
/// Clamps to [-1.0, 1.0], then scales negatives by 32768 and non-negatives by
/// 32767 before truncating. The asymmetry reflects the signed 16-bit range
/// [-32768, 32767] and must be preserved exactly: downstream consumers depend
/// on the resulting byte values.
pub(crate) fn sample_to_i16(sample: f32) -> i16 {
    let clamped = sample.clamp(-1.0, 1.0);
    if clamped < 0.0 {
        (clamped * 32768.0) as i16
    } else {
        (clamped * 32767.0) as i16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaling_is_asymmetric_at_full_deflection() {
        assert_eq!(sample_to_i16(1.0), 32767);
        assert_eq!(sample_to_i16(-1.0), -32768);
        assert_eq!(sample_to_i16(0.0), 0);
    }

    #[test]
    fn out_of_range_samples_clamp_to_full_deflection() {
        assert_eq!(sample_to_i16(1.5), sample_to_i16(1.0));
        assert_eq!(sample_to_i16(-1.5), sample_to_i16(-1.0));
    }
}
