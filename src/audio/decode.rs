use std::io::Cursor;

use symphonia::core::audio::SampleBuffer as SymphoniaSampleBuffer;
use symphonia::core::codecs::{CodecParameters, DecoderOptions, CODEC_TYPE_NULL, CODEC_TYPE_OPUS};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

use super::backend::AudioChunk;
use super::error::{AudioError, Result};

/// Canonical sample rate of the pipeline output.
pub const CANONICAL_SAMPLE_RATE: u32 = 16_000;

/// An ordered sequence of mono float samples in [-1.0, 1.0] at a fixed
/// sample rate. Derived once per sealed recording; immutable after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl SampleBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Turns a sealed chunk sequence into a single mono sample buffer at the
/// canonical rate.
///
/// The concatenated bytes are probed with symphonia, decoded to interleaved
/// floats, reduced to the FIRST channel (a deliberate simplification, not an
/// average), and resampled to the target rate. Ogg/Opus streams are demuxed by
/// symphonia and the packets decoded with libopus directly at the target rate.
pub struct Decoder {
    sample_rate: u32,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new(CANONICAL_SAMPLE_RATE)
    }
}

impl Decoder {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }

    /// Decode an ordered chunk sequence. Order is significant and preserved
    /// exactly as captured.
    pub fn decode(&self, chunks: &[AudioChunk]) -> Result<SampleBuffer> {
        let total_bytes: usize = chunks.iter().map(|c| c.len()).sum();
        if total_bytes == 0 {
            return Err(AudioError::DecodeError(
                "captured stream is empty".to_string(),
            ));
        }

        let mut stream = Vec::with_capacity(total_bytes);
        for chunk in chunks {
            stream.extend_from_slice(chunk.as_bytes());
        }

        debug!(
            chunks = chunks.len(),
            bytes = total_bytes,
            "decoding captured stream"
        );

        self.decode_bytes(stream)
    }

    /// Decode a complete compressed byte stream.
    pub fn decode_bytes(&self, bytes: Vec<u8>) -> Result<SampleBuffer> {
        if bytes.is_empty() {
            return Err(AudioError::DecodeError(
                "captured stream is empty".to_string(),
            ));
        }

        let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());
        let probed = symphonia::default::get_probe()
            .format(
                &Hint::new(),
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| AudioError::DecodeError(format!("unrecognized audio format: {e}")))?;

        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| AudioError::DecodeError("no decodable audio track".to_string()))?;
        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let samples = if codec_params.codec == CODEC_TYPE_OPUS {
            // symphonia demuxes Opus-in-Ogg but does not ship an Opus decoder;
            // libopus decodes at whatever rate we ask for, so no resample pass.
            self.decode_opus_packets(format.as_mut(), track_id, &codec_params)?
        } else {
            let (interleaved, source_rate, channels) =
                decode_packets(format.as_mut(), track_id, &codec_params)?;
            let mono = first_channel(&interleaved, channels);
            resample(&mono, source_rate, self.sample_rate)
        };

        if samples.is_empty() {
            return Err(AudioError::DecodeError(
                "stream contained no audio samples".to_string(),
            ));
        }

        debug!(samples = samples.len(), rate = self.sample_rate, "decode complete");

        Ok(SampleBuffer::new(samples, self.sample_rate))
    }

    fn decode_opus_packets(
        &self,
        format: &mut dyn FormatReader,
        track_id: u32,
        codec_params: &CodecParameters,
    ) -> Result<Vec<f32>> {
        let mut decoder = opus::Decoder::new(self.sample_rate, opus::Channels::Mono)
            .map_err(|e| AudioError::DecodeError(format!("opus decoder init: {e}")))?;

        let mut pre_skip = opus_pre_skip(codec_params);

        // 120ms is the longest legal Opus frame.
        let max_frame = self.sample_rate as usize * 120 / 1000;
        let mut frame = vec![0.0f32; max_frame];
        let mut samples = Vec::new();

        while let Some(packet) = next_packet(format, track_id)? {
            let data = packet.buf();
            // Header packets are normally consumed by the demuxer; read the
            // pre-skip if the identification header surfaces anyway.
            if data.starts_with(b"OpusHead") {
                pre_skip = parse_pre_skip(data).unwrap_or(pre_skip);
                continue;
            }
            if data.starts_with(b"OpusTags") {
                continue;
            }
            let decoded = decoder
                .decode_float(data, &mut frame, false)
                .map_err(|e| AudioError::DecodeError(format!("opus packet: {e}")))?;
            samples.extend_from_slice(&frame[..decoded]);
        }

        // The declared pre-skip is encoder priming, not audio. It is counted
        // on the 48kHz Opus clock regardless of the decode rate.
        let skip = (pre_skip as u64 * self.sample_rate as u64 / 48_000) as usize;
        if skip >= samples.len() {
            samples.clear();
        } else {
            samples.drain(..skip);
        }

        Ok(samples)
    }
}

/// Pre-skip declared by the stream's OpusHead, in 48kHz samples. The demuxer
/// carries the identification header as codec extra data.
fn opus_pre_skip(codec_params: &CodecParameters) -> u16 {
    codec_params
        .extra_data
        .as_deref()
        .and_then(parse_pre_skip)
        .unwrap_or(0)
}

fn parse_pre_skip(head: &[u8]) -> Option<u16> {
    if head.len() >= 12 && head.starts_with(b"OpusHead") {
        Some(u16::from_le_bytes([head[10], head[11]]))
    } else {
        None
    }
}

/// Decode every packet of the selected track to interleaved f32.
///
/// Returns the interleaved samples together with the source sample rate and
/// channel count reported by the codec. Corruption is propagated as
/// `DecodeError` rather than silently returning partial data: when the
/// container declares a frame count (WAV does), a shortfall means the stream
/// was truncated and is rejected. Length-less streams end at EOF.
fn decode_packets(
    format: &mut dyn FormatReader,
    track_id: u32,
    codec_params: &CodecParameters,
) -> Result<(Vec<f32>, u32, usize)> {
    let mut decoder = symphonia::default::get_codecs()
        .make(codec_params, &DecoderOptions::default())
        .map_err(|e| AudioError::DecodeError(format!("unsupported codec: {e}")))?;

    let mut interleaved = Vec::new();
    let mut sample_rate = codec_params.sample_rate.unwrap_or(CANONICAL_SAMPLE_RATE);
    let mut channels = codec_params.channels.map(|c| c.count()).unwrap_or(1);

    while let Some(packet) = next_packet(format, track_id)? {
        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate = spec.rate;
                channels = spec.channels.count();
                let mut buf =
                    SymphoniaSampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buf.copy_interleaved_ref(decoded);
                interleaved.extend_from_slice(buf.samples());
            }
            Err(e) => {
                return Err(AudioError::DecodeError(format!("corrupt packet: {e}")));
            }
        }
    }

    if let Some(expected) = codec_params.n_frames {
        let frames = (interleaved.len() / channels.max(1)) as u64;
        if frames < expected {
            return Err(AudioError::DecodeError(format!(
                "stream truncated: {frames} of {expected} declared frames"
            )));
        }
    }

    Ok((interleaved, sample_rate, channels))
}

/// Pull the next packet for `track_id`, treating end-of-stream as `None`.
fn next_packet(
    format: &mut dyn FormatReader,
    track_id: u32,
) -> Result<Option<symphonia::core::formats::Packet>> {
    loop {
        match format.next_packet() {
            Ok(packet) if packet.track_id() == track_id => return Ok(Some(packet)),
            Ok(_) => continue,
            Err(SymphoniaError::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                return Ok(None)
            }
            // Chained streams would require a decoder reset; a single sealed
            // recording never produces one, so treat it as the end.
            Err(SymphoniaError::ResetRequired) => return Ok(None),
            Err(e) => return Err(AudioError::DecodeError(e.to_string())),
        }
    }
}

/// Select the first channel from interleaved samples. Not an average: channel
/// selection is specified pipeline behavior.
pub(crate) fn first_channel(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved.iter().step_by(channels).copied().collect()
}

/// Linear-interpolation resample. Adequate for speech transcription input.
pub(crate) fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).ceil() as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_pos = i as f64 * ratio;
        let idx = src_pos as usize;
        let frac = (src_pos - idx as f64) as f32;

        let sample = if idx + 1 < samples.len() {
            samples[idx] * (1.0 - frac) + samples[idx + 1] * frac
        } else {
            samples[samples.len() - 1]
        };
        output.push(sample);
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_channel_takes_channel_zero_only() {
        let interleaved = vec![0.1, 0.9, 0.2, 0.8, 0.3, 0.7];
        assert_eq!(first_channel(&interleaved, 2), vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn first_channel_passes_mono_through() {
        let mono = vec![0.1, 0.2, 0.3];
        assert_eq!(first_channel(&mono, 1), mono);
    }

    #[test]
    fn resample_is_identity_at_equal_rates() {
        let samples = vec![0.1, 0.2, 0.3];
        assert_eq!(resample(&samples, 16000, 16000), samples);
    }

    #[test]
    fn resample_48k_to_16k_thins_by_three() {
        let samples = vec![0.5; 48000];
        let out = resample(&samples, 48000, 16000);
        assert_eq!(out.len(), 16000);
    }

    #[test]
    fn resample_handles_empty_input() {
        let out = resample(&[], 44100, 16000);
        assert!(out.is_empty());
    }

    fn opus_head_with_pre_skip(pre_skip: u16) -> Vec<u8> {
        let mut head = Vec::with_capacity(19);
        head.extend_from_slice(b"OpusHead");
        head.push(1); // version
        head.push(1); // channels
        head.extend_from_slice(&pre_skip.to_le_bytes());
        head.extend_from_slice(&48_000u32.to_le_bytes());
        head.extend_from_slice(&0u16.to_le_bytes());
        head.push(0);
        head
    }

    #[test]
    fn pre_skip_is_read_from_the_identification_header() {
        assert_eq!(parse_pre_skip(&opus_head_with_pre_skip(312)), Some(312));
        assert_eq!(parse_pre_skip(b"OpusTags"), None);
        assert_eq!(parse_pre_skip(b"short"), None);
    }

    #[test]
    fn pre_skip_comes_from_codec_extra_data() {
        let mut params = CodecParameters::new();
        params.with_extra_data(opus_head_with_pre_skip(312).into_boxed_slice());
        assert_eq!(opus_pre_skip(&params), 312);
        assert_eq!(opus_pre_skip(&CodecParameters::new()), 0);
    }
}
