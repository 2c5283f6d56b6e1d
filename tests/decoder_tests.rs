// Decoder tests against in-memory WAV fixtures.
//
// WAV is lossless, so sample counts and values can be asserted exactly.
// Fixtures are built with hound and split into chunks the way a live capture
// would deliver them.

use std::io::Cursor;

use speechbridge::{AudioChunk, AudioError, Decoder, PcmEncoder};

fn wav_bytes(samples: &[i16], sample_rate: u32, channels: u16) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for &sample in samples {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

fn split_into_chunks(bytes: &[u8], chunk_size: usize) -> Vec<AudioChunk> {
    bytes
        .chunks(chunk_size)
        .map(|c| AudioChunk::new(c.to_vec()))
        .collect()
}

#[test]
fn empty_chunk_sequence_is_rejected() {
    let err = Decoder::default().decode(&[]).unwrap_err();
    assert!(matches!(err, AudioError::DecodeError(_)));
}

#[test]
fn chunks_with_no_bytes_are_rejected() {
    let chunks = vec![AudioChunk::new(Vec::new()), AudioChunk::new(Vec::new())];
    let err = Decoder::default().decode(&chunks).unwrap_err();
    assert!(matches!(err, AudioError::DecodeError(_)));
}

#[test]
fn unrecognized_bytes_are_rejected() {
    let chunks = vec![AudioChunk::new(vec![0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x01])];
    let err = Decoder::default().decode(&chunks).unwrap_err();
    assert!(matches!(err, AudioError::DecodeError(_)));
}

#[test]
fn two_seconds_of_16k_mono_decode_to_32000_samples() {
    let source: Vec<i16> = vec![0; 32000];
    let bytes = wav_bytes(&source, 16000, 1);
    let chunks = split_into_chunks(&bytes, 30000);
    assert_eq!(chunks.len(), 3);

    let buffer = Decoder::default().decode(&chunks).unwrap();
    assert_eq!(buffer.sample_rate, 16000);
    assert_eq!(buffer.len(), 32000);
    assert!((buffer.duration_seconds() - 2.0).abs() < f64::EPSILON);

    // Re-encoding the canonical buffer gives the full container back:
    // 44 header bytes plus two bytes per sample.
    let container = PcmEncoder::encode(&buffer).unwrap();
    assert_eq!(container.len(), 64044);
}

#[test]
fn sample_values_survive_decoding() {
    // 16384/32768 = 0.5 exactly in the decoder's integer-to-float conversion.
    let source: Vec<i16> = vec![16384; 1600];
    let bytes = wav_bytes(&source, 16000, 1);

    let buffer = Decoder::default()
        .decode(&split_into_chunks(&bytes, 4096))
        .unwrap();
    assert_eq!(buffer.len(), 1600);
    for &sample in &buffer.samples {
        assert!((sample - 0.5).abs() < 1e-3, "expected ~0.5, got {sample}");
    }
}

#[test]
fn stereo_input_keeps_the_first_channel() {
    // Left channel carries the signal, right channel is silent. Averaging
    // would halve the amplitude; channel selection keeps it intact.
    let frames = 800usize;
    let mut interleaved = Vec::with_capacity(frames * 2);
    for _ in 0..frames {
        interleaved.push(16384i16); // left
        interleaved.push(0i16); // right
    }
    let bytes = wav_bytes(&interleaved, 16000, 2);

    let buffer = Decoder::default()
        .decode(&split_into_chunks(&bytes, 4096))
        .unwrap();
    assert_eq!(buffer.len(), frames);
    for &sample in &buffer.samples {
        assert!((sample - 0.5).abs() < 1e-3, "expected ~0.5, got {sample}");
    }
}

#[test]
fn higher_rate_input_is_resampled_to_the_canonical_rate() {
    // One second at 48kHz becomes one second at 16kHz.
    let source: Vec<i16> = vec![8192; 48000];
    let bytes = wav_bytes(&source, 48000, 1);

    let buffer = Decoder::default()
        .decode(&split_into_chunks(&bytes, 16384))
        .unwrap();
    assert_eq!(buffer.sample_rate, 16000);
    assert_eq!(buffer.len(), 16000);
}

#[test]
fn truncated_stream_is_rejected() {
    // The header declares 32000 frames; cutting the payload short must fail
    // rather than yield a shortened buffer.
    let source: Vec<i16> = vec![0; 32000];
    let bytes = wav_bytes(&source, 16000, 1);
    let truncated = bytes[..30000].to_vec();

    let err = Decoder::default()
        .decode(&[AudioChunk::new(truncated)])
        .unwrap_err();
    assert!(matches!(err, AudioError::DecodeError(_)));
}

#[test]
fn dropping_the_last_chunk_is_rejected() {
    let source: Vec<i16> = vec![0; 32000];
    let bytes = wav_bytes(&source, 16000, 1);
    let mut chunks = split_into_chunks(&bytes, 30000);
    chunks.pop();

    let err = Decoder::default().decode(&chunks).unwrap_err();
    assert!(matches!(err, AudioError::DecodeError(_)));
}

#[test]
fn chunk_boundaries_do_not_affect_the_result() {
    let source: Vec<i16> = (0..3200).map(|i| (i % 2000) as i16).collect();
    let bytes = wav_bytes(&source, 16000, 1);

    let decoder = Decoder::default();
    let coarse = decoder.decode(&split_into_chunks(&bytes, 4096)).unwrap();
    let fine = decoder.decode(&split_into_chunks(&bytes, 17)).unwrap();
    assert_eq!(coarse, fine);
}
