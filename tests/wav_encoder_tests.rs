// Byte-level tests for the canonical WAV container.
//
// The 44-byte header layout and the asymmetric sample scaling are the one
// compatibility surface downstream consumers parse directly, so these tests
// check exact bytes, not just parsed fields.

use speechbridge::{PcmEncoder, SampleBuffer, WAV_HEADER_LEN};

fn encode(samples: Vec<f32>) -> Vec<u8> {
    encode_at(samples, 16000)
}

fn encode_at(samples: Vec<f32>, sample_rate: u32) -> Vec<u8> {
    PcmEncoder::encode(&SampleBuffer::new(samples, sample_rate))
        .expect("encoding should succeed")
        .into_bytes()
}

fn u16_at(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes(bytes[offset..offset + 2].try_into().unwrap())
}

fn u32_at(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
}

fn i16_sample(bytes: &[u8], index: usize) -> i16 {
    let offset = WAV_HEADER_LEN + index * 2;
    i16::from_le_bytes(bytes[offset..offset + 2].try_into().unwrap())
}

#[test]
fn container_length_is_header_plus_two_bytes_per_sample() {
    for n in [0usize, 1, 7, 160, 16000] {
        let bytes = encode(vec![0.25; n]);
        assert_eq!(bytes.len(), 44 + 2 * n, "length mismatch for n={n}");
    }
}

#[test]
fn header_fields_describe_mono_16bit_pcm() {
    let n = 320usize;
    let bytes = encode(vec![0.0; n]);
    let payload = (2 * n) as u32;

    assert_eq!(&bytes[0..4], b"RIFF");
    assert_eq!(u32_at(&bytes, 4), 36 + payload);
    assert_eq!(&bytes[8..12], b"WAVE");
    assert_eq!(&bytes[12..16], b"fmt ");
    assert_eq!(u32_at(&bytes, 16), 16); // fmt chunk size
    assert_eq!(u16_at(&bytes, 20), 1); // linear PCM
    assert_eq!(u16_at(&bytes, 22), 1); // channels
    assert_eq!(u32_at(&bytes, 24), 16000); // sample rate
    assert_eq!(u32_at(&bytes, 28), 32000); // byte rate
    assert_eq!(u16_at(&bytes, 32), 2); // block align
    assert_eq!(u16_at(&bytes, 34), 16); // bits per sample
    assert_eq!(&bytes[36..40], b"data");
    assert_eq!(u32_at(&bytes, 40), payload);
}

#[test]
fn header_respects_the_given_sample_rate() {
    let bytes = encode_at(vec![0.0; 8], 8000);
    assert_eq!(u32_at(&bytes, 24), 8000);
    assert_eq!(u32_at(&bytes, 28), 16000); // rate * 1 channel * 2 bytes
}

#[test]
fn full_deflection_values() {
    let bytes = encode(vec![0.0, 1.0, -1.0]);
    assert_eq!(i16_sample(&bytes, 0), 0x0000);
    assert_eq!(i16_sample(&bytes, 1), 0x7FFF);
    assert_eq!(i16_sample(&bytes, 2), -0x8000);
}

#[test]
fn out_of_range_samples_encode_like_clamped_ones() {
    assert_eq!(encode(vec![1.5]), encode(vec![1.0]));
    assert_eq!(encode(vec![-1.5]), encode(vec![-1.0]));
    assert_eq!(i16_sample(&encode(vec![1.5]), 0), 0x7FFF);
    assert_eq!(i16_sample(&encode(vec![-1.5]), 0), -0x8000);
}

#[test]
fn scaling_is_asymmetric_about_zero() {
    let bytes = encode(vec![0.5, -0.5]);
    assert_eq!(i16_sample(&bytes, 0), (0.5f32 * 32767.0) as i16);
    assert_eq!(i16_sample(&bytes, 1), (-0.5f32 * 32768.0) as i16);
}

#[test]
fn empty_buffer_yields_a_bare_header() {
    let bytes = encode(Vec::new());
    assert_eq!(bytes.len(), 44);
    assert_eq!(u32_at(&bytes, 4), 36); // RIFF size with zero payload
    assert_eq!(u32_at(&bytes, 40), 0); // data size
}

#[test]
fn golden_empty_container() {
    let expected: [u8; 44] = [
        b'R', b'I', b'F', b'F', 36, 0, 0, 0, //
        b'W', b'A', b'V', b'E', //
        b'f', b'm', b't', b' ', 16, 0, 0, 0, //
        1, 0, // PCM
        1, 0, // mono
        0x80, 0x3E, 0, 0, // 16000
        0x00, 0x7D, 0, 0, // 32000
        2, 0, // block align
        16, 0, // bits per sample
        b'd', b'a', b't', b'a', 0, 0, 0, 0,
    ];
    assert_eq!(encode(Vec::new()), expected);
}

#[test]
fn encoding_is_deterministic() {
    let samples: Vec<f32> = (0..1000).map(|i| ((i % 200) as f32 - 100.0) / 100.0).collect();
    assert_eq!(encode(samples.clone()), encode(samples));
}
