use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, Stream};
use ogg::writing::{PacketWriteEndInfo, PacketWriter};
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

use super::backend::{AudioChunk, CaptureBackend, CaptureConfig};
use super::decode::{first_channel, resample};
use super::error::{AudioError, Result};

/// Maximum size of one encoded Opus packet.
const MAX_PACKET_SIZE: usize = 4000;

/// Opus pre-skip (standard libopus encoder delay, in 48kHz samples).
const PRE_SKIP: u16 = 312;

/// Serial number of the single logical Ogg stream per recording.
const STREAM_SERIAL: u32 = 1;

/// Granule position increment per 20ms frame (48kHz Opus clock).
const GRANULE_PER_FRAME: u64 = 960;

/// Flush a page (and therefore a chunk) every N frames (~500ms of audio).
const FRAMES_PER_PAGE: u64 = 25;

/// Microphone capture backend.
///
/// The cpal stream is `!Send`, so it lives on a dedicated capture thread for
/// the whole recording. The thread drains the device buffer on a fixed
/// cadence, conditions the samples to mono at the canonical rate, encodes
/// them to an Ogg/Opus stream, and emits each completed page as an opaque
/// chunk. Dropping the stream releases the device; that happens exactly once,
/// on stop and on every failure path.
///
/// cpal exposes no echo-cancellation or noise-suppression controls, so input
/// conditioning beyond format conversion is left to the OS capture stack.
pub struct MicrophoneBackend {
    config: CaptureConfig,
    capturing: Arc<AtomicBool>,
    worker: Option<std::thread::JoinHandle<()>>,
}

impl MicrophoneBackend {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            capturing: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }
}

#[async_trait::async_trait]
impl CaptureBackend for MicrophoneBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioChunk>> {
        if self.capturing.load(Ordering::SeqCst) {
            return Err(AudioError::InvalidState {
                expected: "idle",
                actual: "recording",
            });
        }

        let (chunk_tx, chunk_rx) = mpsc::channel(64);
        let (ready_tx, ready_rx) = oneshot::channel();

        let config = self.config.clone();
        let capturing = Arc::clone(&self.capturing);
        let worker = std::thread::Builder::new()
            .name("mic-capture".to_string())
            .spawn(move || capture_worker(config, capturing, chunk_tx, ready_tx))
            .map_err(|e| AudioError::CaptureFailed(format!("capture thread spawn: {e}")))?;

        match ready_rx.await {
            Ok(Ok(())) => {
                self.worker = Some(worker);
                Ok(chunk_rx)
            }
            Ok(Err(e)) => {
                let _ = worker.join();
                Err(e)
            }
            Err(_) => {
                let _ = worker.join();
                Err(AudioError::CaptureFailed(
                    "capture thread exited before opening the device".to_string(),
                ))
            }
        }
    }

    async fn stop(&mut self) -> Result<()> {
        self.capturing.store(false, Ordering::SeqCst);

        if let Some(worker) = self.worker.take() {
            tokio::task::spawn_blocking(move || worker.join())
                .await
                .map_err(|e| AudioError::CaptureFailed(format!("stop join: {e}")))?
                .map_err(|_| {
                    AudioError::CaptureFailed("capture thread panicked".to_string())
                })?;
        }

        info!("microphone capture stopped");
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "microphone"
    }
}

impl Drop for MicrophoneBackend {
    fn drop(&mut self) {
        // Lets a still-running capture thread wind down and release the device.
        self.capturing.store(false, Ordering::SeqCst);
    }
}

/// Everything that runs on the dedicated capture thread.
fn capture_worker(
    config: CaptureConfig,
    capturing: Arc<AtomicBool>,
    chunk_tx: mpsc::Sender<AudioChunk>,
    ready_tx: oneshot::Sender<Result<()>>,
) {
    let (stream, buffer, device_rate, device_channels) = match open_input_stream() {
        Ok(parts) => parts,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    let mut encoder = match OggOpusWriter::new(config.sample_rate, ChunkSink::new(chunk_tx)) {
        Ok(encoder) => encoder,
        Err(e) => {
            // Stream drops here, releasing the device before we report failure.
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    capturing.store(true, Ordering::SeqCst);
    let _ = ready_tx.send(Ok(()));

    let drain_interval = Duration::from_millis(config.buffer_duration_ms.max(10));

    while capturing.load(Ordering::SeqCst) {
        std::thread::sleep(drain_interval);
        let raw = take_buffered(&buffer);
        if raw.is_empty() {
            continue;
        }
        let conditioned = condition(&raw, device_channels, device_rate, config.sample_rate);
        if let Err(e) = encoder.push(&conditioned) {
            error!(error = %e, "chunk encoding failed mid-stream");
            capturing.store(false, Ordering::SeqCst);
            break;
        }
    }

    // Release the device before the final drain so no more samples arrive.
    drop(stream);

    let raw = take_buffered(&buffer);
    if !raw.is_empty() {
        let conditioned = condition(&raw, device_channels, device_rate, config.sample_rate);
        if let Err(e) = encoder.push(&conditioned) {
            warn!(error = %e, "dropping tail samples after encode failure");
        }
    }

    if let Err(e) = encoder.finish() {
        warn!(error = %e, "failed to finalize chunk stream");
    }
    // Dropping the encoder drops the chunk sender, closing the channel.
}

type SharedBuffer = Arc<Mutex<Vec<f32>>>;

fn take_buffered(buffer: &SharedBuffer) -> Vec<f32> {
    let mut buf = buffer.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    std::mem::take(&mut *buf)
}

/// Reduce interleaved device samples to mono at the target rate. First
/// channel, same as the decode side.
fn condition(raw: &[f32], channels: usize, device_rate: u32, target_rate: u32) -> Vec<f32> {
    let mono = first_channel(raw, channels);
    resample(&mono, device_rate, target_rate)
}

/// Open the default input device with its native configuration and start the
/// stream. Samples accumulate in the shared buffer as f32 regardless of the
/// device's native format.
fn open_input_stream() -> Result<(Stream, SharedBuffer, u32, usize)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| AudioError::DeviceUnavailable("no input device found".to_string()))?;

    let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());

    let supported = device
        .default_input_config()
        .map_err(|e| AudioError::DeviceUnavailable(format!("no input config: {e}")))?;

    let sample_format = supported.sample_format();
    let stream_config: cpal::StreamConfig = supported.into();
    let device_rate = stream_config.sample_rate.0;
    let channels = usize::from(stream_config.channels.max(1));

    let buffer: SharedBuffer = Arc::new(Mutex::new(Vec::new()));

    let err_fn = |err: cpal::StreamError| {
        error!(error = %err, "audio stream error");
    };

    let stream = match sample_format {
        SampleFormat::F32 => {
            let buffer = Arc::clone(&buffer);
            device.build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buf) = buffer.lock() {
                        buf.extend_from_slice(data);
                    }
                },
                err_fn,
                None,
            )
        }
        SampleFormat::I16 => {
            let buffer = Arc::clone(&buffer);
            device.build_input_stream(
                &stream_config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buf) = buffer.lock() {
                        buf.extend(data.iter().map(|&s| s as f32 / 32_768.0));
                    }
                },
                err_fn,
                None,
            )
        }
        SampleFormat::U16 => {
            let buffer = Arc::clone(&buffer);
            device.build_input_stream(
                &stream_config,
                move |data: &[u16], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buf) = buffer.lock() {
                        buf.extend(
                            data.iter()
                                .map(|&s| (s as f32 - 32_768.0) / 32_768.0),
                        );
                    }
                },
                err_fn,
                None,
            )
        }
        other => {
            return Err(AudioError::DeviceUnavailable(format!(
                "unsupported sample format: {other:?}"
            )))
        }
    }
    .map_err(|e| AudioError::DeviceUnavailable(format!("failed to open stream: {e}")))?;

    stream
        .play()
        .map_err(|e| AudioError::DeviceUnavailable(format!("failed to start stream: {e}")))?;

    info!(
        device = %device_name,
        sample_rate = device_rate,
        channels,
        format = ?sample_format,
        "microphone capture started"
    );

    Ok((stream, buffer, device_rate, channels))
}

/// Incremental mono Ogg/Opus stream writer.
///
/// OpusHead and OpusTags pages are written at construction so even an
/// immediately-stopped recording yields a well-formed stream. Audio is
/// packetized into 20ms frames; a page boundary (and therefore a chunk) is
/// forced roughly every 500ms of audio.
struct OggOpusWriter<W: io::Write> {
    encoder: opus::Encoder,
    writer: PacketWriter<'static, W>,
    pending: Vec<f32>,
    frame_size: usize,
    granule: u64,
    frames: u64,
}

impl<W: io::Write> OggOpusWriter<W> {
    fn new(sample_rate: u32, sink: W) -> Result<Self> {
        let mut encoder =
            opus::Encoder::new(sample_rate, opus::Channels::Mono, opus::Application::Voip)
                .map_err(|e| AudioError::CaptureFailed(format!("opus encoder init: {e}")))?;
        encoder
            .set_bitrate(opus::Bitrate::Bits(24_000))
            .map_err(|e| AudioError::CaptureFailed(format!("opus bitrate: {e}")))?;

        let mut writer = PacketWriter::new(sink);
        writer
            .write_packet(
                opus_head(sample_rate),
                STREAM_SERIAL,
                PacketWriteEndInfo::EndPage,
                0,
            )
            .map_err(|e| AudioError::CaptureFailed(format!("ogg header write: {e}")))?;
        writer
            .write_packet(
                opus_tags(),
                STREAM_SERIAL,
                PacketWriteEndInfo::EndPage,
                0,
            )
            .map_err(|e| AudioError::CaptureFailed(format!("ogg tags write: {e}")))?;

        Ok(Self {
            encoder,
            writer,
            pending: Vec::new(),
            frame_size: sample_rate as usize / 50, // 20ms
            granule: 0,
            frames: 0,
        })
    }

    fn push(&mut self, samples: &[f32]) -> Result<()> {
        self.pending.extend_from_slice(samples);
        while self.pending.len() >= self.frame_size {
            let frame: Vec<f32> = self.pending.drain(..self.frame_size).collect();
            self.write_frame(&frame, PacketWriteEndInfo::NormalPacket)?;
        }
        Ok(())
    }

    /// Flush the remainder (zero-padded to a whole frame) and close the
    /// stream with an end-of-stream page.
    fn finish(mut self) -> Result<()> {
        let mut frame = std::mem::take(&mut self.pending);
        frame.resize(self.frame_size, 0.0);
        self.write_frame(&frame, PacketWriteEndInfo::EndStream)
    }

    fn write_frame(&mut self, frame: &[f32], end_info: PacketWriteEndInfo) -> Result<()> {
        let encoded = self
            .encoder
            .encode_vec_float(frame, MAX_PACKET_SIZE)
            .map_err(|e| AudioError::CaptureFailed(format!("opus encode: {e}")))?;

        self.granule += GRANULE_PER_FRAME;
        self.frames += 1;

        let end_info = match end_info {
            PacketWriteEndInfo::NormalPacket if self.frames % FRAMES_PER_PAGE == 0 => {
                PacketWriteEndInfo::EndPage
            }
            other => other,
        };

        self.writer
            .write_packet(encoded, STREAM_SERIAL, end_info, self.granule)
            .map_err(|e| AudioError::CaptureFailed(format!("ogg write: {e}")))
    }
}

/// OpusHead identification header (RFC 7845, 19 bytes).
fn opus_head(input_sample_rate: u32) -> Vec<u8> {
    let mut head = Vec::with_capacity(19);
    head.extend_from_slice(b"OpusHead");
    head.push(1); // version
    head.push(1); // channels (mono)
    head.extend_from_slice(&PRE_SKIP.to_le_bytes());
    head.extend_from_slice(&input_sample_rate.to_le_bytes());
    head.extend_from_slice(&0u16.to_le_bytes()); // output gain
    head.push(0); // channel mapping family
    head
}

/// Minimal OpusTags comment header (RFC 7845).
fn opus_tags() -> Vec<u8> {
    let vendor = b"speechbridge";
    let mut tags = Vec::with_capacity(8 + 4 + vendor.len() + 4);
    tags.extend_from_slice(b"OpusTags");
    tags.extend_from_slice(&(vendor.len() as u32).to_le_bytes());
    tags.extend_from_slice(vendor);
    tags.extend_from_slice(&0u32.to_le_bytes()); // 0 comments
    tags
}

/// Forwards each completed Ogg page write to the chunk channel.
struct ChunkSink {
    tx: mpsc::Sender<AudioChunk>,
}

impl ChunkSink {
    fn new(tx: mpsc::Sender<AudioChunk>) -> Self {
        Self { tx }
    }
}

impl io::Write for ChunkSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.tx
            .blocking_send(AudioChunk::new(buf.to_vec()))
            .map_err(|_| {
                io::Error::new(io::ErrorKind::BrokenPipe, "chunk receiver dropped")
            })?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opus_head_layout() {
        let head = opus_head(16000);
        assert_eq!(head.len(), 19);
        assert_eq!(&head[..8], b"OpusHead");
        assert_eq!(head[8], 1); // version
        assert_eq!(head[9], 1); // mono
        assert_eq!(u32::from_le_bytes(head[12..16].try_into().unwrap()), 16000);
    }

    #[test]
    fn opus_tags_layout() {
        let tags = opus_tags();
        assert_eq!(&tags[..8], b"OpusTags");
        let vendor_len = u32::from_le_bytes(tags[8..12].try_into().unwrap()) as usize;
        assert_eq!(&tags[12..12 + vendor_len], b"speechbridge");
    }
}
