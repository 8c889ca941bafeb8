//! Where decoded stereo samples go: a live cpal output stream, or a file
//! (raw interleaved PCM, or one decimal pair per line with `--text`).

use crate::error::{PlayerError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Condvar, Mutex};

pub const SAMPLE_RATE_HZ: u32 = 32_000;

/// Destination for the 32 kHz stereo stream the emulator produces.
pub trait SampleSink {
    fn push(&mut self, left: i16, right: i16);

    /// Flushes any buffered output. Called once at the end of a run.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Bounded ring buffer feeding a live cpal output stream. `push` blocks
/// (via a condvar, not a busy loop) once the buffer is full, providing the
/// backpressure the driver loop needs instead of racing ahead of the
/// sound card.
pub struct CpalSink {
    #[allow(dead_code)]
    stream: cpal::Stream,
    queue: Arc<(Mutex<VecDeque<(i16, i16)>>, Condvar)>,
    capacity: usize,
}

impl CpalSink {
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or_else(|| PlayerError::AudioBackend {
            message: "no audio output device available".into(),
        })?;

        let supported = device.default_output_config().map_err(|e| PlayerError::AudioBackend {
            message: e.to_string(),
        })?;
        let channels = supported.channels().max(2) as usize;
        let device_rate = supported.sample_rate().0;
        if device_rate != SAMPLE_RATE_HZ {
            log::warn!(
                "Audio: device default rate is {device_rate} Hz, player emits {SAMPLE_RATE_HZ} Hz; expect pitch drift without resampling"
            );
        }

        let capacity = (SAMPLE_RATE_HZ as usize / 4).max(2048); // >= 250ms of audio
        let queue = Arc::new((Mutex::new(VecDeque::with_capacity(capacity)), Condvar::new()));
        let callback_queue = queue.clone();

        let config = cpal::StreamConfig {
            channels: channels as u16,
            sample_rate: cpal::SampleRate(device_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let (lock, cvar) = &*callback_queue;
                    let mut q = lock.lock().unwrap();
                    for frame in data.chunks_mut(channels) {
                        let (left, right) = q.pop_front().unwrap_or((0, 0));
                        frame[0] = left as f32 / 32768.0;
                        if frame.len() > 1 {
                            frame[1] = right as f32 / 32768.0;
                        }
                    }
                    cvar.notify_one();
                },
                |err| log::error!("Audio stream error: {err}"),
                None,
            )
            .map_err(|e| PlayerError::AudioBackend { message: e.to_string() })?;
        stream.play().map_err(|e| PlayerError::AudioBackend { message: e.to_string() })?;

        Ok(Self { stream, queue, capacity })
    }
}

impl SampleSink for CpalSink {
    fn push(&mut self, left: i16, right: i16) {
        let (lock, cvar) = &*self.queue;
        let mut q = lock.lock().unwrap();
        while q.len() >= self.capacity {
            q = cvar.wait(q).unwrap();
        }
        q.push_back((left, right));
    }
}

enum FileFormat {
    RawPcm,
    Text,
}

/// Writes the stream to a file: raw little-endian interleaved PCM, or
/// one `left right` decimal pair per line with `--text`.
pub struct FileSink {
    writer: BufWriter<File>,
    format: FileFormat,
}

impl FileSink {
    pub fn create(path: &Path, text: bool) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            format: if text { FileFormat::Text } else { FileFormat::RawPcm },
        })
    }
}

impl SampleSink for FileSink {
    fn push(&mut self, left: i16, right: i16) {
        match self.format {
            FileFormat::RawPcm => {
                let _ = self.writer.write_all(&left.to_ne_bytes());
                let _ = self.writer.write_all(&right.to_ne_bytes());
            }
            FileFormat::Text => {
                let _ = writeln!(self.writer, "{left} {right}");
            }
        }
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
