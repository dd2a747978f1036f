//! Microphone capture using cpal
//!
//! `cpal::Stream` is not `Send`, so the stream lives on a dedicated capture
//! thread for the whole session. The handle talks to it through atomics and
//! a shared sample buffer; pausing keeps the stream open and drops input.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SampleRate, StreamConfig};
use parking_lot::Mutex;
use tracing::{debug, warn};

use super::flac::encode_to_flac;
use crate::application::ports::{NativeError, NativeRecorder};
use crate::domain::config::{AudioEncoding, RecorderSettings};
use crate::domain::progress::RawMeter;

/// dBFS reported for digital silence
const SILENCE_DB: f32 = -160.0;

/// How often the capture thread checks for shutdown
const CAPTURE_POLL: Duration = Duration::from_millis(20);

/// Levels published by the capture callback, stored as `f32` bits
struct Levels {
    peak_db: AtomicU32,
    average_db: AtomicU32,
}

impl Levels {
    fn new() -> Self {
        Self {
            peak_db: AtomicU32::new(SILENCE_DB.to_bits()),
            average_db: AtomicU32::new(SILENCE_DB.to_bits()),
        }
    }

    fn store(&self, chunk: &[i16]) {
        if chunk.is_empty() {
            return;
        }
        let peak = chunk.iter().map(|s| i32::from(*s).unsigned_abs()).max().unwrap_or(0);
        let mean_square =
            chunk.iter().map(|s| f64::from(*s).powi(2)).sum::<f64>() / chunk.len() as f64;

        self.peak_db.store(to_dbfs(peak as f64).to_bits(), Ordering::Relaxed);
        self.average_db
            .store(to_dbfs(mean_square.sqrt()).to_bits(), Ordering::Relaxed);
    }

    fn read(&self) -> RawMeter {
        RawMeter {
            peak: f32::from_bits(self.peak_db.load(Ordering::Relaxed)),
            average: f32::from_bits(self.average_db.load(Ordering::Relaxed)),
        }
    }
}

fn to_dbfs(amplitude: f64) -> f32 {
    if amplitude <= 0.0 {
        return SILENCE_DB;
    }
    ((20.0 * (amplitude / 32768.0).log10()) as f32).max(SILENCE_DB)
}

/// State shared with the capture thread
struct Capture {
    buffer: Mutex<Vec<i16>>,
    /// Input is kept (false while paused)
    capturing: AtomicBool,
    /// Stream stays open
    running: AtomicBool,
    levels: Levels,
}

/// Format the device actually delivered
#[derive(Debug, Clone, Copy)]
struct DeviceFormat {
    sample_rate: u32,
    channels: u16,
}

/// Native recorder over the default input device
pub struct DesktopRecorder {
    output: Option<PathBuf>,
    settings: Option<RecorderSettings>,
    capture: Arc<Capture>,
    format: Option<DeviceFormat>,
    worker: Option<JoinHandle<()>>,
    released: bool,
}

impl DesktopRecorder {
    pub fn new() -> Self {
        Self {
            output: None,
            settings: None,
            capture: Arc::new(Capture {
                buffer: Mutex::new(Vec::new()),
                capturing: AtomicBool::new(false),
                running: AtomicBool::new(false),
                levels: Levels::new(),
            }),
            format: None,
            worker: None,
            released: false,
        }
    }

    fn live(&self) -> Result<(), NativeError> {
        if self.released {
            Err(NativeError::Released)
        } else {
            Ok(())
        }
    }

    fn join_worker(&mut self) {
        self.capture.running.store(false, Ordering::SeqCst);
        self.capture.capturing.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Capture thread panicked");
            }
        }
    }
}

impl Default for DesktopRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeRecorder for DesktopRecorder {
    fn prepare(&mut self, output: &Path, settings: &RecorderSettings) -> Result<(), NativeError> {
        self.live()?;
        if !matches!(settings.encoding, AudioEncoding::Lpcm | AudioEncoding::Flac) {
            return Err(NativeError::Unsupported(format!(
                "Encoding {} is not available on desktop",
                settings.encoding
            )));
        }
        self.output = Some(output.to_path_buf());
        self.settings = Some(settings.clone());
        Ok(())
    }

    fn start(&mut self) -> Result<(), NativeError> {
        self.live()?;
        let settings = self
            .settings
            .clone()
            .ok_or_else(|| NativeError::Failed("Recorder was never prepared".to_string()))?;

        self.capture.buffer.lock().clear();
        self.capture.running.store(true, Ordering::SeqCst);
        self.capture.capturing.store(true, Ordering::SeqCst);

        let (ready_tx, ready_rx) = mpsc::channel();
        let capture = Arc::clone(&self.capture);
        let worker = std::thread::Builder::new()
            .name("recplay-capture".to_string())
            .spawn(move || run_capture(capture, settings.sample_rate, ready_tx))
            .map_err(|e| NativeError::Failed(format!("Cannot spawn capture thread: {}", e)))?;
        self.worker = Some(worker);

        let format = ready_rx
            .recv()
            .map_err(|_| NativeError::Failed("Capture thread exited early".to_string()))
            .and_then(|ready| ready);
        match format {
            Ok(format) => {
                debug!(
                    sample_rate = format.sample_rate,
                    channels = format.channels,
                    "Capture started"
                );
                self.format = Some(format);
                Ok(())
            }
            Err(e) => {
                self.join_worker();
                Err(e)
            }
        }
    }

    fn pause(&mut self) -> Result<(), NativeError> {
        self.live()?;
        self.capture.capturing.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn resume(&mut self) -> Result<(), NativeError> {
        self.live()?;
        self.capture.capturing.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), NativeError> {
        self.live()?;
        self.join_worker();

        let (Some(output), Some(settings), Some(format)) =
            (self.output.take(), self.settings.take(), self.format.take())
        else {
            return Err(NativeError::Failed("Recorder was never started".to_string()));
        };

        let captured = std::mem::take(&mut *self.capture.buffer.lock());
        if captured.is_empty() {
            return Err(NativeError::Failed("No audio data captured".to_string()));
        }
        let samples = remix(&captured, format.channels, settings.channels);

        match settings.encoding {
            AudioEncoding::Flac => {
                let flac = encode_to_flac(&samples, settings.channels, format.sample_rate)
                    .map_err(|e| NativeError::Failed(e.to_string()))?;
                std::fs::write(&output, flac).map_err(|e| {
                    NativeError::Failed(format!("Failed to write {}: {}", output.display(), e))
                })
            }
            _ => write_wav(&output, &samples, settings.channels, format.sample_rate),
        }
    }

    fn release(&mut self) {
        if !self.released {
            self.join_worker();
            self.released = true;
        }
    }

    fn read_meter(&mut self) -> Result<Option<RawMeter>, NativeError> {
        self.live()?;
        if self.format.is_none() {
            return Ok(None);
        }
        Ok(Some(self.capture.levels.read()))
    }
}

impl Drop for DesktopRecorder {
    fn drop(&mut self) {
        self.release();
    }
}

fn input_device() -> Result<cpal::Device, NativeError> {
    cpal::default_host()
        .default_input_device()
        .ok_or_else(|| NativeError::Unavailable("No audio input device available".to_string()))
}

/// Pick an i16/f32 input config, preferring one that runs at `wanted` Hz.
fn input_config(
    device: &cpal::Device,
    wanted: u32,
) -> Result<(StreamConfig, SampleFormat), NativeError> {
    let ranges = device
        .supported_input_configs()
        .map_err(|e| NativeError::Unavailable(format!("Failed to query input device: {}", e)))?;

    let mut best: Option<cpal::SupportedStreamConfigRange> = None;
    for range in ranges {
        if !matches!(range.sample_format(), SampleFormat::I16 | SampleFormat::F32) {
            continue;
        }
        let covers = |r: &cpal::SupportedStreamConfigRange| {
            r.min_sample_rate().0 <= wanted && r.max_sample_rate().0 >= wanted
        };
        let better = match &best {
            None => true,
            Some(current) => {
                (covers(&range) && !covers(current)) || range.channels() < current.channels()
            }
        };
        if better {
            best = Some(range);
        }
    }

    let range =
        best.ok_or_else(|| NativeError::Unsupported("No usable input format".to_string()))?;
    let sample_rate = if range.min_sample_rate().0 <= wanted && range.max_sample_rate().0 >= wanted
    {
        SampleRate(wanted)
    } else {
        debug!(wanted, "Requested rate unavailable; using device minimum");
        range.min_sample_rate()
    };

    let config = StreamConfig {
        channels: range.channels(),
        sample_rate,
        buffer_size: cpal::BufferSize::Default,
    };
    Ok((config, range.sample_format()))
}

fn open_stream(
    capture: &Arc<Capture>,
    wanted_rate: u32,
) -> Result<(cpal::Stream, DeviceFormat), NativeError> {
    let device = input_device()?;
    let (config, sample_format) = input_config(&device, wanted_rate)?;
    let format = DeviceFormat {
        sample_rate: config.sample_rate.0,
        channels: config.channels,
    };

    let on_error = |err: cpal::StreamError| warn!(error = %err, "Audio input stream error");
    let stream = match sample_format {
        SampleFormat::I16 => {
            let sink = Arc::clone(capture);
            device.build_input_stream(
                &config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| sink.accept(data),
                on_error,
                None,
            )
        }
        SampleFormat::F32 => {
            let sink = Arc::clone(capture);
            device.build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let converted: Vec<i16> =
                        data.iter().map(|&s| (s.clamp(-1.0, 1.0) * 32767.0) as i16).collect();
                    sink.accept(&converted);
                },
                on_error,
                None,
            )
        }
        other => {
            return Err(NativeError::Unsupported(format!(
                "Sample format {:?} is not supported",
                other
            )))
        }
    }
    .map_err(|e| match e {
        cpal::BuildStreamError::DeviceNotAvailable => {
            NativeError::Unavailable("Audio input device is busy or gone".to_string())
        }
        other => NativeError::Failed(format!("Cannot open input stream: {}", other)),
    })?;

    stream
        .play()
        .map_err(|e| NativeError::Failed(format!("Cannot start input stream: {}", e)))?;
    Ok((stream, format))
}

impl Capture {
    fn accept(&self, data: &[i16]) {
        if !self.capturing.load(Ordering::SeqCst) {
            return;
        }
        self.levels.store(data);
        self.buffer.lock().extend_from_slice(data);
    }
}

/// Body of the capture thread. Reports readiness once, then keeps the
/// stream open until `running` clears.
fn run_capture(
    capture: Arc<Capture>,
    wanted_rate: u32,
    ready: mpsc::Sender<Result<DeviceFormat, NativeError>>,
) {
    let stream = match open_stream(&capture, wanted_rate) {
        Ok((stream, format)) => {
            let _ = ready.send(Ok(format));
            stream
        }
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    while capture.running.load(Ordering::SeqCst) {
        std::thread::sleep(CAPTURE_POLL);
    }
    drop(stream);
}

/// Convert interleaved frames between mono and stereo layouts.
fn remix(samples: &[i16], from: u16, to: u16) -> Vec<i16> {
    if from == to || from == 0 {
        return samples.to_vec();
    }
    let from = usize::from(from);
    let to = usize::from(to);

    samples
        .chunks(from)
        .flat_map(|frame| {
            if to == 1 {
                let sum: i32 = frame.iter().map(|&s| i32::from(s)).sum();
                vec![(sum / frame.len() as i32) as i16]
            } else {
                (0..to).map(|c| frame[c.min(frame.len() - 1)]).collect()
            }
        })
        .collect()
}

fn write_wav(
    path: &Path,
    samples: &[i16],
    channels: u16,
    sample_rate: u32,
) -> Result<(), NativeError> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .map_err(|e| NativeError::Failed(format!("Failed to create {}: {}", path.display(), e)))?;
    for &sample in samples {
        writer
            .write_sample(sample)
            .map_err(|e| NativeError::Failed(format!("Failed to write sample: {}", e)))?;
    }
    writer
        .finalize()
        .map_err(|e| NativeError::Failed(format!("Failed to finalize recording: {}", e)))
}
