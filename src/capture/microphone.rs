use super::buffer::{level_f32, level_i16};
use super::wav::{encode_wav, WAV_MIME};
use super::{
    Artifact, AudioBuffer, AudioLevel, CaptureError, MediaCapture, MediaStream, RecordingHandle,
};
use async_trait::async_trait;
use chrono::Utc;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};
use tracing::{error, info};
use uuid::Uuid;

struct ActiveInput {
    stream_id: String,
    // Dropping the stream closes the device.
    _stream: cpal::Stream,
}

/// Records the system (or a named) microphone into a WAV artifact.
///
/// `acquire` opens the device and starts metering straight away; samples are only kept between
/// `start_recording` and `stop_recording`.
pub struct MicrophoneCapture {
    input: Mutex<Option<ActiveInput>>,
    recording: Arc<AtomicBool>,
    buffer: Arc<Mutex<AudioBuffer>>,
    preferred_device: Option<String>,
}

impl MicrophoneCapture {
    pub fn new(preferred_device: Option<String>) -> Self {
        Self {
            input: Mutex::new(None),
            recording: Arc::new(AtomicBool::new(false)),
            buffer: Arc::new(Mutex::new(AudioBuffer::new(16_000, 1))),
            preferred_device: preferred_device
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
        }
    }

    pub fn list_input_devices() -> Result<Vec<String>, CaptureError> {
        let host = cpal::default_host();
        let devices = host
            .input_devices()
            .map_err(|e| CaptureError::Device(e.to_string()))?
            .map(|device| device_display_name(&device))
            .collect::<Vec<_>>();
        Ok(devices)
    }

    fn pick_input_device(&self, host: &cpal::Host) -> Option<cpal::Device> {
        if let Some(name) = self.preferred_device.as_deref() {
            if let Ok(mut devices) = host.input_devices() {
                if let Some(device) = devices.find(|d| device_display_name(d) == name) {
                    return Some(device);
                }
            }
            tracing::warn!(
                "Preferred input device '{}' not found, falling back to default",
                name
            );
        }

        let default_device = host.default_input_device()?;
        let default_name = device_display_name(&default_device);
        if !looks_like_loopback(&default_name) {
            return Some(default_device);
        }

        tracing::warn!(
            "Default device '{}' looks like loopback, trying to pick a microphone input",
            default_name
        );
        if let Ok(mut devices) = host.input_devices() {
            if let Some(alternative) = devices.find(|d| !looks_like_loopback(&device_display_name(d))) {
                return Some(alternative);
            }
        }

        Some(default_device)
    }
}

#[async_trait]
impl MediaCapture for MicrophoneCapture {
    async fn acquire(&self) -> Result<MediaStream, CaptureError> {
        let host = cpal::default_host();
        let device = self
            .pick_input_device(&host)
            .ok_or_else(|| CaptureError::PermissionDenied("No input device available".into()))?;
        let device_name = device_display_name(&device);

        let config = device
            .default_input_config()
            .map_err(|e| CaptureError::PermissionDenied(e.to_string()))?;
        {
            let mut guard = self
                .buffer
                .lock()
                .map_err(|e| CaptureError::Device(e.to_string()))?;
            *guard = AudioBuffer::new(config.sample_rate(), config.channels());
        }

        let level = AudioLevel::new();
        let buffer = self.buffer.clone();
        let recording = self.recording.clone();
        let meter = level.clone();
        let err_fn = |err| error!("an error occurred on input stream: {}", err);

        let stream = match config.sample_format() {
            cpal::SampleFormat::I16 => device.build_input_stream(
                &config.into(),
                move |data: &[i16], _: &_| {
                    meter.set(level_i16(data));
                    if recording.load(Ordering::Relaxed) {
                        if let Ok(mut guard) = buffer.lock() {
                            guard.append(data);
                        }
                    }
                },
                err_fn,
                None,
            ),
            cpal::SampleFormat::F32 => device.build_input_stream(
                &config.into(),
                move |data: &[f32], _: &_| {
                    meter.set(level_f32(data));
                    if recording.load(Ordering::Relaxed) {
                        if let Ok(mut guard) = buffer.lock() {
                            guard.append_f32(data);
                        }
                    }
                },
                err_fn,
                None,
            ),
            other => {
                return Err(CaptureError::Device(format!(
                    "Unsupported sample format: {:?}",
                    other
                )))
            }
        }
        .map_err(|e| CaptureError::PermissionDenied(e.to_string()))?;

        stream
            .play()
            .map_err(|e| CaptureError::Device(e.to_string()))?;

        let stream_id = Uuid::new_v4().to_string();
        info!("Input device acquired: {} ({})", device_name, stream_id);

        let mut input = self
            .input
            .lock()
            .map_err(|e| CaptureError::Device(e.to_string()))?;
        *input = Some(ActiveInput {
            stream_id: stream_id.clone(),
            _stream: stream,
        });

        Ok(MediaStream {
            id: stream_id,
            device_name,
            level,
        })
    }

    async fn start_recording(&self, stream: &MediaStream) -> Result<RecordingHandle, CaptureError> {
        {
            let input = self
                .input
                .lock()
                .map_err(|e| CaptureError::Device(e.to_string()))?;
            match input.as_ref() {
                Some(active) if active.stream_id == stream.id => {}
                _ => return Err(CaptureError::Device("Stream is no longer open".into())),
            }
        }

        if self.recording.load(Ordering::Relaxed) {
            return Err(CaptureError::AlreadyRecording);
        }

        if let Ok(mut guard) = self.buffer.lock() {
            guard.clear();
        }
        self.recording.store(true, Ordering::Relaxed);

        info!("Microphone recording started on {}", stream.device_name);
        Ok(RecordingHandle {
            id: Uuid::new_v4().to_string(),
            stream_id: stream.id.clone(),
            started_at: Utc::now(),
        })
    }

    async fn stop_recording(&self, handle: RecordingHandle) -> Result<Artifact, CaptureError> {
        if !self.recording.swap(false, Ordering::Relaxed) {
            return Err(CaptureError::NotRecording);
        }

        let audio = {
            let mut input = self
                .input
                .lock()
                .map_err(|e| CaptureError::Device(e.to_string()))?;
            input.take();

            let mut guard = self
                .buffer
                .lock()
                .map_err(|e| CaptureError::Device(e.to_string()))?;
            let out = guard.clone();
            guard.clear();
            out
        };

        let bytes = encode_wav(&audio)?;
        info!(
            "Microphone recording stopped: {:.1}s, {} bytes",
            audio.duration_secs(),
            bytes.len()
        );

        Ok(Artifact {
            bytes,
            mime_type: WAV_MIME.to_string(),
            file_name: format!("interview-{}.wav", handle.id),
            duration_secs: audio.duration_secs(),
            recorded_at: handle.started_at,
        })
    }

    fn name(&self) -> &str {
        "Microphone"
    }
}

fn device_display_name(device: &cpal::Device) -> String {
    device
        .name()
        .or_else(|_| device.description().map(|d| d.name().to_string()))
        .unwrap_or_else(|_| "Unknown input".to_string())
}

fn looks_like_loopback(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    let patterns = ["stereo mix", "what u hear", "wave out", "loopback", "monitor"];
    patterns.iter().any(|p| lower.contains(p))
}
