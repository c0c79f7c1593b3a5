//! Системный микрофон через cpal (фича `microphone`).

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SizedSample, Stream, StreamConfig, SupportedStreamConfigRange};
use tokio::sync::mpsc;
use tracing::{error, info};

use super::source::{AudioChunk, AudioSource, SampleFormat, StreamSpec};
use crate::error::RecordingError;

pub struct MicrophoneSource {
    device: cpal::Device,
    stream: Option<Stream>,
}

fn to_format(format: cpal::SampleFormat) -> Option<SampleFormat> {
    match format {
        cpal::SampleFormat::F32 => Some(SampleFormat::F32),
        cpal::SampleFormat::I16 => Some(SampleFormat::I16),
        cpal::SampleFormat::U8 => Some(SampleFormat::U8),
        _ => None,
    }
}

fn build_error(e: cpal::BuildStreamError) -> RecordingError {
    match e {
        cpal::BuildStreamError::DeviceNotAvailable => RecordingError::PermissionDenied,
        other => RecordingError::Device(other.to_string()),
    }
}

impl MicrophoneSource {
    pub fn default_input() -> Result<Self, RecordingError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| RecordingError::Device("No input device available".to_string()))?;
        info!("Using input device: {}", device.name().unwrap_or_else(|_| "unknown".to_string()));
        Ok(Self { device, stream: None })
    }

    fn configs(&self) -> Vec<SupportedStreamConfigRange> {
        match self.device.supported_input_configs() {
            Ok(configs) => configs.collect(),
            Err(e) => {
                error!("Failed to query input configs: {}", e);
                Vec::new()
            }
        }
    }

    fn open<T, F>(
        &self,
        config: &StreamConfig,
        tx: mpsc::UnboundedSender<AudioChunk>,
        encode: F,
    ) -> Result<Stream, RecordingError>
    where
        T: SizedSample,
        F: Fn(&[T]) -> Vec<u8> + Send + 'static,
    {
        let err_tx = tx.clone();
        self.device
            .build_input_stream(
                config,
                move |data: &[T], _: &cpal::InputCallbackInfo| {
                    let _ = tx.send(Ok(encode(data)));
                },
                move |e| {
                    let _ = err_tx.send(Err(RecordingError::Device(e.to_string())));
                },
                None,
            )
            .map_err(build_error)
    }
}

impl AudioSource for MicrophoneSource {
    fn supported_formats(&self) -> Vec<SampleFormat> {
        self.configs()
            .iter()
            .filter_map(|c| to_format(c.sample_format()))
            .collect()
    }

    fn start(
        &mut self,
        format: SampleFormat,
    ) -> Result<(StreamSpec, mpsc::UnboundedReceiver<AudioChunk>), RecordingError> {
        if self.stream.is_some() {
            return Err(RecordingError::AlreadyRecording);
        }

        let supported = self
            .configs()
            .into_iter()
            .find(|c| to_format(c.sample_format()) == Some(format))
            .ok_or(RecordingError::NoSupportedFormat)?
            .with_max_sample_rate();
        let config: StreamConfig = supported.config();

        let (tx, rx) = mpsc::unbounded_channel();
        let stream = match format {
            SampleFormat::F32 => self.open::<f32, _>(&config, tx, |data| {
                data.iter().flat_map(|s| s.to_le_bytes()).collect()
            })?,
            SampleFormat::I16 => self.open::<i16, _>(&config, tx, |data| {
                data.iter().flat_map(|s| s.to_le_bytes()).collect()
            })?,
            SampleFormat::U8 => self.open::<u8, _>(&config, tx, |data| data.to_vec())?,
        };
        stream
            .play()
            .map_err(|e| RecordingError::Device(e.to_string()))?;
        self.stream = Some(stream);

        let spec = StreamSpec {
            format,
            channels: config.channels,
            sample_rate: config.sample_rate.0,
        };
        info!("Microphone opened: {:?}", spec);
        Ok((spec, rx))
    }

    fn stop(&mut self) {
        // Drop потока закрывает устройство и канал
        if self.stream.take().is_some() {
            info!("Microphone released");
        }
    }
}
