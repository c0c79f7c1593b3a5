use std::path::Path;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::error::RecordingError;

/// Форматы захвата в порядке предпочтения.
pub const PREFERRED_FORMATS: [SampleFormat; 3] = [SampleFormat::F32, SampleFormat::I16, SampleFormat::U8];

/// Кодировка сэмплов в потоке от источника (little endian, каналы чередуются).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleFormat {
    F32,
    I16,
    U8,
}

impl SampleFormat {
    pub fn bytes_per_sample(self) -> usize {
        match self {
            SampleFormat::F32 => 4,
            SampleFormat::I16 => 2,
            SampleFormat::U8 => 1,
        }
    }

    pub fn encode(self, sample: f32, out: &mut Vec<u8>) {
        let s = sample.clamp(-1.0, 1.0);
        match self {
            SampleFormat::F32 => out.extend_from_slice(&s.to_le_bytes()),
            SampleFormat::I16 => out.extend_from_slice(&((s * 32767.0) as i16).to_le_bytes()),
            SampleFormat::U8 => out.push(((s * 127.0) + 128.0) as u8),
        }
    }

    /// `bytes` ровно `bytes_per_sample()` длиной.
    fn decode(self, bytes: &[u8]) -> f32 {
        match (self, bytes) {
            (SampleFormat::F32, [a, b, c, d]) => f32::from_le_bytes([*a, *b, *c, *d]),
            (SampleFormat::I16, [a, b]) => i16::from_le_bytes([*a, *b]) as f32 / 32768.0,
            (SampleFormat::U8, [a]) => (*a as f32 - 128.0) / 128.0,
            _ => 0.0,
        }
    }
}

/// Параметры открытого потока.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSpec {
    pub format: SampleFormat,
    pub channels: u16,
    pub sample_rate: u32,
}

impl StreamSpec {
    pub fn frame_len(&self) -> usize {
        self.format.bytes_per_sample() * self.channels as usize
    }
}

/// Один кусок данных от источника. Ошибка в потоке завершает запись.
pub type AudioChunk = Result<Vec<u8>, RecordingError>;

/// Живой источник звука.
///
/// `start` открывает устройство в выбранном формате и отдает поток кусков.
/// `stop` освобождает устройство, повторный вызов ничего не делает.
pub trait AudioSource {
    fn supported_formats(&self) -> Vec<SampleFormat>;

    fn start(
        &mut self,
        format: SampleFormat,
    ) -> Result<(StreamSpec, mpsc::UnboundedReceiver<AudioChunk>), RecordingError>;

    fn stop(&mut self);
}

/// Первый поддерживаемый формат из списка предпочтений.
pub fn negotiate_format(supported: &[SampleFormat]) -> Result<SampleFormat, RecordingError> {
    PREFERRED_FORMATS
        .into_iter()
        .find(|f| supported.contains(f))
        .ok_or(RecordingError::NoSupportedFormat)
}

/// Раскладывает сырой поток по каналам во float.
pub fn decode_channels(blob: &[u8], spec: &StreamSpec) -> Result<Vec<Vec<f32>>, RecordingError> {
    if spec.channels == 0 {
        return Err(RecordingError::ConversionFailed("stream has no channels".to_string()));
    }
    let frame_len = spec.frame_len();
    if blob.len() % frame_len != 0 {
        return Err(RecordingError::ConversionFailed(format!(
            "{} bytes is not a whole number of {}-byte frames",
            blob.len(),
            frame_len
        )));
    }

    let width = spec.format.bytes_per_sample();
    let frames = blob.len() / frame_len;
    let mut channels = vec![Vec::with_capacity(frames); spec.channels as usize];
    for frame in blob.chunks_exact(frame_len) {
        for (channel, sample) in channels.iter_mut().zip(frame.chunks_exact(width)) {
            channel.push(spec.format.decode(sample));
        }
    }
    Ok(channels)
}

/// Источник из готового WAV-файла. Весь файл отдается кусками сразу, затем поток закрывается.
pub struct WavFileSource {
    channels: u16,
    sample_rate: u32,
    samples: Vec<f32>,
    chunk_frames: usize,
    started: bool,
}

impl WavFileSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RecordingError> {
        let path = path.as_ref();
        let reader = hound::WavReader::open(path).map_err(|e| match e {
            hound::Error::IoError(io) if io.kind() == std::io::ErrorKind::PermissionDenied => {
                RecordingError::PermissionDenied
            }
            other => RecordingError::Device(format!("{}: {}", path.display(), other)),
        })?;

        let spec = reader.spec();
        let samples = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<Result<Vec<_>, _>>(),
            hound::SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<Result<Vec<_>, _>>()
            }
        }
        .map_err(|e| RecordingError::ConversionFailed(e.to_string()))?;

        info!(
            "Loaded {} ({} Hz, {} ch, {} samples)",
            path.display(),
            spec.sample_rate,
            spec.channels,
            samples.len()
        );
        Ok(Self::from_samples(spec.channels, spec.sample_rate, samples))
    }

    /// Чередующиеся float-сэмплы.
    pub fn from_samples(channels: u16, sample_rate: u32, samples: Vec<f32>) -> Self {
        Self {
            channels,
            sample_rate,
            samples,
            chunk_frames: 4096,
            started: false,
        }
    }
}

impl AudioSource for WavFileSource {
    fn supported_formats(&self) -> Vec<SampleFormat> {
        PREFERRED_FORMATS.to_vec()
    }

    fn start(
        &mut self,
        format: SampleFormat,
    ) -> Result<(StreamSpec, mpsc::UnboundedReceiver<AudioChunk>), RecordingError> {
        if self.started {
            return Err(RecordingError::AlreadyRecording);
        }
        let spec = StreamSpec {
            format,
            channels: self.channels,
            sample_rate: self.sample_rate,
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let chunk_samples = (self.chunk_frames * self.channels.max(1) as usize).max(1);
        for chunk in self.samples.chunks(chunk_samples) {
            let mut bytes = Vec::with_capacity(chunk.len() * format.bytes_per_sample());
            for sample in chunk {
                format.encode(*sample, &mut bytes);
            }
            // Получатель жив, он только что создан
            let _ = tx.send(Ok(bytes));
        }
        self.started = true;
        debug!("WAV file source started as {:?}", spec);
        Ok((spec, rx))
    }

    fn stop(&mut self) {
        if self.started {
            self.started = false;
            debug!("WAV file source released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negotiation_walks_preference_list() {
        assert_eq!(negotiate_format(&[SampleFormat::U8, SampleFormat::I16]), Ok(SampleFormat::I16));
        assert_eq!(negotiate_format(&[SampleFormat::U8]), Ok(SampleFormat::U8));
        assert_eq!(negotiate_format(&[]), Err(RecordingError::NoSupportedFormat));
    }

    #[test]
    fn decode_splits_interleaved_frames() {
        let spec = StreamSpec { format: SampleFormat::I16, channels: 2, sample_rate: 8000 };
        let mut blob = Vec::new();
        for s in [0.5f32, -0.5, 0.25, -0.25] {
            SampleFormat::I16.encode(s, &mut blob);
        }
        let channels = decode_channels(&blob, &spec).unwrap();
        assert_eq!(channels.len(), 2);
        assert_eq!(channels[0].len(), 2);
        assert!((channels[0][1] - 0.25).abs() < 1e-3);
        assert!((channels[1][0] + 0.5).abs() < 1e-3);
    }

    #[test]
    fn partial_frame_is_a_conversion_error() {
        let spec = StreamSpec { format: SampleFormat::F32, channels: 1, sample_rate: 8000 };
        assert!(matches!(
            decode_channels(&[0, 0, 0], &spec),
            Err(RecordingError::ConversionFailed(_))
        ));
    }

    #[tokio::test]
    async fn file_source_streams_all_samples_then_closes() {
        let mut source = WavFileSource::from_samples(1, 8000, vec![0.1; 10_000]);
        let (spec, mut rx) = source.start(SampleFormat::U8).unwrap();
        assert_eq!(spec.format, SampleFormat::U8);

        let mut total = 0;
        while let Some(chunk) = rx.recv().await {
            total += chunk.unwrap().len();
        }
        assert_eq!(total, 10_000);
        assert_eq!(source.start(SampleFormat::U8).unwrap_err(), RecordingError::AlreadyRecording);
    }
}
