use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::source::{decode_channels, negotiate_format, AudioSource, StreamSpec};
use super::wav;
use crate::config::{RecordingConfig, MAX_RECORDING_SECONDS};
use crate::error::RecordingError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Manual,
    Timeout,
    SourceEnded,
}

/// Что уходит в WAV: частота, каналы, 16 бит.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordingQuality {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

/// Собранная запись: сырой поток одним куском.
#[derive(Debug, Clone)]
pub struct Recording {
    pub spec: StreamSpec,
    pub data: Vec<u8>,
    pub elapsed: Duration,
    pub stopped_by: StopReason,
}

impl Recording {
    pub fn quality(&self) -> RecordingQuality {
        RecordingQuality {
            sample_rate: self.spec.sample_rate,
            channels: self.spec.channels,
            bits_per_sample: wav::BITS_PER_SAMPLE,
        }
    }

    pub fn to_wav(&self) -> Result<Vec<u8>, RecordingError> {
        let channels = decode_channels(&self.data, &self.spec)?;
        Ok(wav::encode_wav(&channels, self.spec.sample_rate))
    }
}

/// Сколько байт потока помещается в `max_duration` (целыми кадрами).
fn content_limit(max_duration: Duration, spec: &StreamSpec) -> usize {
    let frames = (max_duration.as_secs_f64() * f64::from(spec.sample_rate)) as usize;
    frames * spec.frame_len()
}

/// Освобождает источник при любом выходе из записи.
struct Release<'a, S: AudioSource> {
    source: &'a mut S,
}

impl<S: AudioSource> Drop for Release<'_, S> {
    fn drop(&mut self) {
        self.source.stop();
        debug!("Audio source released");
    }
}

pub struct Recorder<S> {
    source: S,
    max_duration: Duration,
}

impl<S: AudioSource> Recorder<S> {
    pub fn new(source: S, config: &RecordingConfig) -> Self {
        let seconds = config.max_duration_seconds.clamp(1, MAX_RECORDING_SECONDS);
        Self::with_max_duration(source, Duration::from_secs(seconds))
    }

    pub fn with_max_duration(source: S, max_duration: Duration) -> Self {
        let cap = Duration::from_secs(MAX_RECORDING_SECONDS);
        Self {
            source,
            max_duration: max_duration.min(cap),
        }
    }

    pub fn max_duration(&self) -> Duration {
        self.max_duration
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Пишет до ручной остановки (`stop.cancel()`), таймаута или конца потока.
    pub async fn record(&mut self, stop: CancellationToken) -> Result<Recording, RecordingError> {
        let format = negotiate_format(&self.source.supported_formats())?;
        let max_duration = self.max_duration;
        let (spec, mut chunks) = self.source.start(format)?;
        let _release = Release {
            source: &mut self.source,
        };
        info!(
            "Recording started: {:?}, {} Hz, {} ch, up to {:?}",
            spec.format, spec.sample_rate, spec.channels, max_duration
        );

        // Источник может отдавать быстрее реального времени, поэтому предел еще и по объему
        let max_bytes = content_limit(max_duration, &spec);
        let started = Instant::now();
        let deadline = tokio::time::sleep(max_duration);
        tokio::pin!(deadline);

        let mut data = Vec::new();
        let stopped_by = loop {
            tokio::select! {
                chunk = chunks.recv() => match chunk {
                    Some(Ok(bytes)) => {
                        data.extend_from_slice(&bytes);
                        if data.len() >= max_bytes {
                            break StopReason::Timeout;
                        }
                    }
                    Some(Err(e)) => {
                        warn!("Audio source failed mid-recording: {}", e);
                        return Err(e);
                    }
                    None => break StopReason::SourceEnded,
                },
                _ = stop.cancelled() => break StopReason::Manual,
                _ = &mut deadline => break StopReason::Timeout,
            }
        };

        // Забираем то, что источник успел отдать до остановки
        while let Ok(chunk) = chunks.try_recv() {
            match chunk {
                Ok(bytes) => data.extend_from_slice(&bytes),
                Err(e) => warn!("Ignoring audio error after stop: {}", e),
            }
        }

        if data.len() > max_bytes {
            debug!("Trimming {} bytes past the recording limit", data.len() - max_bytes);
            data.truncate(max_bytes);
        }

        let elapsed = started.elapsed();
        info!(
            "Recording stopped ({:?}) after {:.1}s, {} bytes",
            stopped_by,
            elapsed.as_secs_f32(),
            data.len()
        );
        Ok(Recording {
            spec,
            data,
            elapsed,
            stopped_by,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::source::{AudioChunk, SampleFormat};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    /// Источник, который держит поток открытым, пока тест не закроет его сам.
    struct LiveSource {
        formats: Vec<SampleFormat>,
        chunks: Vec<AudioChunk>,
        keep: Option<mpsc::UnboundedSender<AudioChunk>>,
        stops: Arc<AtomicUsize>,
    }

    impl LiveSource {
        fn new(formats: Vec<SampleFormat>, chunks: Vec<AudioChunk>) -> Self {
            Self {
                formats,
                chunks,
                keep: None,
                stops: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl AudioSource for LiveSource {
        fn supported_formats(&self) -> Vec<SampleFormat> {
            self.formats.clone()
        }

        fn start(
            &mut self,
            format: SampleFormat,
        ) -> Result<(StreamSpec, mpsc::UnboundedReceiver<AudioChunk>), RecordingError> {
            let (tx, rx) = mpsc::unbounded_channel();
            for chunk in self.chunks.drain(..) {
                tx.send(chunk).unwrap();
            }
            self.keep = Some(tx);
            Ok((StreamSpec { format, channels: 1, sample_rate: 8000 }, rx))
        }

        fn stop(&mut self) {
            self.keep = None;
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn i16_chunk(samples: &[i16]) -> AudioChunk {
        Ok(samples.iter().flat_map(|s| s.to_le_bytes()).collect())
    }

    #[tokio::test]
    async fn timeout_stops_and_releases_source() {
        let source = LiveSource::new(vec![SampleFormat::I16], vec![i16_chunk(&[1, 2]), Ok(Vec::new())]);
        let stops = source.stops.clone();
        let mut recorder = Recorder::with_max_duration(source, Duration::from_millis(50));

        let recording = recorder.record(CancellationToken::new()).await.unwrap();
        assert_eq!(recording.stopped_by, StopReason::Timeout);
        assert_eq!(recording.data.len(), 4);
        assert_eq!(stops.load(Ordering::SeqCst), 1);

        let wav = recording.to_wav().unwrap();
        assert_eq!(wav.len(), wav::HEADER_LEN + 4);
    }

    #[tokio::test]
    async fn manual_stop_wins_over_deadline() {
        let source = LiveSource::new(vec![SampleFormat::I16], vec![i16_chunk(&[7])]);
        let mut recorder = Recorder::with_max_duration(source, Duration::from_secs(30));
        let stop = CancellationToken::new();
        stop.cancel();

        let recording = recorder.record(stop).await.unwrap();
        assert_eq!(recording.stopped_by, StopReason::Manual);
        assert_eq!(recording.data.len(), 2);
    }

    #[tokio::test]
    async fn unsupported_source_fails_before_start() {
        let source = LiveSource::new(Vec::new(), Vec::new());
        let stops = source.stops.clone();
        let mut recorder = Recorder::with_max_duration(source, Duration::from_secs(1));

        let err = recorder.record(CancellationToken::new()).await.unwrap_err();
        assert_eq!(err, RecordingError::NoSupportedFormat);
        assert_eq!(stops.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn device_error_releases_source() {
        let source = LiveSource::new(
            vec![SampleFormat::F32],
            vec![Err(RecordingError::Device("unplugged".into()))],
        );
        let stops = source.stops.clone();
        let mut recorder = Recorder::with_max_duration(source, Duration::from_secs(1));

        assert!(recorder.record(CancellationToken::new()).await.is_err());
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fast_source_is_cut_at_the_limit() {
        use crate::audio::source::WavFileSource;

        let source = WavFileSource::from_samples(1, 8000, vec![0.1; 8000 * 60]);
        let mut recorder = Recorder::with_max_duration(source, Duration::from_secs(30));

        let recording = recorder.record(CancellationToken::new()).await.unwrap();
        assert_eq!(recording.stopped_by, StopReason::Timeout);
        assert_eq!(recording.data.len(), 8000 * 30 * recording.spec.frame_len());

        let wav = recording.to_wav().unwrap();
        assert_eq!(wav.len(), wav::HEADER_LEN + 8000 * 30 * 2);
    }

    #[test]
    fn duration_never_exceeds_cap() {
        let source = LiveSource::new(Vec::new(), Vec::new());
        let recorder = Recorder::with_max_duration(source, Duration::from_secs(120));
        assert_eq!(recorder.max_duration(), Duration::from_secs(MAX_RECORDING_SECONDS));
    }
}
