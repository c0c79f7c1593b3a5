//! Запись звука и распознавание песни.
//!
//! Источник -> `Recorder` (поток кусков до остановки или таймаута) -> WAV -> `POST /match`.

#[cfg(feature = "microphone")]
pub mod microphone;
pub mod recorder;
pub mod source;
pub mod wav;

pub use recorder::{Recorder, Recording, RecordingQuality, StopReason};
pub use source::{negotiate_format, AudioSource, SampleFormat, StreamSpec, WavFileSource};

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::AppResult;
use crate::models::MatchOutcome;
use crate::services::ApiClient;

/// Итог одной попытки распознавания.
#[derive(Debug, Clone)]
pub struct Identification {
    pub quality: RecordingQuality,
    pub stopped_by: StopReason,
    pub wav: Vec<u8>,
    pub outcome: MatchOutcome,
}

/// Записывает, собирает WAV и отправляет на сопоставление.
pub async fn identify<S: AudioSource>(
    api: &ApiClient,
    recorder: &mut Recorder<S>,
    stop: CancellationToken,
) -> AppResult<Identification> {
    let recording = recorder.record(stop).await?;
    let wav = recording.to_wav()?;
    info!(
        "Recording converted: {} Hz, {} ch, {:.1}s",
        recording.spec.sample_rate,
        recording.spec.channels,
        recording.elapsed.as_secs_f32()
    );

    let outcome = api.match_song(wav.clone()).await?;

    Ok(Identification {
        quality: recording.quality(),
        stopped_by: recording.stopped_by,
        wav,
        outcome,
    })
}
