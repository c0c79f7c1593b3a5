use reqwest::multipart::{Form, Part};
use reqwest::Method;
use tracing::info;

use super::ApiClient;
use crate::error::AppResult;
use crate::models::song::RawMatchResponse;
use crate::models::MatchOutcome;

pub const RECORDING_FILE_NAME: &str = "recording.wav";

impl ApiClient {
    /// Отправляет WAV на `/match` полем `file`.
    ///
    /// Ошибочный HTTP-статус становится `AppError::Api` с сообщением сервера,
    /// так же как `{"status":"error"}` в успешном ответе.
    pub async fn match_song(&self, wav: Vec<u8>) -> AppResult<MatchOutcome> {
        info!("Submitting {} bytes for matching", wav.len());

        let part = Part::bytes(wav)
            .file_name(RECORDING_FILE_NAME)
            .mime_str("audio/wav")?;
        let form = Form::new().part("file", part);

        let raw: RawMatchResponse = self
            .send_json(self.request(Method::POST, "/match", None).multipart(form))
            .await?;

        let outcome = MatchOutcome::try_from(raw)?;
        match &outcome {
            MatchOutcome::Matched(song) => info!("Matched: {} - {}", song.title, song.artist),
            MatchOutcome::NoMatch => info!("No matching song found"),
        }
        Ok(outcome)
    }
}
