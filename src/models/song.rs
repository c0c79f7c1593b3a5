use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppError;

// --- Распознавание ---

/// Найденная песня.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub song_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    Matched(MatchResult),
    NoMatch,
}

/// Сырой ответ `POST /match`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawMatchResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, rename = "match")]
    pub matched: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub song_url: Option<String>,
}

impl TryFrom<RawMatchResponse> for MatchOutcome {
    type Error = AppError;

    fn try_from(raw: RawMatchResponse) -> Result<Self, Self::Error> {
        if raw.status.as_deref() == Some("error") {
            let message = raw.message.unwrap_or_else(|| "Failed to match song".to_string());
            return Err(AppError::Api { status: 200, message });
        }
        if raw.matched == Some(false) {
            return Ok(MatchOutcome::NoMatch);
        }

        let title = raw
            .title
            .ok_or_else(|| AppError::InvalidResponse("match response missing title".to_string()))?;
        let artist = raw
            .artist
            .ok_or_else(|| AppError::InvalidResponse("match response missing artist".to_string()))?;

        Ok(MatchOutcome::Matched(MatchResult {
            title,
            artist,
            album: raw.album,
            cover_url: raw.cover_url,
            song_url: raw.song_url,
        }))
    }
}

// --- Чарты ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartType {
    Global,
    India,
    Viral,
    Punjabi,
}

impl ChartType {
    pub const ALL: [ChartType; 4] = [ChartType::Global, ChartType::India, ChartType::Viral, ChartType::Punjabi];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChartType::Global => "global",
            ChartType::India => "india",
            ChartType::Viral => "viral",
            ChartType::Punjabi => "punjabi",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ChartType::Global => "Global Top 50",
            ChartType::India => "India Top 50",
            ChartType::Viral => "Viral Hits",
            ChartType::Punjabi => "Punjabi Hits",
        }
    }
}

impl std::str::FromStr for ChartType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChartType::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown chart '{}', expected one of: global, india, viral, punjabi", s))
    }
}

pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const PLACEHOLDER_IMAGE: &str = "https://via.placeholder.com/160";
pub const NO_LINK: &str = "#";

/// Песня чарта после нормализации алиасов полей.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSong {
    pub title: String,
    pub artist: String,
    pub image: String,
    pub link: String,
}

impl ChartSong {
    pub fn from_value(song: &Value) -> Self {
        let text = |keys: &[&str]| {
            keys.iter()
                .filter_map(|k| song.get(*k).and_then(Value::as_str))
                .find(|s| !s.is_empty())
                .map(str::to_string)
        };

        let artist = text(&["artist"]).or_else(|| {
            song.get("artists")
                .and_then(|a| a.get(0))
                .and_then(|first| first.get("name"))
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        });

        ChartSong {
            title: text(&["title", "name"]).unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
            artist: artist.unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
            image: text(&["image", "albumArt", "coverUrl"]).unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string()),
            link: text(&["spotifyLink", "externalUrl", "url"]).unwrap_or_else(|| NO_LINK.to_string()),
        }
    }

    /// Бэкенд отдает либо массив, либо объект с массивом внутри.
    pub fn list_from_value(body: &Value) -> Result<Vec<Self>, AppError> {
        let songs = match body {
            Value::Array(items) => items,
            Value::Object(map) => map
                .values()
                .find_map(Value::as_array)
                .ok_or_else(|| AppError::InvalidResponse("No chart data available".to_string()))?,
            _ => return Err(AppError::InvalidResponse("No chart data available".to_string())),
        };
        Ok(songs.iter().map(ChartSong::from_value).collect())
    }
}

// --- Проверка билетов на входе ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TicketStatus {
    Valid,
    Used,
    Invalid,
    /// Ответ mark-ticket-used
    Success,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketVerification {
    pub status: TicketStatus,
    #[serde(default)]
    pub ticket_code: Option<String>,
    #[serde(default)]
    pub concert_id: Option<String>,
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub ticket_type: Option<String>,
    #[serde(default)]
    pub issued_at: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TicketCodeRequest<'a> {
    pub ticket_code: &'a str,
}
