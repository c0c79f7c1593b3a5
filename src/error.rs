//! Таксономия ошибок клиента.
//!
//! Все ошибки привязаны к конкретному действию пользователя и восстановимы повтором:
//! сетевые (a), авторизационные (b), валидационные (c), устройства записи (d) и платежные (e).

use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// Сеть недоступна или запрос оборвался. Автоматических повторов нет.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Бэкенд ответил ошибкой (не 401).
    #[error("{message}")]
    Api { status: u16, message: String },

    /// Сессия истекла или токен невалиден (HTTP 401).
    #[error("Session expired. Please sign in again.")]
    Unauthorized,

    /// Операция требует входа, а сессии нет (проверка до сетевого вызова).
    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("Admin access required")]
    Forbidden,

    /// Ошибка формы или лимитов корзины, поймана до любого сетевого вызова.
    #[error("{0}")]
    Validation(String),

    /// Ответ бэкенда не прошел проверку схемы.
    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Страница билетов не создалась (для BOOKABLE концерт уже удален).
    #[error("Failed to create ticket page: {0}")]
    TicketPage(String),

    #[error(transparent)]
    Recording(#[from] RecordingError),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Failed to generate tickets PDF: {0}")]
    Receipt(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Ошибки захвата звука и конвертации в WAV.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RecordingError {
    #[error("No supported audio capture format found")]
    NoSupportedFormat,

    #[error("Microphone access denied. Please allow microphone access and try again.")]
    PermissionDenied,

    #[error("Audio device error: {0}")]
    Device(String),

    #[error("A recording is already in progress")]
    AlreadyRecording,

    #[error("Failed to convert audio format: {0}")]
    ConversionFailed(String),
}

/// Ошибки платежного потока. Серверное состояние клиент не откатывает.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PaymentError {
    #[error("Failed to initialize payment: {0}")]
    OrderCreation(String),

    #[error("Payment cancelled. Please try again.")]
    Cancelled,

    #[error("Payment verification failed. Please contact support.")]
    VerificationFailed(String),

    #[error("Payment widget error: {0}")]
    Widget(String),
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(msg) => msg.to_string(),
                    None => format!("Invalid value for {}", field),
                })
            })
            .collect();
        messages.sort();
        AppError::Validation(messages.join("; "))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::InvalidResponse(e.to_string())
    }
}

impl AppError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, AppError::Unauthorized)
    }

    /// Текст для всплывающего уведомления.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Network(_) => "Unable to connect to the server. Please try again later.".to_string(),
            other => other.to_string(),
        }
    }
}
