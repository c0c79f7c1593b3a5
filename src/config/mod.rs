use serde::Deserialize;

// Главная структура конфигурации - контейнер для всех настроек
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub recording: RecordingConfig,
    pub callback: CallbackConfig,
}

// Настройки приложения
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub environment: String,
    pub rust_log: String,
    /// "pretty" или "json"
    pub log_format: String,
}

// Настройки бэкенда
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
    /// Смещение часового пояса в минутах для заголовка X-Timezone-Offset (IST = -330)
    pub timezone_offset_minutes: i32,
}

// Настройки локального хранилища
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub database_url: String,
    pub pool_size: u32,
    /// JSON-файл с базовым списком концертов (необязательно)
    pub baseline_catalog: Option<String>,
}

// Настройки записи звука
#[derive(Debug, Clone, Deserialize)]
pub struct RecordingConfig {
    pub max_duration_seconds: u64,
}

// Настройки локального callback-сервера (OAuth, платежный виджет)
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackConfig {
    pub host: String,
    pub port: u16,
    pub wait_timeout_seconds: u64,
}

/// Жесткий предел длительности записи.
pub const MAX_RECORDING_SECONDS: u64 = 30;

impl Config {
    /// Собирает конфигурацию: значения по умолчанию, затем переменные окружения `VERITAS__SECTION__KEY`.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let rust_log = std::env::var("RUST_LOG")
            .unwrap_or_else(|_| "veritas_client=debug,tower_http=info".to_string());

        let config: Config = config::Config::builder()
            .set_default("app.environment", "development")?
            .set_default("app.rust_log", rust_log)?
            .set_default("app.log_format", "pretty")?
            .set_default("api.base_url", "http://localhost:8080")?
            .set_default("api.timeout_seconds", 30)?
            .set_default("api.timezone_offset_minutes", -330)?
            .set_default("storage.database_url", "sqlite://veritas.db")?
            .set_default("storage.pool_size", 4)?
            .set_default("recording.max_duration_seconds", MAX_RECORDING_SECONDS)?
            .set_default("callback.host", "127.0.0.1")?
            .set_default("callback.port", 3000)?
            .set_default("callback.wait_timeout_seconds", 300)?
            .add_source(
                config::Environment::with_prefix("VERITAS")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()
    }

    fn validate(mut self) -> Result<Self, config::ConfigError> {
        if self.api.base_url.trim().is_empty() {
            return Err(config::ConfigError::Message("api.base_url must be set".to_string()));
        }
        self.api.base_url = self.api.base_url.trim_end_matches('/').to_string();

        // Запись никогда не длиннее 30 секунд
        if self.recording.max_duration_seconds == 0
            || self.recording.max_duration_seconds > MAX_RECORDING_SECONDS
        {
            self.recording.max_duration_seconds = MAX_RECORDING_SECONDS;
        }
        Ok(self)
    }

    /// Конфигурация для тестов: бэкенд по указанному адресу, хранилище в памяти.
    pub fn for_backend(base_url: &str) -> Self {
        Config {
            app: AppConfig {
                environment: "test".to_string(),
                rust_log: "veritas_client=debug".to_string(),
                log_format: "pretty".to_string(),
            },
            api: ApiConfig {
                base_url: base_url.trim_end_matches('/').to_string(),
                timeout_seconds: 5,
                timezone_offset_minutes: -330,
            },
            storage: StorageConfig {
                database_url: "sqlite::memory:".to_string(),
                pool_size: 1,
                baseline_catalog: None,
            },
            recording: RecordingConfig {
                max_duration_seconds: MAX_RECORDING_SECONDS,
            },
            callback: CallbackConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                wait_timeout_seconds: 5,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_caps_recording_duration_and_trims_base_url() {
        let mut config = Config::for_backend("http://localhost:8080/");
        config.api.base_url = "http://localhost:8080/".to_string();
        config.recording.max_duration_seconds = 120;

        let config = config.validate().unwrap();
        assert_eq!(config.api.base_url, "http://localhost:8080");
        assert_eq!(config.recording.max_duration_seconds, MAX_RECORDING_SECONDS);
    }

    #[test]
    fn validate_rejects_empty_base_url() {
        let mut config = Config::for_backend("http://localhost:8080");
        config.api.base_url = "  ".to_string();
        assert!(config.validate().is_err());
    }
}
