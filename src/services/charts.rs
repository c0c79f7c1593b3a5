use reqwest::Method;

use super::ApiClient;
use crate::error::AppResult;
use crate::models::{ChartSong, ChartType};

impl ApiClient {
    /// Чарт без авторизации. Форма ответа плавает, поэтому разбираем через `Value`.
    pub async fn chart(&self, chart: ChartType) -> AppResult<Vec<ChartSong>> {
        let path = format!("/api/charts/{}", chart.as_str());
        let body: serde_json::Value = self.send_json(self.request(Method::GET, &path, None)).await?;
        ChartSong::list_from_value(&body)
    }
}
