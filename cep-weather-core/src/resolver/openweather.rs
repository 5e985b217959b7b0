use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::instrument;

use crate::{
    error::{LookupError, Service},
    model::CurrentWeather,
};

use super::{WeatherResolver, truncate_body};

#[derive(Debug, Clone)]
pub struct OpenWeatherResolver {
    api_key: String,
    http: Client,
    base_url: String,
}

impl OpenWeatherResolver {
    pub fn with_client(http: Client, base_url: &str, api_key: String) -> Self {
        Self { api_key, http, base_url: base_url.trim_end_matches('/').to_string() }
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    main: OwMain,
}

#[async_trait]
impl WeatherResolver for OpenWeatherResolver {
    #[instrument(skip(self))]
    async fn current(&self, locality: &str) -> Result<CurrentWeather, LookupError> {
        let url = format!("{}/data/2.5/weather", self.base_url);

        let res = self
            .http
            .get(&url)
            .query(&[("q", locality), ("appid", self.api_key.as_str()), ("units", "metric")])
            .send()
            .await
            .map_err(|e| {
                LookupError::upstream(Service::Weather, format!("request to OpenWeather failed: {}", e.without_url()))
            })?;

        let status = res.status();
        let body = res.text().await.map_err(|e| {
            LookupError::upstream(Service::Weather, format!("failed to read OpenWeather body: {}", e.without_url()))
        })?;

        if !status.is_success() {
            return Err(LookupError::upstream(
                Service::Weather,
                format!("OpenWeather returned status {}: {}", status, truncate_body(&body)),
            ));
        }

        let parsed: OwCurrentResponse = serde_json::from_str(&body).map_err(|e| {
            LookupError::upstream(Service::Weather, format!("failed to parse OpenWeather JSON: {e}"))
        })?;

        tracing::debug!(temp = parsed.main.temp, "resolved current weather");
        Ok(CurrentWeather { temperature_c: parsed.main.temp })
    }
}
