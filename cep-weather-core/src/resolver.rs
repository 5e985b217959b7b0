use std::{fmt::Debug, sync::Arc};

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;

use crate::{
    Config,
    error::LookupError,
    model::{Address, Cep, CurrentWeather},
    resolver::{openweather::OpenWeatherResolver, viacep::ViaCepResolver},
};

pub mod openweather;
pub mod viacep;

/// Maps a CEP to the locality it belongs to.
#[async_trait]
pub trait AddressResolver: Send + Sync + Debug {
    async fn resolve(&self, cep: &Cep) -> Result<Address, LookupError>;
}

/// Maps a locality name to its current weather.
#[async_trait]
pub trait WeatherResolver: Send + Sync + Debug {
    async fn current(&self, locality: &str) -> Result<CurrentWeather, LookupError>;
}

/// Both resolvers, built from config and sharing one HTTP client.
#[derive(Debug, Clone)]
pub struct Resolvers {
    pub address: Arc<dyn AddressResolver>,
    pub weather: Arc<dyn WeatherResolver>,
}

impl Resolvers {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let api_key = config.weather_api_key()?;
        let http = http_client(config)?;

        Ok(Self {
            address: Arc::new(ViaCepResolver::with_client(http.clone(), &config.address.base_url)),
            weather: Arc::new(OpenWeatherResolver::with_client(
                http,
                &config.weather.base_url,
                api_key.to_owned(),
            )),
        })
    }
}

fn http_client(config: &Config) -> anyhow::Result<Client> {
    let mut builder = Client::builder().user_agent(concat!("cep-weather/", env!("CARGO_PKG_VERSION")));
    if let Some(timeout) = config.request_timeout() {
        builder = builder.timeout(timeout);
    }
    builder.build().context("Failed to build HTTP client")
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_config_errors_when_missing_api_key() {
        let cfg = Config::default();
        let err = Resolvers::from_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("No OpenWeather API key configured"));
    }

    #[test]
    fn from_config_works_when_key_is_set() {
        let mut cfg = Config::default();
        cfg.set_weather_api_key("KEY".to_string());
        cfg.http.timeout_secs = Some(3);

        assert!(Resolvers::from_config(&cfg).is_ok());
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let long = "ã".repeat(300);
        let out = truncate_body(&long);
        assert_eq!(out.chars().count(), 203);
        assert!(out.ends_with("..."));

        assert_eq!(truncate_body("short"), "short");
    }
}
