use crate::{
    Config,
    error::ClientError,
    model::{CredentialCheck, LocationQuery, WeatherResult},
    provider::openweather::OpenWeatherProvider,
};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

pub mod openweather;

/// The weather API as seen by the rest of the app.
///
/// Implementations never panic on upstream failures: every outcome is
/// returned as a value.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Probe the API once to find out whether the configured key works.
    async fn check_credential(&self) -> CredentialCheck;

    /// Fetch current conditions for `query`, in metric units.
    async fn fetch_weather(&self, query: &LocationQuery) -> Result<WeatherResult, ClientError>;
}

/// Construct the OpenWeather provider from config.
///
/// A missing key is not an error here; the provider reports it on first use.
pub fn provider_from_config(config: &Config) -> Arc<dyn WeatherProvider> {
    let mut provider = OpenWeatherProvider::new(config.credential());
    if let Some(base_url) = &config.openweather.base_url {
        provider = provider.with_base_url(base_url);
    }
    Arc::new(provider)
}
