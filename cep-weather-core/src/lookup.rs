//! CEP → address → weather, assembled into a [`SearchRecord`].

use std::sync::Arc;

use chrono::Local;
use tracing::instrument;

use crate::{
    error::LookupError,
    model::{Cep, SearchRecord},
    resolver::{AddressResolver, Resolvers, WeatherResolver},
};

#[derive(Debug, Clone)]
pub struct LookupService {
    address: Arc<dyn AddressResolver>,
    weather: Arc<dyn WeatherResolver>,
}

impl LookupService {
    pub fn new(address: Arc<dyn AddressResolver>, weather: Arc<dyn WeatherResolver>) -> Self {
        Self { address, weather }
    }

    /// Validate `raw`, then query the address and weather services in turn.
    ///
    /// Nothing goes out over the network for a malformed CEP, and the weather
    /// service is only asked once the address service has found the CEP.
    #[instrument(skip(self))]
    pub async fn lookup(&self, raw: &str) -> Result<SearchRecord, LookupError> {
        let cep = Cep::parse(raw)?;
        let address = self.address.resolve(&cep).await?;
        let weather = self.weather.current(&address.locality).await?;

        let record = SearchRecord::new(cep, address, weather, Local::now());
        tracing::info!(
            cep = %record.cep,
            location = ?record.location,
            temp = ?record.temp,
            "lookup succeeded"
        );
        Ok(record)
    }
}

impl From<Resolvers> for LookupService {
    fn from(resolvers: Resolvers) -> Self {
        Self::new(resolvers.address, resolvers.weather)
    }
}
