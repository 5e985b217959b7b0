use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

use crate::{
    error::{LookupError, Service},
    model::{Address, Cep},
};

use super::{AddressResolver, truncate_body};

/// Address lookups against ViaCEP (`/ws/{cep}/json/`).
#[derive(Debug, Clone)]
pub struct ViaCepResolver {
    http: Client,
    base_url: String,
}

impl ViaCepResolver {
    pub fn with_client(http: Client, base_url: &str) -> Self {
        Self { http, base_url: base_url.trim_end_matches('/').to_string() }
    }
}

#[derive(Debug, Deserialize)]
struct ViaCepResponse {
    localidade: Option<String>,
    uf: Option<String>,
    /// `true` or `"true"` when the CEP doesn't exist.
    #[serde(default)]
    erro: Option<Value>,
}

impl ViaCepResponse {
    fn is_not_found(&self) -> bool {
        match &self.erro {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }
}

#[async_trait]
impl AddressResolver for ViaCepResolver {
    #[instrument(skip_all, fields(cep = %cep))]
    async fn resolve(&self, cep: &Cep) -> Result<Address, LookupError> {
        let url = format!("{}/ws/{}/json/", self.base_url, cep);

        let res = self.http.get(&url).send().await.map_err(|e| {
            LookupError::upstream(Service::Address, format!("request to ViaCEP failed: {}", e.without_url()))
        })?;

        let status = res.status();
        let body = res.text().await.map_err(|e| {
            LookupError::upstream(Service::Address, format!("failed to read ViaCEP body: {}", e.without_url()))
        })?;

        if !status.is_success() {
            return Err(LookupError::upstream(
                Service::Address,
                format!("ViaCEP returned status {}: {}", status, truncate_body(&body)),
            ));
        }

        let parsed: ViaCepResponse = serde_json::from_str(&body).map_err(|e| {
            LookupError::upstream(Service::Address, format!("failed to parse ViaCEP JSON: {e}"))
        })?;

        if parsed.is_not_found() {
            tracing::info!("ViaCEP has no address for this CEP");
            return Err(LookupError::CepNotFound(cep.to_string()));
        }

        let locality = parsed.localidade.filter(|l| !l.is_empty()).ok_or_else(|| {
            LookupError::upstream(Service::Address, "ViaCEP response has no locality")
        })?;
        let state = parsed.uf.filter(|uf| !uf.is_empty());

        tracing::debug!(%locality, state = ?state, "resolved address");
        Ok(Address { locality, state })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn resolver(server: &MockServer) -> ViaCepResolver {
        ViaCepResolver::with_client(Client::new(), &server.uri())
    }

    fn cep(raw: &str) -> Cep {
        Cep::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn resolves_locality_and_state() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ws/01001000/json/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "cep": "01001-000",
                "logradouro": "Praça da Sé",
                "localidade": "São Paulo",
                "uf": "SP"
            })))
            .mount(&server)
            .await;

        let address = resolver(&server).resolve(&cep("01001000")).await.unwrap();

        assert_eq!(address.locality, "São Paulo");
        assert_eq!(address.state.as_deref(), Some("SP"));
    }

    #[tokio::test]
    async fn erro_flag_means_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ws/99999999/json/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "erro": true })))
            .mount(&server)
            .await;

        let err = resolver(&server).resolve(&cep("99999999")).await.unwrap_err();
        assert!(matches!(err, LookupError::CepNotFound(ref c) if c == "99999999"));
    }

    #[tokio::test]
    async fn string_erro_flag_means_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ws/99999998/json/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "erro": "true" })),
            )
            .mount(&server)
            .await;

        let err = resolver(&server).resolve(&cep("99999998")).await.unwrap_err();
        assert!(matches!(err, LookupError::CepNotFound(_)));
    }

    #[tokio::test]
    async fn non_success_status_is_a_service_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let err = resolver(&server).resolve(&cep("01001000")).await.unwrap_err();
        assert!(matches!(err, LookupError::Upstream { service: Service::Address, .. }));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn garbage_body_is_a_service_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = resolver(&server).resolve(&cep("01001000")).await.unwrap_err();
        assert!(matches!(err, LookupError::Upstream { service: Service::Address, .. }));
    }

    #[tokio::test]
    async fn unreachable_service_is_a_service_error() {
        let resolver = ViaCepResolver::with_client(Client::new(), "http://127.0.0.1:1");
        let err = resolver.resolve(&cep("01001000")).await.unwrap_err();
        assert!(matches!(err, LookupError::Upstream { service: Service::Address, .. }));
        assert!(!err.to_string().contains("/ws/01001000/json/"), "{err}");
    }
}
