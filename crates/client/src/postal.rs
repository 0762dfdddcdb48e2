//! Address lookup by Brazilian postal code (CEP).
//!
//! ViaCEP answers `GET {base}/{cep}/json/` with the address, or with
//! `{"erro": true}` (sometimes `"true"`) for unknown codes. The service is
//! treated as unreliable: any transport or decoding failure is a
//! [`LookupError::Network`].

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use tavola_core::validation::{is_valid_cep, only_digits};

use crate::config::ClientConfig;

/// Why a lookup produced no address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// Not eight digits; nothing was requested.
    #[error("CEP inválido")]
    InvalidCep,

    #[error("CEP não encontrado")]
    NotFound,

    #[error("Não foi possível consultar o CEP. Preencha o endereço manualmente.")]
    Network(String),
}

/// Address fields a lookup fills in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostalAddress {
    /// Digits only.
    pub zip_code: String,
    pub street: String,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
}

/// A postal-code lookup service.
#[async_trait]
pub trait PostalCodeLookup: Send + Sync {
    /// Look up `cep` (formatted or digits only).
    async fn lookup(&self, cep: &str) -> Result<PostalAddress, LookupError>;
}

#[derive(Debug, Deserialize)]
struct ViaCepAddress {
    #[serde(default)]
    logradouro: String,
    #[serde(default)]
    bairro: String,
    #[serde(default)]
    localidade: String,
    #[serde(default)]
    uf: String,
}

/// `true` or `"true"`; ViaCEP has used both.
fn is_error_body(body: &serde_json::Value) -> bool {
    match body.get("erro") {
        Some(serde_json::Value::Bool(flag)) => *flag,
        Some(serde_json::Value::String(flag)) => flag == "true",
        _ => false,
    }
}

/// ViaCEP client.
#[derive(Debug, Clone)]
pub struct ViaCepClient {
    client: reqwest::Client,
    base_url: String,
}

impl ViaCepClient {
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        })
    }

    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn from_config(config: &ClientConfig) -> Result<Self, reqwest::Error> {
        Self::new(config.viacep_base_url.clone(), config.timeout)
    }
}

#[async_trait]
impl PostalCodeLookup for ViaCepClient {
    async fn lookup(&self, cep: &str) -> Result<PostalAddress, LookupError> {
        if !is_valid_cep(cep) {
            return Err(LookupError::InvalidCep);
        }
        let digits = only_digits(cep);
        let url = format!("{}/{digits}/json/", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LookupError::Network(e.to_string()))?;
        if !response.status().is_success() {
            return Err(LookupError::Network(format!(
                "ViaCEP HTTP {}",
                response.status().as_u16()
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LookupError::Network(e.to_string()))?;
        if is_error_body(&body) {
            tracing::debug!(cep = %digits, "CEP not found");
            return Err(LookupError::NotFound);
        }

        let address: ViaCepAddress =
            serde_json::from_value(body).map_err(|e| LookupError::Network(e.to_string()))?;
        Ok(PostalAddress {
            zip_code: digits,
            street: address.logradouro,
            neighborhood: address.bairro,
            city: address.localidade,
            state: address.uf,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use httpmock::prelude::*;
    use serde_json::json;

    fn client(server: &MockServer) -> ViaCepClient {
        ViaCepClient::new(server.url("/ws"), Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn test_lookup_success() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/ws/01001000/json/");
            then.status(200).json_body(json!({
                "cep": "01001-000",
                "logradouro": "Praça da Sé",
                "complemento": "lado ímpar",
                "bairro": "Sé",
                "localidade": "São Paulo",
                "uf": "SP"
            }));
        });

        let address = client(&server).lookup("01001-000").await.unwrap();
        assert_eq!(address.zip_code, "01001000");
        assert_eq!(address.street, "Praça da Sé");
        assert_eq!(address.city, "São Paulo");
        assert_eq!(address.state, "SP");
        mock.assert();
    }

    #[tokio::test]
    async fn test_lookup_not_found() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/ws/99999999/json/");
            then.status(200).json_body(json!({"erro": true}));
        });

        assert_eq!(
            client(&server).lookup("99999-999").await,
            Err(LookupError::NotFound)
        );
    }

    #[tokio::test]
    async fn test_lookup_not_found_string_flag() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/ws/99999999/json/");
            then.status(200).json_body(json!({"erro": "true"}));
        });

        assert_eq!(
            client(&server).lookup("99999999").await,
            Err(LookupError::NotFound)
        );
    }

    #[tokio::test]
    async fn test_lookup_server_error_is_network() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/ws/01001000/json/");
            then.status(503);
        });

        assert!(matches!(
            client(&server).lookup("01001000").await,
            Err(LookupError::Network(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_cep_skips_request() {
        let server = MockServer::start();
        let mock = server.mock(|_when, then| {
            then.status(200);
        });

        assert_eq!(
            client(&server).lookup("123").await,
            Err(LookupError::InvalidCep)
        );
        assert_eq!(mock.calls(), 0);
    }
}
