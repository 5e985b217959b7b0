//! Lookup error taxonomy.

use std::fmt;

use thiserror::Error;

/// Which outbound service a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Address,
    Weather,
}

impl Service {
    pub fn as_str(&self) -> &'static str {
        match self {
            Service::Address => "address",
            Service::Weather => "weather",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse classification used by callers to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Service,
}

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("Invalid CEP {0:?}: expected exactly 8 digits")]
    InvalidCep(String),

    #[error("CEP {0} not found")]
    CepNotFound(String),

    #[error("{service} service error: {message}")]
    Upstream { service: Service, message: String },
}

impl LookupError {
    pub fn upstream(service: Service, message: impl Into<String>) -> Self {
        Self::Upstream { service, message: message.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidCep(_) => ErrorKind::Validation,
            Self::CepNotFound(_) => ErrorKind::NotFound,
            Self::Upstream { .. } => ErrorKind::Service,
        }
    }

    /// User-facing message for the API body and the page.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidCep(_) => "CEP inválido. Certifique-se de que tenha 8 dígitos.".to_string(),
            Self::CepNotFound(_) => "CEP não encontrado".to_string(),
            Self::Upstream { service: Service::Address, .. } => {
                "Erro ao buscar dados do CEP".to_string()
            }
            Self::Upstream { service: Service::Weather, .. } => {
                "Erro ao buscar dados do clima".to_string()
            }
        }
    }
}
