//! Client error type.

use thiserror::Error;

use tavola_core::{ErrorBody, ErrorCode, FieldErrors};

/// Shown when the server gives no usable message.
pub const GENERIC_ERROR: &str = "Ocorreu um erro inesperado. Tente novamente.";

/// Shown when the server cannot be reached.
pub const NETWORK_ERROR: &str = "Não foi possível conectar ao servidor. Verifique sua conexão.";

/// Errors returned by the API client and client-side stores.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never produced a response.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with an error envelope.
    #[error("API error: {status} - {}", .error.message)]
    Api { status: u16, error: ErrorBody },

    /// A success response had an unexpected body.
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Reading or writing persisted client state failed.
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    /// The envelope's error code, for API errors.
    #[must_use]
    pub const fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Api { error, .. } => Some(error.code),
            _ => None,
        }
    }

    /// Field errors carried by a validation response.
    #[must_use]
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::Api { error, .. } if !error.fields.is_empty() => Some(&error.fields),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self.code(), Some(ErrorCode::Unauthorized))
    }

    /// Text suitable for showing to the user.
    ///
    /// Server messages are shown as sent, except for internal errors, which
    /// get a generic message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { error, .. }
                if error.code != ErrorCode::Internal && !error.message.trim().is_empty() =>
            {
                error.message.clone()
            }
            Self::Http(e) if e.is_connect() || e.is_timeout() => NETWORK_ERROR.to_owned(),
            _ => GENERIC_ERROR.to_owned(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn api(code: ErrorCode, message: &str) -> ClientError {
        ClientError::Api {
            status: code.status(),
            error: ErrorBody {
                code,
                message: message.to_owned(),
                fields: FieldErrors::new(),
            },
        }
    }

    #[test]
    fn test_user_message_uses_server_text() {
        let err = api(ErrorCode::Conflict, "Este endereço já está em uso");
        assert_eq!(err.user_message(), "Este endereço já está em uso");
        assert_eq!(err.code(), Some(ErrorCode::Conflict));
    }

    #[test]
    fn test_user_message_hides_internal_errors() {
        assert_eq!(
            api(ErrorCode::Internal, "Erro interno do servidor").user_message(),
            GENERIC_ERROR
        );
        assert_eq!(
            ClientError::Parse("bad json".to_owned()).user_message(),
            GENERIC_ERROR
        );
    }

    #[test]
    fn test_field_errors_only_when_present() {
        assert!(api(ErrorCode::Validation, "x").field_errors().is_none());

        let mut fields = FieldErrors::new();
        fields.insert("name", "Campo obrigatório");
        let err = ClientError::Api {
            status: 400,
            error: ErrorBody {
                code: ErrorCode::Validation,
                message: "Verifique os campos destacados".to_owned(),
                fields,
            },
        };
        assert_eq!(
            err.field_errors().unwrap().get("name"),
            Some("Campo obrigatório")
        );
    }
}
