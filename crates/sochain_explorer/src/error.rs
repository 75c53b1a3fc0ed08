//! Explorer-level error taxonomy and its mapping onto client/server outcomes.

use crate::chain::{ClientError, ReshapeError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExplorerError {
    #[error("Unsupported network: {0}")]
    UnsupportedNetwork(String),
    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),
    #[error("transport failure for {network} {id}: {source}")]
    Transport {
        network: String,
        id: String,
        #[source]
        source: ClientError,
    },
    #[error("not found: {network} {id}: {message}")]
    NotFound {
        network: String,
        id: String,
        message: String,
    },
    #[error("unexpected upstream status {status}: {message}")]
    UnexpectedStatus { status: u16, message: String },
    #[error("decode: {0}")]
    Decode(String),
}

impl From<ReshapeError> for ExplorerError {
    fn from(e: ReshapeError) -> Self {
        ExplorerError::Decode(e.to_string())
    }
}

/// How a failure should surface to a caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    Client,
    NotFound,
    Server,
}

impl ExplorerError {
    /// Wraps a client failure; malformed payloads become [`ExplorerError::Decode`].
    pub fn from_client(network: &str, id: &str, source: ClientError) -> Self {
        match source {
            ClientError::Decode(e) => ExplorerError::Decode(e.to_string()),
            source => ExplorerError::Transport {
                network: network.to_string(),
                id: id.to_string(),
                source,
            },
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            ExplorerError::UnsupportedNetwork(_) | ExplorerError::InvalidIdentifier(_) => {
                ErrorClass::Client
            }
            ExplorerError::NotFound { .. } => ErrorClass::NotFound,
            ExplorerError::UnexpectedStatus { status, .. } if (400..500).contains(status) => {
                ErrorClass::Client
            }
            ExplorerError::Transport { .. }
            | ExplorerError::UnexpectedStatus { .. }
            | ExplorerError::Decode(_) => ErrorClass::Server,
        }
    }

    /// HTTP status for the outer surface. Upstream error statuses pass through.
    pub fn http_status(&self) -> u16 {
        match self {
            ExplorerError::UnexpectedStatus { status, .. } if (400..600).contains(status) => {
                *status
            }
            _ => match self.class() {
                ErrorClass::Client => 400,
                ErrorClass::NotFound => 404,
                ErrorClass::Server => 500,
            },
        }
    }
}

/// Short user-facing message for an upstream status code.
pub fn status_message(status: u16) -> &'static str {
    if (400..500).contains(&status) {
        "Bad Request."
    } else {
        "Unexpected Response."
    }
}
